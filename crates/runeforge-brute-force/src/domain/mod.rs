//! Domain layer for the brute-force procedure.

pub mod aggregates;
pub mod barrier;
pub mod commands;
pub mod events;
