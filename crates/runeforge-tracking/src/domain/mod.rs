//! Domain layer for the tracking procedure.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod trail;
