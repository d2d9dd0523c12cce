//! Domain layer for the trap disarmament procedure.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod trap;
