//! Domain layer for the jury-rig procedure.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod mechanism;
