//! Application layer for the trap disarmament procedure.

pub mod command_handlers;
pub mod query_handlers;
