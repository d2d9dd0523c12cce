//! Application layer for the brute-force procedure.

pub mod command_handlers;
pub mod query_handlers;
