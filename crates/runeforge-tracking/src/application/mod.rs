//! Application layer for the tracking procedure.

pub mod command_handlers;
pub mod query_handlers;
