//! Application layer for the jury-rig procedure.

pub mod command_handlers;
pub mod query_handlers;
