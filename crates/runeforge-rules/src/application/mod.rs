//! Application helpers shared by the procedure crates.

pub mod procedures;
