//! Runeforge — tracking procedure.
//!
//! Following a quarry's trail: acquisition, pursuit, closing in, and recovery
//! after the trail is lost.

pub mod application;
pub mod domain;
