//! Runeforge — trap disarmament procedure.
//!
//! Spotting a trap, optionally studying it, then working it apart before it
//! goes off.

pub mod application;
pub mod domain;
