//! Runeforge — jury-rig procedure.
//!
//! Coaxing an unfamiliar mechanism open by trial and error: study it, poke
//! at it, pick an approach, and learn from every failed experiment.

pub mod application;
pub mod domain;
