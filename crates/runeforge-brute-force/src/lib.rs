//! Runeforge — brute-force procedure.
//!
//! Forcing a barrier with raw might: every attempt is louder and harder
//! than the last, and a fumble hurts.

pub mod application;
pub mod domain;
