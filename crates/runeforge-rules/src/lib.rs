//! Runeforge — Rules & Resolution.
//!
//! The dice-pool core every procedure shares: pools and the resolver that
//! rolls them, classified skill checks, the escalation policy that turns
//! accumulated penalties into an effective DC, and the generic phase machine
//! that tracking, trap work, jury-rigging and brute force instantiate.

pub mod application;
pub mod domain;
