//! Domain layer for the Rules & Resolution context.

pub mod check;
pub mod dice;
pub mod escalation;
pub mod procedure;
pub mod skills;
