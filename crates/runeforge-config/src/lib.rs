//! Runeforge — rules configuration.
//!
//! Loads the skill catalog, per-procedure escalation tuning and dice settings
//! from YAML. Lookups for non-critical keys fall back to documented defaults;
//! an unconfigured skill is an error.

pub mod error;
pub mod rules_config;
pub mod telemetry;

pub use error::ConfigError;
pub use rules_config::{DiceSettings, ProcedureTuning, RulesConfig, SkillDefinition};
