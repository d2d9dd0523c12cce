//! Mechanism tables: bypass methods, the complication table, observation
//! hints and salvage by mechanism type.

use std::fmt;

use runeforge_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Skill rolled to observe the mechanism and to recognize its pattern.
pub const OBSERVATION_SKILL: &str = "wits";

/// DC of the observation roll.
pub const OBSERVATION_DC: i32 = 10;

/// DC of the pattern recognition roll.
pub const PATTERN_DC: i32 = 12;

/// Extra experiment die for a recognized pattern.
pub const PATTERN_BONUS_DICE: i32 = 1;

/// Extra experiment dice on a mechanism type the actor already knows.
pub const FAMILIARITY_BONUS_DICE: i32 = 2;

/// Skill rolled for each experiment.
pub const BYPASS_SKILL: &str = "system-bypass";

/// Faces on the complication die.
pub const COMPLICATION_DIE: u32 = 10;

/// d6s of damage when sparks fly.
pub const SPARKS_DAMAGE_DICE: u32 = 1;

/// Normalized form of a mechanism type: trimmed, lowercase.
#[must_use]
pub fn normalize_type(mechanism_type: &str) -> String {
    mechanism_type.trim().to_lowercase()
}

const SALVAGE: [(&str, &[&str]); 9] = [
    ("terminal", &["circuit-board", "display-unit", "processing-chip"]),
    ("door-lock", &["lock-mechanism", "servo-motor", "keycard-reader"]),
    (
        "security-panel",
        &["sensor-array", "alarm-module", "blighted-power-cell"],
    ),
    ("elevator", &["control-board", "cable-spool", "safety-relay"]),
    (
        "power-junction",
        &["capacitor", "transformer-coil", "power-regulator"],
    ),
    (
        "vending-machine",
        &["coin-mechanism", "dispensing-motor", "selection-panel"],
    ),
    (
        "communication",
        &["antenna-array", "signal-processor", "transmitter-module"],
    ),
    ("climate-control", &["thermostat", "fan-motor", "filter-housing"]),
    (
        "jotun-device",
        &[
            "jotun-mechanism-fragment",
            "ancient-power-core",
            "rune-circuitry",
        ],
    ),
];

const FALLBACK_SALVAGE: &[&str] = &["unknown-component", "salvaged-part"];

const HINTS: [(&str, &[&str]); 5] = [
    (
        "terminal",
        &["standard-interface", "maintenance-port", "flickering-screen"],
    ),
    (
        "door-lock",
        &["electromagnetic-lock", "corroded-reader", "exposed-power-cables"],
    ),
    (
        "security-panel",
        &["mixed-sensors", "redundant-circuits", "override-switch"],
    ),
    (
        "elevator",
        &["standard-protocols", "mechanical-brake", "pressure-buttons"],
    ),
    (
        "power-junction",
        &["high-voltage", "converging-feeds", "manual-cutoff"],
    ),
];

const FALLBACK_HINTS: &[&str] = &["old-world-technology"];

// Variants such as "door-lock-b7" share their category's table.
fn lookup<'a>(table: &[(&str, &'a [&'a str])], mechanism_type: &str) -> Option<&'a [&'a str]> {
    let wanted = normalize_type(mechanism_type);
    table
        .iter()
        .find(|(category, _)| wanted.starts_with(category))
        .map(|&(_, entries)| entries)
}

/// Components recovered from a mechanism of this type.
#[must_use]
pub fn salvage_for(mechanism_type: &str) -> Vec<String> {
    lookup(&SALVAGE, mechanism_type)
        .unwrap_or(FALLBACK_SALVAGE)
        .iter()
        .map(|&component| component.to_owned())
        .collect()
}

/// Up to `net_successes` observation hints for the mechanism type. Unknown
/// types always yield the single generic hint.
#[must_use]
pub fn hints_for(mechanism_type: &str, net_successes: i32) -> Vec<String> {
    let Ok(wanted) = usize::try_from(net_successes) else {
        return Vec::new();
    };
    lookup(&HINTS, mechanism_type)
        .unwrap_or(FALLBACK_HINTS)
        .iter()
        .take(wanted)
        .map(|&hint| hint.to_owned())
        .collect()
}

/// Approaches to the experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BypassMethod {
    PercussiveMaintenance,
    WireManipulation,
    GlitchExploitation,
    MemorizedSequence,
    BruteDisassembly,
    PowerCycling,
}

impl BypassMethod {
    /// Added to the experiment DC.
    #[must_use]
    pub const fn dc_modifier(self) -> i32 {
        match self {
            Self::PercussiveMaintenance | Self::PowerCycling => 0,
            Self::WireManipulation | Self::MemorizedSequence => -2,
            Self::GlitchExploitation => -4,
            Self::BruteDisassembly => 2,
        }
    }

    /// Whether a success wrecks the mechanism for parts instead of opening it.
    #[must_use]
    pub const fn destroys_mechanism(self) -> bool {
        matches!(self, Self::BruteDisassembly)
    }

    /// Checks the method's prerequisites.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` for glitch exploitation on a
    /// sound mechanism or a memorized sequence on an unfamiliar type.
    pub fn ensure_available(self, familiar: bool, glitched: bool) -> Result<(), DomainError> {
        match self {
            Self::GlitchExploitation if !glitched => Err(DomainError::InvalidArgument(
                "glitch exploitation requires a glitched mechanism".to_owned(),
            )),
            Self::MemorizedSequence if !familiar => Err(DomainError::InvalidArgument(
                "memorized sequence requires a familiar mechanism type".to_owned(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for BypassMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What goes wrong (or right) after a failed experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complication {
    PermanentLock,
    AlarmTriggered,
    SparksFly,
    Nothing,
    PartialSuccess,
    GlitchInFavor,
}

impl Complication {
    /// Reads a d10 against the complication table.
    #[must_use]
    pub const fn from_roll(roll: u32) -> Self {
        match roll {
            1 => Self::PermanentLock,
            2 | 3 => Self::AlarmTriggered,
            4 | 5 => Self::SparksFly,
            8 | 9 => Self::PartialSuccess,
            10 => Self::GlitchInFavor,
            _ => Self::Nothing,
        }
    }
}

impl fmt::Display for Complication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
