//! Commands for the brute-force procedure.

use runeforge_core::command::Command;
use runeforge_rules::domain::dice::AdvantageType;
use runeforge_rules::domain::skills::SkillSheet;
use uuid::Uuid;

use super::barrier::{BarrierKind, ForceEffort};

/// Command to start forcing a barrier.
#[derive(Debug, Clone)]
pub struct InitiateBruteForce {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The actor doing the forcing.
    pub actor_id: Uuid,
    /// The barrier.
    pub barrier: BarrierKind,
}

impl Command for InitiateBruteForce {
    fn command_type(&self) -> &'static str {
        "brute_force.initiate"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to throw weight at the barrier.
#[derive(Debug, Clone)]
pub struct AttemptForce {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The brute-force instance.
    pub brute_force_id: Uuid,
    /// The actor's skill ratings.
    pub skills: SkillSheet,
    /// Tool, helpers and fatigue.
    pub effort: ForceEffort,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptForce {
    fn command_type(&self) -> &'static str {
        "brute_force.attempt"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to walk away from the barrier.
#[derive(Debug, Clone)]
pub struct AbandonBruteForce {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The brute-force instance.
    pub brute_force_id: Uuid,
}

impl Command for AbandonBruteForce {
    fn command_type(&self) -> &'static str {
        "brute_force.abandon"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
