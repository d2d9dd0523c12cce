//! Commands for the trap disarmament procedure.

use runeforge_core::command::Command;
use runeforge_rules::domain::dice::AdvantageType;
use runeforge_rules::domain::skills::SkillSheet;
use uuid::Uuid;

use super::trap::ToolQuality;

/// Command to start dealing with a trap.
#[derive(Debug, Clone)]
pub struct EncounterTrap {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The actor facing the trap.
    pub actor_id: Uuid,
    /// Catalog key of the trap, e.g. `"pressure-plate"`.
    pub trap_key: String,
}

impl Command for EncounterTrap {
    fn command_type(&self) -> &'static str {
        "traps.encounter"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to roll to spot the trap.
#[derive(Debug, Clone)]
pub struct AttemptDetection {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The disarmament instance.
    pub disarmament_id: Uuid,
    /// The actor's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptDetection {
    fn command_type(&self) -> &'static str {
        "traps.attempt_detection"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to study the spotted trap.
#[derive(Debug, Clone)]
pub struct AttemptAnalysis {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The disarmament instance.
    pub disarmament_id: Uuid,
    /// The actor's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptAnalysis {
    fn command_type(&self) -> &'static str {
        "traps.attempt_analysis"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to go straight to disarming.
#[derive(Debug, Clone)]
pub struct SkipAnalysis {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The disarmament instance.
    pub disarmament_id: Uuid,
}

impl Command for SkipAnalysis {
    fn command_type(&self) -> &'static str {
        "traps.skip_analysis"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to roll to disarm the trap.
#[derive(Debug, Clone)]
pub struct AttemptDisarmament {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The disarmament instance.
    pub disarmament_id: Uuid,
    /// Tools used.
    pub tool: ToolQuality,
    /// The actor's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptDisarmament {
    fn command_type(&self) -> &'static str {
        "traps.attempt_disarmament"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to walk away from the trap.
#[derive(Debug, Clone)]
pub struct AbandonDisarmament {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The disarmament instance.
    pub disarmament_id: Uuid,
}

impl Command for AbandonDisarmament {
    fn command_type(&self) -> &'static str {
        "traps.abandon"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
