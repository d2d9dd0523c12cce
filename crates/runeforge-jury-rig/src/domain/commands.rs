//! Commands for the jury-rig procedure.

use runeforge_core::command::Command;
use runeforge_rules::domain::dice::AdvantageType;
use runeforge_rules::domain::skills::SkillSheet;
use uuid::Uuid;

use super::mechanism::BypassMethod;

/// Command to start work on a mechanism.
#[derive(Debug, Clone)]
pub struct StartJuryRig {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The actor doing the work.
    pub actor_id: Uuid,
    /// Mechanism type, e.g. `"door-lock"`.
    pub mechanism_type: String,
    /// Base DC of the mechanism.
    pub base_dc: i32,
    /// Whether the mechanism is glitching.
    pub glitched: bool,
    /// Mechanism types the actor has bypassed before.
    pub familiar_types: Vec<String>,
}

impl Command for StartJuryRig {
    fn command_type(&self) -> &'static str {
        "jury_rig.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to roll to observe the mechanism.
#[derive(Debug, Clone)]
pub struct AttemptObservation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
    /// The actor's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptObservation {
    fn command_type(&self) -> &'static str {
        "jury_rig.attempt_observation"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to skip observation.
#[derive(Debug, Clone)]
pub struct SkipObservation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
}

impl Command for SkipObservation {
    fn command_type(&self) -> &'static str {
        "jury_rig.skip_observation"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to probe a component.
#[derive(Debug, Clone)]
pub struct ProbeMechanism {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
    /// The component to poke at.
    pub component: String,
}

impl Command for ProbeMechanism {
    fn command_type(&self) -> &'static str {
        "jury_rig.probe"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to roll to recognize the mechanism's pattern.
#[derive(Debug, Clone)]
pub struct AttemptPatternRecognition {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
    /// The actor's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptPatternRecognition {
    fn command_type(&self) -> &'static str {
        "jury_rig.attempt_pattern_recognition"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to skip pattern recognition.
#[derive(Debug, Clone)]
pub struct SkipPatternRecognition {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
}

impl Command for SkipPatternRecognition {
    fn command_type(&self) -> &'static str {
        "jury_rig.skip_pattern_recognition"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to choose a bypass method.
#[derive(Debug, Clone)]
pub struct SelectMethod {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
    /// The method to use.
    pub method: BypassMethod,
}

impl Command for SelectMethod {
    fn command_type(&self) -> &'static str {
        "jury_rig.select_method"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to roll an experiment.
#[derive(Debug, Clone)]
pub struct AttemptExperiment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
    /// The actor's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptExperiment {
    fn command_type(&self) -> &'static str {
        "jury_rig.attempt_experiment"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to learn from a failed experiment.
#[derive(Debug, Clone)]
pub struct ApplyIteration {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
}

impl Command for ApplyIteration {
    fn command_type(&self) -> &'static str {
        "jury_rig.iterate"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to give up on the mechanism.
#[derive(Debug, Clone)]
pub struct AbandonJuryRig {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
}

impl Command for AbandonJuryRig {
    fn command_type(&self) -> &'static str {
        "jury_rig.abandon"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
