//! Domain events for the jury-rig procedure.

use runeforge_core::event::{DomainEvent, EventMetadata};
use runeforge_rules::domain::procedure::{StepResolution, Transition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregates::JuryRigPhase;
use super::mechanism::{BypassMethod, Complication};

/// Emitted when an actor sets to work on a mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JuryRigStarted {
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
    /// The actor doing the work.
    pub actor_id: Uuid,
    /// Normalized mechanism type, e.g. `"door-lock"`.
    pub mechanism_type: String,
    /// Base DC of the mechanism.
    pub base_dc: i32,
    /// Whether the mechanism is glitching.
    pub glitched: bool,
    /// Whether the actor already knows this mechanism type.
    pub familiar: bool,
}

/// Emitted for the observation roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationAttempted {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<JuryRigPhase>,
    /// Hints revealed.
    pub hints: Vec<String>,
}

/// Emitted when observation is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSkipped {
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
}

/// Emitted when the actor pokes at a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MechanismProbed {
    /// The component probed.
    pub component: String,
    /// Whether the mechanism reacted erratically.
    pub glitch_observed: bool,
}

/// Emitted for the pattern recognition roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecognitionAttempted {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<JuryRigPhase>,
}

/// Emitted when pattern recognition is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecognitionSkipped {
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
}

/// Emitted when a bypass method is chosen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSelected {
    /// The chosen method.
    pub method: BypassMethod,
}

/// Emitted for each experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentAttempted {
    /// Method in use.
    pub method: BypassMethod,
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<JuryRigPhase>,
    /// Complication rolled on a failure, with its d10 face.
    pub complication: Option<(u32, Complication)>,
    /// Damage taken from sparks.
    pub damage: u32,
    /// Whether an alarm went off.
    pub alarm: bool,
    /// Extra iterations credited by a partial success.
    pub iteration_bonus: u32,
    /// Components recovered.
    pub salvage: Vec<String>,
}

/// Emitted when the actor learns from a failed experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationApplied {
    /// Iteration count after this one.
    pub iterations: u32,
}

/// Emitted when the actor gives up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JuryRigAbandoned {
    /// The jury-rig instance.
    pub jury_rig_id: Uuid,
}

/// Event payload variants for the jury-rig procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JuryRigEventKind {
    /// Work on a mechanism began.
    JuryRigStarted(JuryRigStarted),
    /// The observation check was rolled.
    ObservationAttempted(ObservationAttempted),
    /// Observation was skipped.
    ObservationSkipped(ObservationSkipped),
    /// A component was probed.
    MechanismProbed(MechanismProbed),
    /// The pattern recognition check was rolled.
    PatternRecognitionAttempted(PatternRecognitionAttempted),
    /// Pattern recognition was skipped.
    PatternRecognitionSkipped(PatternRecognitionSkipped),
    /// A bypass method was chosen.
    MethodSelected(MethodSelected),
    /// An experiment was rolled.
    ExperimentAttempted(ExperimentAttempted),
    /// A failed experiment lowered the DC.
    IterationApplied(IterationApplied),
    /// The attempt was abandoned.
    JuryRigAbandoned(JuryRigAbandoned),
}

/// Domain event envelope for the jury-rig procedure.
#[derive(Debug, Clone)]
pub struct JuryRigEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: JuryRigEventKind,
}

impl DomainEvent for JuryRigEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            JuryRigEventKind::JuryRigStarted(_) => "jury_rig.started",
            JuryRigEventKind::ObservationAttempted(_) => "jury_rig.observation_attempted",
            JuryRigEventKind::ObservationSkipped(_) => "jury_rig.observation_skipped",
            JuryRigEventKind::MechanismProbed(_) => "jury_rig.mechanism_probed",
            JuryRigEventKind::PatternRecognitionAttempted(_) => {
                "jury_rig.pattern_recognition_attempted"
            }
            JuryRigEventKind::PatternRecognitionSkipped(_) => "jury_rig.pattern_recognition_skipped",
            JuryRigEventKind::MethodSelected(_) => "jury_rig.method_selected",
            JuryRigEventKind::ExperimentAttempted(_) => "jury_rig.experiment_attempted",
            JuryRigEventKind::IterationApplied(_) => "jury_rig.iteration_applied",
            JuryRigEventKind::JuryRigAbandoned(_) => "jury_rig.abandoned",
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("JuryRigEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
