//! Domain events for the trap disarmament procedure.

use runeforge_core::event::{DomainEvent, EventMetadata};
use runeforge_rules::domain::procedure::{StepResolution, Transition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregates::TrapPhase;
use super::trap::{AnalysisFindings, ToolQuality, TrapKind, TriggeredEffects};

/// Emitted when an actor comes upon a trap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapEncountered {
    /// The disarmament instance.
    pub disarmament_id: Uuid,
    /// The actor facing the trap.
    pub actor_id: Uuid,
    /// The trap.
    pub trap: TrapKind,
}

/// Emitted for the detection roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionAttempted {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<TrapPhase>,
    /// Set when the missed trap went off.
    pub effects: Option<TriggeredEffects>,
}

/// Emitted for the analysis roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisAttempted {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<TrapPhase>,
    /// What the analysis revealed.
    pub findings: AnalysisFindings,
    /// Set when a fumbled analysis set the trap off.
    pub effects: Option<TriggeredEffects>,
}

/// Emitted when the actor goes straight to disarming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSkipped {
    /// The disarmament instance.
    pub disarmament_id: Uuid,
}

/// Emitted for each disarm roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisarmamentAttempted {
    /// Tools used.
    pub tool: ToolQuality,
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<TrapPhase>,
    /// Set when the trap went off or was destroyed.
    pub effects: Option<TriggeredEffects>,
    /// Components recovered; only a critical disarm yields any.
    pub salvage: Vec<String>,
}

/// Emitted when the actor walks away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapAbandoned {
    /// The disarmament instance.
    pub disarmament_id: Uuid,
}

/// Event payload variants for the trap disarmament procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrapEventKind {
    /// A trap was encountered.
    TrapEncountered(TrapEncountered),
    /// The detection check was rolled.
    DetectionAttempted(DetectionAttempted),
    /// The analysis check was rolled.
    AnalysisAttempted(AnalysisAttempted),
    /// Analysis was skipped.
    AnalysisSkipped(AnalysisSkipped),
    /// A disarm check was rolled.
    DisarmamentAttempted(DisarmamentAttempted),
    /// The attempt was abandoned.
    TrapAbandoned(TrapAbandoned),
}

/// Domain event envelope for the trap disarmament procedure.
#[derive(Debug, Clone)]
pub struct TrapEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: TrapEventKind,
}

impl DomainEvent for TrapEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            TrapEventKind::TrapEncountered(_) => "traps.encountered",
            TrapEventKind::DetectionAttempted(_) => "traps.detection_attempted",
            TrapEventKind::AnalysisAttempted(_) => "traps.analysis_attempted",
            TrapEventKind::AnalysisSkipped(_) => "traps.analysis_skipped",
            TrapEventKind::DisarmamentAttempted(_) => "traps.disarmament_attempted",
            TrapEventKind::TrapAbandoned(_) => "traps.abandoned",
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("TrapEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
