//! Domain events for the brute-force procedure.

use runeforge_core::event::{DomainEvent, EventMetadata};
use runeforge_rules::domain::procedure::{StepResolution, Transition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregates::BruteForcePhase;
use super::barrier::{BarrierKind, ForceFallout, Tool};

/// Emitted when an actor squares up to a barrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BruteForceInitiated {
    /// The brute-force instance.
    pub brute_force_id: Uuid,
    /// The actor doing the forcing.
    pub actor_id: Uuid,
    /// The barrier.
    pub barrier: BarrierKind,
}

/// Emitted for each attempt to force the barrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceAttempted {
    /// Tool used, if any.
    pub tool: Option<Tool>,
    /// Helpers who joined in.
    pub assistants: u32,
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<BruteForcePhase>,
    /// What the attempt cost.
    pub fallout: ForceFallout,
    /// Permanent DC increase from this attempt.
    pub threshold_raise: i32,
}

/// Emitted when the actor walks away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BruteForceAbandoned {
    /// The brute-force instance.
    pub brute_force_id: Uuid,
}

/// Event payload variants for the brute-force procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BruteForceEventKind {
    /// The actor began forcing a barrier.
    BruteForceInitiated(BruteForceInitiated),
    /// An attempt was rolled.
    ForceAttempted(ForceAttempted),
    /// The attempt was abandoned.
    BruteForceAbandoned(BruteForceAbandoned),
}

/// Domain event envelope for the brute-force procedure.
#[derive(Debug, Clone)]
pub struct BruteForceEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: BruteForceEventKind,
}

impl DomainEvent for BruteForceEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            BruteForceEventKind::BruteForceInitiated(_) => "brute_force.initiated",
            BruteForceEventKind::ForceAttempted(_) => "brute_force.force_attempted",
            BruteForceEventKind::BruteForceAbandoned(_) => "brute_force.abandoned",
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("BruteForceEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
