//! Domain events for the tracking procedure.

use runeforge_core::event::{DomainEvent, EventMetadata};
use runeforge_rules::domain::escalation::ConditionModifier;
use runeforge_rules::domain::procedure::{StepResolution, Transition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregates::TrackingPhase;
use super::trail::{RecoveryStrategy, Terrain, TrailAge};

/// Emitted when an actor starts following a trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingStarted {
    /// The tracking instance.
    pub tracking_id: Uuid,
    /// The tracker.
    pub actor_id: Uuid,
    /// What is being tracked.
    pub quarry: String,
    /// Age of the trail.
    pub trail_age: TrailAge,
    /// Terrain the trail crosses.
    pub terrain: Terrain,
    /// Standing DC modifiers.
    pub conditions: Vec<ConditionModifier>,
    /// Extra dice on every roll.
    pub bonus_dice: i32,
}

/// Emitted for each attempt to pick up the trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionAttempted {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<TrackingPhase>,
}

/// Emitted for each pursuit leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PursuitAttempted {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<TrackingPhase>,
    /// Miles gained; zero unless the leg succeeded.
    pub distance_miles: f64,
}

/// Emitted when pursuit turns into closing in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingInStarted {
    /// Distance to the target in feet.
    pub distance_ft: u32,
}

/// Emitted for each closing-in attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosingInAttempted {
    /// Distance to the target in feet.
    pub distance_ft: u32,
    /// How the step resolved; automatic when close enough.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<TrackingPhase>,
    /// Whether the fumble alerted the target.
    pub target_alerted: bool,
}

/// Emitted for each attempt to relocate a lost trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAttempted {
    /// The strategy used.
    pub strategy: RecoveryStrategy,
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The resulting transition.
    pub transition: Transition<TrackingPhase>,
    /// Minutes the attempt took.
    pub minutes_spent: u32,
}

/// Emitted when the tracker estimates how many targets made the trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetCountEstimated {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The estimate, if the check succeeded.
    pub estimate: Option<u32>,
}

/// Emitted when the tracker estimates the trail's age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailAgeEstimated {
    /// How the check resolved.
    pub resolution: StepResolution,
    /// The revealed age, if the check succeeded.
    pub estimate: Option<TrailAge>,
}

/// Emitted when the tracker gives up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingAbandoned {
    /// The tracking instance.
    pub tracking_id: Uuid,
}

/// Event payload variants for the tracking procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackingEventKind {
    /// Tracking began.
    TrackingStarted(TrackingStarted),
    /// An acquisition check was rolled.
    AcquisitionAttempted(AcquisitionAttempted),
    /// A pursuit check was rolled.
    PursuitAttempted(PursuitAttempted),
    /// The tracker moved in on the target.
    ClosingInStarted(ClosingInStarted),
    /// A closing-in step resolved.
    ClosingInAttempted(ClosingInAttempted),
    /// A recovery check was rolled.
    RecoveryAttempted(RecoveryAttempted),
    /// The target count was estimated.
    TargetCountEstimated(TargetCountEstimated),
    /// The trail age was estimated.
    TrailAgeEstimated(TrailAgeEstimated),
    /// Tracking was abandoned.
    TrackingAbandoned(TrackingAbandoned),
}

/// Domain event envelope for the tracking procedure.
#[derive(Debug, Clone)]
pub struct TrackingEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: TrackingEventKind,
}

impl DomainEvent for TrackingEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            TrackingEventKind::TrackingStarted(_) => "tracking.started",
            TrackingEventKind::AcquisitionAttempted(_) => "tracking.acquisition_attempted",
            TrackingEventKind::PursuitAttempted(_) => "tracking.pursuit_attempted",
            TrackingEventKind::ClosingInStarted(_) => "tracking.closing_in_started",
            TrackingEventKind::ClosingInAttempted(_) => "tracking.closing_in_attempted",
            TrackingEventKind::RecoveryAttempted(_) => "tracking.recovery_attempted",
            TrackingEventKind::TargetCountEstimated(_) => "tracking.target_count_estimated",
            TrackingEventKind::TrailAgeEstimated(_) => "tracking.trail_age_estimated",
            TrackingEventKind::TrackingAbandoned(_) => "tracking.abandoned",
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("TrackingEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
