//! Commands for the tracking procedure.

use runeforge_core::command::Command;
use runeforge_rules::domain::dice::AdvantageType;
use runeforge_rules::domain::skills::SkillSheet;
use uuid::Uuid;

use super::trail::{RecoveryStrategy, Terrain, TrackingGear, TrailAge, TrailConditions};

/// Command to start tracking a quarry.
#[derive(Debug, Clone)]
pub struct StartTracking {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The tracker.
    pub actor_id: Uuid,
    /// What is being tracked.
    pub quarry: String,
    /// Age of the trail.
    pub trail_age: TrailAge,
    /// Terrain the trail crosses.
    pub terrain: Terrain,
    /// Circumstances around the trail.
    pub conditions: TrailConditions,
    /// The tracker's kit.
    pub gear: TrackingGear,
    /// The tracker's skill ratings.
    pub skills: SkillSheet,
}

impl Command for StartTracking {
    fn command_type(&self) -> &'static str {
        "tracking.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to roll to pick up the trail.
#[derive(Debug, Clone)]
pub struct AttemptAcquisition {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The tracking instance.
    pub tracking_id: Uuid,
    /// The tracker's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptAcquisition {
    fn command_type(&self) -> &'static str {
        "tracking.attempt_acquisition"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to follow the trail for another leg.
#[derive(Debug, Clone)]
pub struct ContinuePursuit {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The tracking instance.
    pub tracking_id: Uuid,
    /// Miles to cover; the terrain's check interval when absent.
    pub distance_miles: Option<f64>,
    /// The tracker's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for ContinuePursuit {
    fn command_type(&self) -> &'static str {
        "tracking.continue_pursuit"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to close in on the target.
#[derive(Debug, Clone)]
pub struct CloseIn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The tracking instance.
    pub tracking_id: Uuid,
    /// Distance to the target in feet.
    pub distance_ft: u32,
    /// The tracker's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for CloseIn {
    fn command_type(&self) -> &'static str {
        "tracking.close_in"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to relocate a lost trail.
#[derive(Debug, Clone)]
pub struct AttemptRecovery {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The tracking instance.
    pub tracking_id: Uuid,
    /// How to search.
    pub strategy: RecoveryStrategy,
    /// The tracker's skill ratings.
    pub skills: SkillSheet,
    /// Advantage on the roll.
    pub advantage: AdvantageType,
}

impl Command for AttemptRecovery {
    fn command_type(&self) -> &'static str {
        "tracking.attempt_recovery"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// What a side estimate is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSubject {
    TargetCount,
    TrailAge,
}

/// Command to read the trail without moving along it.
#[derive(Debug, Clone)]
pub struct EstimateTrail {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The tracking instance.
    pub tracking_id: Uuid,
    /// What to estimate.
    pub subject: EstimateSubject,
    /// The tracker's skill ratings.
    pub skills: SkillSheet,
}

impl Command for EstimateTrail {
    fn command_type(&self) -> &'static str {
        "tracking.estimate"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to give up the trail.
#[derive(Debug, Clone)]
pub struct AbandonTracking {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The tracking instance.
    pub tracking_id: Uuid,
}

impl Command for AbandonTracking {
    fn command_type(&self) -> &'static str {
        "tracking.abandon"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
