//! Query handlers for the tracking procedure.
//!
//! This module contains query handlers that reconstitute aggregates
//! from stored events and return read-only view DTOs.

use runeforge_config::RulesConfig;
use runeforge_core::error::DomainError;
use runeforge_core::repository::EventRepository;
use runeforge_rules::domain::procedure::ProcedureInstance;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::{Tracking, TrackingPhase};
use crate::domain::trail::{Terrain, TrailAge};

/// Read-only view of a tracking aggregate.
#[derive(Debug, Serialize)]
pub struct TrackingView {
    /// The tracking instance identifier.
    pub tracking_id: Uuid,
    /// The tracker.
    pub actor_id: Uuid,
    /// What is being tracked.
    pub quarry: String,
    /// Current phase.
    pub phase: TrackingPhase,
    /// Age of the trail.
    pub trail_age: TrailAge,
    /// Terrain the trail crosses.
    pub terrain: Terrain,
    /// Failures in the current phase.
    pub failed_attempts: u32,
    /// DC of the next check, absent once terminal.
    pub effective_dc: Option<i32>,
    /// Miles followed so far.
    pub distance_covered_miles: f64,
    /// Last known distance to the target.
    pub distance_to_target_ft: Option<u32>,
    /// Whether the target noticed the tracker.
    pub target_alerted: bool,
    /// Minutes spent relocating the trail.
    pub minutes_recovering: u32,
    /// Latest successful target-count estimate.
    pub estimated_target_count: Option<u32>,
    /// Latest successful trail-age estimate.
    pub estimated_trail_age: Option<TrailAge>,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a tracking instance by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_tracking_by_id(
    tracking_id: Uuid,
    repo: &dyn EventRepository,
    config: &RulesConfig,
) -> Result<TrackingView, DomainError> {
    let stored_events = repo.load_events(tracking_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(tracking_id));
    }
    let tracking = command_handlers::reconstitute(tracking_id, &stored_events)?;
    let policy = config.procedure(Tracking::KIND).escalation_policy();
    Ok(TrackingView {
        tracking_id,
        actor_id: tracking.actor_id,
        quarry: tracking.quarry.clone(),
        phase: tracking.procedure().phase(),
        trail_age: tracking.trail_age,
        terrain: tracking.terrain,
        failed_attempts: tracking.procedure().failed_attempts(),
        effective_dc: tracking.effective_dc(&policy),
        distance_covered_miles: tracking.distance_covered_miles,
        distance_to_target_ft: tracking.distance_to_target_ft,
        target_alerted: tracking.target_alerted,
        minutes_recovering: tracking.minutes_recovering,
        estimated_target_count: tracking.estimated_target_count,
        estimated_trail_age: tracking.estimated_trail_age,
        version: tracking.version,
    })
}
