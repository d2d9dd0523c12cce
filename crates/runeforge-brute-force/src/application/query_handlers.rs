//! Query handlers for the brute-force procedure.

use runeforge_config::RulesConfig;
use runeforge_core::error::DomainError;
use runeforge_core::repository::EventRepository;
use runeforge_rules::domain::procedure::ProcedureInstance;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::{BruteForce, BruteForcePhase};
use crate::domain::barrier::{
    BarrierKind, ForceFallout, NoiseLevel, Tool, difficulty_description,
};

/// Read-only view of a brute-force aggregate.
#[derive(Debug, Serialize)]
pub struct BruteForceView {
    /// The brute-force instance identifier.
    pub brute_force_id: Uuid,
    /// The actor doing the forcing.
    pub actor_id: Uuid,
    /// The barrier.
    pub barrier: BarrierKind,
    /// Current phase.
    pub phase: BruteForcePhase,
    /// Attempts made so far.
    pub attempts: u32,
    pub attempts_remaining: u32,
    /// DC of the next bare-handed attempt, absent once terminal.
    pub effective_dc: Option<i32>,
    /// Plain-language reading of `effective_dc`.
    pub difficulty: Option<&'static str>,
    pub fumbled: bool,
    pub broken_tools: Vec<Tool>,
    pub last_tool: Option<Tool>,
    /// What the most recent attempt cost.
    pub last_fallout: Option<ForceFallout>,
    /// Loudest noise made so far.
    pub loudest_noise: NoiseLevel,
    /// Alert radius of the loudest noise in feet; absent when the whole
    /// area heard it.
    pub alert_radius_feet: Option<u32>,
    pub damage_taken: u32,
    pub content_damage: u32,
    pub exhaustion_gained: u32,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a brute-force instance by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_brute_force_by_id(
    brute_force_id: Uuid,
    repo: &dyn EventRepository,
    config: &RulesConfig,
) -> Result<BruteForceView, DomainError> {
    let stored_events = repo.load_events(brute_force_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(brute_force_id));
    }
    let attempt = command_handlers::reconstitute(brute_force_id, &stored_events)?;
    let effective_dc = attempt.effective_dc(&config.procedure(BruteForce::KIND), None);
    Ok(BruteForceView {
        brute_force_id,
        actor_id: attempt.actor_id,
        barrier: attempt.barrier,
        phase: attempt.procedure().phase(),
        attempts: attempt.attempts,
        attempts_remaining: attempt.attempts_remaining(),
        effective_dc,
        difficulty: effective_dc.map(difficulty_description),
        fumbled: attempt.fumbled,
        broken_tools: attempt.broken_tools.clone(),
        last_tool: attempt.last_tool,
        last_fallout: attempt.last_fallout.clone(),
        loudest_noise: attempt.loudest_noise,
        alert_radius_feet: attempt.loudest_noise.alert_radius_feet(),
        damage_taken: attempt.damage_taken,
        content_damage: attempt.content_damage,
        exhaustion_gained: attempt.exhaustion_gained,
        version: attempt.version,
    })
}
