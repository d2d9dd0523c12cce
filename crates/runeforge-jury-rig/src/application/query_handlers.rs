//! Query handlers for the jury-rig procedure.

use runeforge_config::RulesConfig;
use runeforge_core::error::DomainError;
use runeforge_core::repository::EventRepository;
use runeforge_rules::domain::procedure::ProcedureInstance;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::{JuryRig, JuryRigPhase};
use crate::domain::mechanism::{BypassMethod, Complication};

/// Read-only view of a jury-rig aggregate.
#[derive(Debug, Serialize)]
pub struct JuryRigView {
    /// The jury-rig instance identifier.
    pub jury_rig_id: Uuid,
    /// The actor doing the work.
    pub actor_id: Uuid,
    /// Normalized mechanism type.
    pub mechanism_type: String,
    /// Current phase.
    pub phase: JuryRigPhase,
    /// Base DC of the mechanism.
    pub base_dc: i32,
    /// DC of the next roll, absent while probing and once terminal.
    pub effective_dc: Option<i32>,
    pub glitched: bool,
    pub familiar: bool,
    /// Hints revealed by observation.
    pub hints: Vec<String>,
    pub probed_component: Option<String>,
    /// Method for the pending experiment.
    pub method: Option<BypassMethod>,
    pub iterations: u32,
    pub failed_experiments: u32,
    pub last_complication: Option<Complication>,
    pub damage_taken: u32,
    pub alarm_raised: bool,
    /// Components recovered.
    pub salvage: Vec<String>,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a jury-rig instance by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_jury_rig_by_id(
    jury_rig_id: Uuid,
    repo: &dyn EventRepository,
    config: &RulesConfig,
) -> Result<JuryRigView, DomainError> {
    let stored_events = repo.load_events(jury_rig_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(jury_rig_id));
    }
    let rig = command_handlers::reconstitute(jury_rig_id, &stored_events)?;
    let policy = config.procedure(JuryRig::KIND).escalation_policy();
    Ok(JuryRigView {
        jury_rig_id,
        actor_id: rig.actor_id,
        mechanism_type: rig.mechanism_type.clone(),
        phase: rig.procedure().phase(),
        base_dc: rig.base_dc,
        effective_dc: rig.effective_dc(&policy),
        glitched: rig.glitched,
        familiar: rig.familiar,
        hints: rig.hints.clone(),
        probed_component: rig.probed_component.clone(),
        method: rig.method,
        iterations: rig.iterations,
        failed_experiments: rig.failed_experiments,
        last_complication: rig.last_complication,
        damage_taken: rig.damage_taken,
        alarm_raised: rig.alarm_raised,
        salvage: rig.salvage.clone(),
        version: rig.version,
    })
}
