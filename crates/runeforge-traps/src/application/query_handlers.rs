//! Query handlers for the trap disarmament procedure.

use runeforge_config::RulesConfig;
use runeforge_core::error::DomainError;
use runeforge_core::repository::EventRepository;
use runeforge_rules::domain::procedure::ProcedureInstance;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::{TrapDisarmament, TrapPhase};
use crate::domain::trap::{AnalysisFindings, ToolQuality, TrapKind, TriggeredEffects};

/// Read-only view of a trap disarmament aggregate.
#[derive(Debug, Serialize)]
pub struct TrapView {
    /// The disarmament instance identifier.
    pub disarmament_id: Uuid,
    /// The actor facing the trap.
    pub actor_id: Uuid,
    /// The trap.
    pub trap: TrapKind,
    /// Current phase.
    pub phase: TrapPhase,
    /// Failures in the current phase.
    pub failed_attempts: u32,
    /// DC of the next check, absent once terminal.
    pub effective_dc: Option<i32>,
    /// What analysis revealed; absent if it was skipped or never reached.
    pub findings: Option<AnalysisFindings>,
    /// Tools used on the last disarm attempt.
    pub last_tool: Option<ToolQuality>,
    /// Consequences if the trap went off.
    pub effects: Option<TriggeredEffects>,
    /// Components recovered.
    pub salvage: Vec<String>,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a trap disarmament by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_trap_by_id(
    disarmament_id: Uuid,
    repo: &dyn EventRepository,
    config: &RulesConfig,
) -> Result<TrapView, DomainError> {
    let stored_events = repo.load_events(disarmament_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(disarmament_id));
    }
    let disarmament = command_handlers::reconstitute(disarmament_id, &stored_events)?;
    let policy = config
        .procedure(TrapDisarmament::KIND)
        .escalation_policy();
    Ok(TrapView {
        disarmament_id,
        actor_id: disarmament.actor_id,
        trap: disarmament.trap.clone(),
        phase: disarmament.procedure().phase(),
        failed_attempts: disarmament.procedure().failed_attempts(),
        effective_dc: disarmament.effective_dc(&policy),
        findings: disarmament.findings,
        last_tool: disarmament.last_tool,
        effects: disarmament.effects,
        salvage: disarmament.salvage.clone(),
        version: disarmament.version,
    })
}
