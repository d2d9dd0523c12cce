//! Command handlers for the trap disarmament procedure.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load aggregate, execute command, persist events.

use std::sync::Mutex;

use runeforge_config::RulesConfig;
use runeforge_core::aggregate::AggregateRoot;
use runeforge_core::clock::Clock;
use runeforge_core::error::DomainError;
use runeforge_core::repository::{ActiveProcedureIndex, EventRepository, StoredEvent};
use runeforge_core::rng::DeterministicRng;
use runeforge_rules::application::procedures::{commit, ensure_no_active, lock_rng};
use runeforge_rules::domain::check::CheckResult;
use runeforge_rules::domain::procedure::ProcedureInstance;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::{TrapDisarmament, TrapPhase};
use crate::domain::commands::{
    AbandonDisarmament, AttemptAnalysis, AttemptDetection, AttemptDisarmament, EncounterTrap,
    SkipAnalysis,
};
use crate::domain::events::{TrapEvent, TrapEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct TrapCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
    /// Phase after the command.
    pub phase: TrapPhase,
    /// The check rolled, if any.
    pub check: Option<CheckResult>,
}

/// Reconstitutes a `TrapDisarmament` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    disarmament_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<TrapDisarmament, DomainError> {
    let mut disarmament = TrapDisarmament::new(disarmament_id);
    for stored in existing_events {
        let kind: TrapEventKind = serde_json::from_value(stored.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("event deserialization failed: {e}"))
        })?;
        disarmament.apply(&TrapEvent {
            metadata: stored.metadata(),
            kind,
        });
    }
    Ok(disarmament)
}

async fn load(
    disarmament_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<TrapDisarmament, DomainError> {
    let existing_events = repo.load_events(disarmament_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(disarmament_id));
    }
    reconstitute(disarmament_id, &existing_events)
}

async fn finish(
    mut disarmament: TrapDisarmament,
    check: Option<CheckResult>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<TrapCommandResult, DomainError> {
    let stored_events = commit(&mut disarmament, repo, index).await?;
    let phase = disarmament.procedure().phase();

    if let Some(check) = &check {
        debug!(
            outcome = %check.outcome,
            net_successes = check.net_successes,
            effective_dc = check.effective_dc,
            "trap check resolved"
        );
    }
    match phase {
        TrapPhase::Triggered | TrapPhase::Destroyed => {
            let effects = disarmament.effects.unwrap_or_default();
            warn!(
                disarmament_id = %disarmament.id,
                trap = %disarmament.trap,
                %phase,
                damage = effects.damage,
                alert = effects.alert,
                lockdown = effects.lockdown,
                "trap went off"
            );
        }
        TrapPhase::Disarmed if !disarmament.salvage.is_empty() => {
            info!(
                disarmament_id = %disarmament.id,
                salvage = ?disarmament.salvage,
                "trap disarmed with salvage"
            );
        }
        _ => {}
    }

    Ok(TrapCommandResult {
        aggregate_id: disarmament.id,
        stored_events,
        phase,
        check,
    })
}

/// Handles the `EncounterTrap` command.
///
/// This is a CREATION command; the handler generates the `disarmament_id`
/// and indexes it once its events are stored.
///
/// # Errors
///
/// Returns `DomainError::AlreadyActive` if the actor is already working a
/// trap, or `DomainError` if validation, indexing, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(actor_id = %command.actor_id, trap_key = %command.trap_key))]
pub async fn handle_encounter_trap(
    command: &EncounterTrap,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<TrapCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling encounter_trap command");

    ensure_no_active(index, command.actor_id, TrapDisarmament::KIND).await?;

    let mut disarmament = TrapDisarmament::new(Uuid::now_v7());
    disarmament.encounter(
        command.actor_id,
        &command.trap_key,
        command.correlation_id,
        clock,
    )?;

    let result = finish(disarmament, None, repo, index).await?;
    index
        .mark_active(command.actor_id, TrapDisarmament::KIND, result.aggregate_id)
        .await?;
    Ok(result)
}

/// Handles the `AttemptDetection` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, config, clock, rng, repo, index), fields(disarmament_id = %command.disarmament_id))]
pub async fn handle_attempt_detection(
    command: &AttemptDetection,
    config: &RulesConfig,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<TrapCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling attempt_detection command");

    let mut disarmament = load(command.disarmament_id, repo).await?;
    let check = {
        let mut rng_guard = lock_rng(rng)?;
        disarmament.attempt_detection(
            &command.skills,
            command.advantage,
            &config.skill_check(),
            &config.procedure(TrapDisarmament::KIND),
            command.correlation_id,
            clock,
            &mut *rng_guard,
        )?
    };
    finish(disarmament, Some(check), repo, index).await
}

/// Handles the `AttemptAnalysis` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, config, clock, rng, repo, index), fields(disarmament_id = %command.disarmament_id))]
pub async fn handle_attempt_analysis(
    command: &AttemptAnalysis,
    config: &RulesConfig,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<TrapCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling attempt_analysis command");

    let mut disarmament = load(command.disarmament_id, repo).await?;
    let findings = {
        let mut rng_guard = lock_rng(rng)?;
        disarmament.attempt_analysis(
            &command.skills,
            command.advantage,
            &config.skill_check(),
            command.correlation_id,
            clock,
            &mut *rng_guard,
        )?
    };
    debug!(
        dc_revealed = findings.disarm_dc.is_some(),
        consequences_revealed = findings.consequences.is_some(),
        hint = findings.hint,
        "trap analysed"
    );
    finish(disarmament, None, repo, index).await
}

/// Handles the `SkipAnalysis` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(disarmament_id = %command.disarmament_id))]
pub async fn handle_skip_analysis(
    command: &SkipAnalysis,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<TrapCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling skip_analysis command");

    let mut disarmament = load(command.disarmament_id, repo).await?;
    disarmament.skip_analysis(command.correlation_id, clock)?;
    finish(disarmament, None, repo, index).await
}

/// Handles the `AttemptDisarmament` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, config, clock, rng, repo, index), fields(disarmament_id = %command.disarmament_id, tool = ?command.tool))]
pub async fn handle_attempt_disarmament(
    command: &AttemptDisarmament,
    config: &RulesConfig,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<TrapCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling attempt_disarmament command");

    let mut disarmament = load(command.disarmament_id, repo).await?;
    let check = {
        let mut rng_guard = lock_rng(rng)?;
        disarmament.attempt_disarmament(
            command.tool,
            &command.skills,
            command.advantage,
            &config.skill_check(),
            &config.procedure(TrapDisarmament::KIND),
            command.correlation_id,
            clock,
            &mut *rng_guard,
        )?
    };
    finish(disarmament, Some(check), repo, index).await
}

/// Handles the `AbandonDisarmament` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(disarmament_id = %command.disarmament_id))]
pub async fn handle_abandon_disarmament(
    command: &AbandonDisarmament,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<TrapCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling abandon_disarmament command");

    let mut disarmament = load(command.disarmament_id, repo).await?;
    disarmament.abandon(command.correlation_id, clock)?;
    finish(disarmament, None, repo, index).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use runeforge_event_store::{InMemoryActiveIndex, InMemoryEventRepository};
    use runeforge_rules::domain::check::CheckOutcome;
    use runeforge_rules::domain::dice::AdvantageType;
    use runeforge_rules::domain::skills::SkillSheet;
    use runeforge_test_support::{
        EmptyEventRepository, FixedClock, RecordingActiveIndex, RecordingEventRepository,
        SequenceRng,
    };

    use crate::domain::trap::ToolQuality;

    fn encounter_command(actor_id: Uuid, trap_key: &str) -> EncounterTrap {
        EncounterTrap {
            correlation_id: Uuid::new_v4(),
            actor_id,
            trap_key: trap_key.to_owned(),
        }
    }

    fn encountered_events(disarmament_id: Uuid, actor_id: Uuid, trap_key: &str) -> Vec<StoredEvent> {
        let mut disarmament = TrapDisarmament::new(disarmament_id);
        disarmament
            .encounter(actor_id, trap_key, Uuid::new_v4(), &FixedClock::default())
            .unwrap();
        disarmament
            .uncommitted_events()
            .iter()
            .map(StoredEvent::from_domain_event)
            .collect()
    }

    #[tokio::test]
    async fn test_handle_encounter_trap_persists_and_marks_active() {
        // Arrange
        let actor_id = Uuid::new_v4();
        let repo = RecordingEventRepository::new();
        let index = RecordingActiveIndex::new();

        // Act
        let result = handle_encounter_trap(
            &encounter_command(actor_id, "laser-grid"),
            &FixedClock::default(),
            &repo,
            &index,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.phase, TrapPhase::Detection);
        assert_eq!(result.stored_events[0].event_type, "traps.encountered");
        assert_eq!(repo.appended_events()[0].1, 0);
        assert_eq!(
            index.marked(),
            vec![(actor_id, "trap-disarmament".to_owned(), result.aggregate_id)]
        );
    }

    #[tokio::test]
    async fn test_handle_encounter_trap_rejects_second_active_instance() {
        let repo = RecordingEventRepository::new();
        let index = RecordingActiveIndex::with_active(Uuid::new_v4());

        let result = handle_encounter_trap(
            &encounter_command(Uuid::new_v4(), "tripwire"),
            &FixedClock::default(),
            &repo,
            &index,
        )
        .await;

        assert!(matches!(result, Err(DomainError::AlreadyActive { .. })));
        assert!(repo.appended_events().is_empty());
        assert!(index.marked().is_empty());
    }

    #[tokio::test]
    async fn test_handle_attempt_detection_failure_triggers_and_releases() {
        // Arrange
        let disarmament_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let repo = RecordingEventRepository::with_events(encountered_events(
            disarmament_id,
            actor_id,
            "electrified",
        ));
        let index = RecordingActiveIndex::new();
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![5, 5, 3, 3, 3]));
        let command = AttemptDetection {
            correlation_id: Uuid::new_v4(),
            disarmament_id,
            skills: SkillSheet::new().with("perception", 2),
            advantage: AdvantageType::None,
        };

        // Act
        let result = handle_attempt_detection(
            &command,
            &RulesConfig::default(),
            &FixedClock::default(),
            &rng,
            &repo,
            &index,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.phase, TrapPhase::Triggered);
        assert_eq!(result.check.unwrap().outcome, CheckOutcome::Failure);
        assert_eq!(repo.appended_events()[0].1, 1);
        assert_eq!(
            index.released(),
            vec![(actor_id, "trap-disarmament".to_owned(), disarmament_id)]
        );
    }

    #[tokio::test]
    async fn test_handle_skip_analysis_returns_not_found_when_no_events() {
        let disarmament_id = Uuid::new_v4();
        let command = SkipAnalysis {
            correlation_id: Uuid::new_v4(),
            disarmament_id,
        };

        let result = handle_skip_analysis(
            &command,
            &FixedClock::default(),
            &EmptyEventRepository,
            &RecordingActiveIndex::new(),
        )
        .await;

        match result.unwrap_err() {
            DomainError::AggregateNotFound(id) => assert_eq!(id, disarmament_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_skip_analysis_in_detection_is_invalid_operation() {
        let disarmament_id = Uuid::new_v4();
        let repo = RecordingEventRepository::with_events(encountered_events(
            disarmament_id,
            Uuid::new_v4(),
            "tripwire",
        ));
        let command = SkipAnalysis {
            correlation_id: Uuid::new_v4(),
            disarmament_id,
        };

        let result = handle_skip_analysis(
            &command,
            &FixedClock::default(),
            &repo,
            &RecordingActiveIndex::new(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::InvalidOperation { .. })));
        assert!(repo.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_full_disarmament_against_in_memory_store() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let index = InMemoryActiveIndex::new();
        let clock = FixedClock::default();
        let config = RulesConfig::default();
        let actor_id = Uuid::new_v4();
        let skills = SkillSheet::new()
            .with("perception", 8)
            .with("wits", 3)
            .with("finesse", 7);
        let disarmament_id = handle_encounter_trap(
            &encounter_command(actor_id, "Tripwire"),
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap()
        .aggregate_id;
        // detection: 8 dice, analysis: 3 dice, disarm: 7 + 1 tool + 1 hint
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![10; 20]));

        // Act
        handle_attempt_detection(
            &AttemptDetection {
                correlation_id: Uuid::new_v4(),
                disarmament_id,
                skills: skills.clone(),
                advantage: AdvantageType::None,
            },
            &config,
            &clock,
            &rng,
            &repo,
            &index,
        )
        .await
        .unwrap();
        handle_attempt_analysis(
            &AttemptAnalysis {
                correlation_id: Uuid::new_v4(),
                disarmament_id,
                skills: skills.clone(),
                advantage: AdvantageType::None,
            },
            &config,
            &clock,
            &rng,
            &repo,
            &index,
        )
        .await
        .unwrap();
        let disarmed = handle_attempt_disarmament(
            &AttemptDisarmament {
                correlation_id: Uuid::new_v4(),
                disarmament_id,
                tool: ToolQuality::Proper,
                skills,
                advantage: AdvantageType::None,
            },
            &config,
            &clock,
            &rng,
            &repo,
            &index,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(disarmed.phase, TrapPhase::Disarmed);
        assert_eq!(disarmed.check.unwrap().roll.pool.count(), 9);
        let stream = repo.load_events(disarmament_id).await.unwrap();
        assert_eq!(stream.len(), 4);
        let replayed = reconstitute(disarmament_id, &stream).unwrap();
        assert_eq!(replayed.salvage, vec!["trigger-mechanism", "wire-bundle"]);
        assert_eq!(
            index.find_active(actor_id, "trap-disarmament").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_handle_abandon_disarmament_releases_index_entry() {
        let disarmament_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let repo = RecordingEventRepository::with_events(encountered_events(
            disarmament_id,
            actor_id,
            "jotun-defense",
        ));
        let index = RecordingActiveIndex::new();
        let command = AbandonDisarmament {
            correlation_id: Uuid::new_v4(),
            disarmament_id,
        };

        let result = handle_abandon_disarmament(&command, &FixedClock::default(), &repo, &index)
            .await
            .unwrap();

        assert_eq!(result.phase, TrapPhase::Abandoned);
        assert_eq!(index.released().len(), 1);
    }
}
