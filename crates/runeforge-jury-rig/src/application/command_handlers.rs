//! Command handlers for the jury-rig procedure.
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

use crate::domain::aggregates::{JuryRig, JuryRigPhase};
use crate::domain::commands::{
    AbandonJuryRig, ApplyIteration, AttemptExperiment, AttemptObservation,
    AttemptPatternRecognition, ProbeMechanism, SelectMethod, SkipObservation,
    SkipPatternRecognition, StartJuryRig,
};
use crate::domain::events::{JuryRigEvent, JuryRigEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct JuryRigCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
    /// Phase after the command.
    pub phase: JuryRigPhase,
    /// The check rolled, if any.
    pub check: Option<CheckResult>,
}

/// Reconstitutes a `JuryRig` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    jury_rig_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<JuryRig, DomainError> {
    let mut rig = JuryRig::new(jury_rig_id);
    for stored in existing_events {
        let kind: JuryRigEventKind = serde_json::from_value(stored.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("event deserialization failed: {e}"))
        })?;
        rig.apply(&JuryRigEvent {
            metadata: stored.metadata(),
            kind,
        });
    }
    Ok(rig)
}

async fn load(jury_rig_id: Uuid, repo: &dyn EventRepository) -> Result<JuryRig, DomainError> {
    let existing_events = repo.load_events(jury_rig_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(jury_rig_id));
    }
    reconstitute(jury_rig_id, &existing_events)
}

async fn finish(
    mut rig: JuryRig,
    check: Option<CheckResult>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    let stored_events = commit(&mut rig, repo, index).await?;
    let phase = rig.procedure().phase();

    if let Some(check) = &check {
        debug!(
            outcome = %check.outcome,
            net_successes = check.net_successes,
            effective_dc = check.effective_dc,
            "jury-rig check resolved"
        );
    }
    if check.as_ref().is_some_and(|c| !c.is_success())
        && let Some(complication) = rig.last_complication
    {
        debug!(
            %complication,
            damage_taken = rig.damage_taken,
            alarm = rig.alarm_raised,
            "experiment complication"
        );
    }
    match phase {
        JuryRigPhase::MechanismDestroyed | JuryRigPhase::PermanentlyLocked => {
            warn!(
                jury_rig_id = %rig.id,
                mechanism_type = %rig.mechanism_type,
                %phase,
                "mechanism lost"
            );
        }
        JuryRigPhase::Bypassed | JuryRigPhase::Destroyed => {
            info!(
                jury_rig_id = %rig.id,
                %phase,
                iterations = rig.iterations,
                salvage = ?rig.salvage,
                "mechanism opened"
            );
        }
        _ => {}
    }

    Ok(JuryRigCommandResult {
        aggregate_id: rig.id,
        stored_events,
        phase,
        check,
    })
}

/// Handles the `StartJuryRig` command.
///
/// This is a CREATION command; the handler generates the `jury_rig_id`
/// and indexes it once its events are stored.
///
/// # Errors
///
/// Returns `DomainError::AlreadyActive` if the actor is already jury-rigging,
/// or `DomainError` if validation, indexing, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(actor_id = %command.actor_id, mechanism_type = %command.mechanism_type))]
pub async fn handle_start_jury_rig(
    command: &StartJuryRig,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling start_jury_rig command");

    ensure_no_active(index, command.actor_id, JuryRig::KIND).await?;

    let mut rig = JuryRig::new(Uuid::now_v7());
    rig.start(
        command.actor_id,
        &command.mechanism_type,
        command.base_dc,
        command.glitched,
        &command.familiar_types,
        command.correlation_id,
        clock,
    )?;

    let result = finish(rig, None, repo, index).await?;
    index
        .mark_active(command.actor_id, JuryRig::KIND, result.aggregate_id)
        .await?;
    Ok(result)
}

/// Handles the `AttemptObservation` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, config, clock, rng, repo, index), fields(jury_rig_id = %command.jury_rig_id))]
pub async fn handle_attempt_observation(
    command: &AttemptObservation,
    config: &RulesConfig,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling attempt_observation command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    let check = {
        let mut rng_guard = lock_rng(rng)?;
        rig.attempt_observation(
            &command.skills,
            command.advantage,
            &config.skill_check(),
            command.correlation_id,
            clock,
            &mut *rng_guard,
        )?
    };
    debug!(hints = rig.hints.len(), "mechanism observed");
    finish(rig, Some(check), repo, index).await
}

/// Handles the `SkipObservation` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(jury_rig_id = %command.jury_rig_id))]
pub async fn handle_skip_observation(
    command: &SkipObservation,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling skip_observation command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    rig.skip_observation(command.correlation_id, clock)?;
    finish(rig, None, repo, index).await
}

/// Handles the `ProbeMechanism` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(jury_rig_id = %command.jury_rig_id, component = %command.component))]
pub async fn handle_probe_mechanism(
    command: &ProbeMechanism,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling probe_mechanism command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    rig.probe(&command.component, command.correlation_id, clock)?;
    finish(rig, None, repo, index).await
}

/// Handles the `AttemptPatternRecognition` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, config, clock, rng, repo, index), fields(jury_rig_id = %command.jury_rig_id))]
pub async fn handle_attempt_pattern_recognition(
    command: &AttemptPatternRecognition,
    config: &RulesConfig,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling attempt_pattern_recognition command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    let check = {
        let mut rng_guard = lock_rng(rng)?;
        rig.attempt_pattern_recognition(
            &command.skills,
            command.advantage,
            &config.skill_check(),
            command.correlation_id,
            clock,
            &mut *rng_guard,
        )?
    };
    finish(rig, Some(check), repo, index).await
}

/// Handles the `SkipPatternRecognition` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(jury_rig_id = %command.jury_rig_id))]
pub async fn handle_skip_pattern_recognition(
    command: &SkipPatternRecognition,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling skip_pattern_recognition command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    rig.skip_pattern_recognition(command.correlation_id, clock)?;
    finish(rig, None, repo, index).await
}

/// Handles the `SelectMethod` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(jury_rig_id = %command.jury_rig_id, method = %command.method))]
pub async fn handle_select_method(
    command: &SelectMethod,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling select_method command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    rig.select_method(command.method, command.correlation_id, clock)?;
    finish(rig, None, repo, index).await
}

/// Handles the `AttemptExperiment` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, config, clock, rng, repo, index), fields(jury_rig_id = %command.jury_rig_id))]
pub async fn handle_attempt_experiment(
    command: &AttemptExperiment,
    config: &RulesConfig,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling attempt_experiment command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    let check = {
        let mut rng_guard = lock_rng(rng)?;
        rig.experiment(
            &command.skills,
            command.advantage,
            &config.skill_check(),
            &config.procedure(JuryRig::KIND),
            command.correlation_id,
            clock,
            &mut *rng_guard,
        )?
    };
    finish(rig, Some(check), repo, index).await
}

/// Handles the `ApplyIteration` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(jury_rig_id = %command.jury_rig_id))]
pub async fn handle_apply_iteration(
    command: &ApplyIteration,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling apply_iteration command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    rig.iterate(command.correlation_id, clock)?;
    finish(rig, None, repo, index).await
}

/// Handles the `AbandonJuryRig` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(jury_rig_id = %command.jury_rig_id))]
pub async fn handle_abandon_jury_rig(
    command: &AbandonJuryRig,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<JuryRigCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling abandon_jury_rig command");

    let mut rig = load(command.jury_rig_id, repo).await?;
    rig.abandon(command.correlation_id, clock)?;
    finish(rig, None, repo, index).await
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

    use crate::domain::mechanism::BypassMethod;

    fn start_command(actor_id: Uuid, mechanism_type: &str, glitched: bool) -> StartJuryRig {
        StartJuryRig {
            correlation_id: Uuid::new_v4(),
            actor_id,
            mechanism_type: mechanism_type.to_owned(),
            base_dc: 6,
            glitched,
            familiar_types: Vec::new(),
        }
    }

    fn started_events(jury_rig_id: Uuid, actor_id: Uuid, glitched: bool) -> Vec<StoredEvent> {
        let mut rig = JuryRig::new(jury_rig_id);
        rig.start(
            actor_id,
            "door-lock",
            6,
            glitched,
            &[],
            Uuid::new_v4(),
            &FixedClock::default(),
        )
        .unwrap();
        rig.uncommitted_events()
            .iter()
            .map(StoredEvent::from_domain_event)
            .collect()
    }

    #[tokio::test]
    async fn test_handle_start_jury_rig_persists_and_marks_active() {
        // Arrange
        let actor_id = Uuid::new_v4();
        let repo = RecordingEventRepository::new();
        let index = RecordingActiveIndex::new();

        // Act
        let result = handle_start_jury_rig(
            &start_command(actor_id, "terminal", false),
            &FixedClock::default(),
            &repo,
            &index,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.phase, JuryRigPhase::Observation);
        assert_eq!(result.stored_events[0].event_type, "jury_rig.started");
        assert_eq!(repo.appended_events()[0].1, 0);
        assert_eq!(
            index.marked(),
            vec![(actor_id, "jury-rig".to_owned(), result.aggregate_id)]
        );
    }

    #[tokio::test]
    async fn test_handle_start_jury_rig_rejects_second_active_instance() {
        let repo = RecordingEventRepository::new();
        let index = RecordingActiveIndex::with_active(Uuid::new_v4());

        let result = handle_start_jury_rig(
            &start_command(Uuid::new_v4(), "terminal", false),
            &FixedClock::default(),
            &repo,
            &index,
        )
        .await;

        assert!(matches!(result, Err(DomainError::AlreadyActive { .. })));
        assert!(repo.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_handle_select_method_before_probing_appends_nothing() {
        let jury_rig_id = Uuid::new_v4();
        let repo =
            RecordingEventRepository::with_events(started_events(jury_rig_id, Uuid::new_v4(), false));
        let command = SelectMethod {
            correlation_id: Uuid::new_v4(),
            jury_rig_id,
            method: BypassMethod::MemorizedSequence,
        };

        let result = handle_select_method(
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
    async fn test_handle_apply_iteration_returns_not_found_when_no_events() {
        let jury_rig_id = Uuid::new_v4();
        let command = ApplyIteration {
            correlation_id: Uuid::new_v4(),
            jury_rig_id,
        };

        let result = handle_apply_iteration(
            &command,
            &FixedClock::default(),
            &EmptyEventRepository,
            &RecordingActiveIndex::new(),
        )
        .await;

        match result.unwrap_err() {
            DomainError::AggregateNotFound(id) => assert_eq!(id, jury_rig_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_glitched_lock_bypassed_against_in_memory_store() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let index = InMemoryActiveIndex::new();
        let clock = FixedClock::default();
        let config = RulesConfig::default();
        let actor_id = Uuid::new_v4();
        let jury_rig_id = handle_start_jury_rig(
            &start_command(actor_id, "door-lock", true),
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap()
        .aggregate_id;
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![10, 10, 10, 10]));

        // Act
        handle_probe_mechanism(
            &ProbeMechanism {
                correlation_id: Uuid::new_v4(),
                jury_rig_id,
                component: "keycard reader".to_owned(),
            },
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap();
        handle_select_method(
            &SelectMethod {
                correlation_id: Uuid::new_v4(),
                jury_rig_id,
                method: BypassMethod::GlitchExploitation,
            },
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap();
        let result = handle_attempt_experiment(
            &AttemptExperiment {
                correlation_id: Uuid::new_v4(),
                jury_rig_id,
                skills: SkillSheet::new().with("system-bypass", 4),
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
        let check = result.check.unwrap();
        assert_eq!(check.outcome, CheckOutcome::Success);
        assert_eq!(check.effective_dc, 4);
        assert_eq!(result.phase, JuryRigPhase::Bypassed);
        let stream = repo.load_events(jury_rig_id).await.unwrap();
        let types: Vec<&str> = stream.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "jury_rig.started",
                "jury_rig.observation_skipped",
                "jury_rig.mechanism_probed",
                "jury_rig.pattern_recognition_skipped",
                "jury_rig.method_selected",
                "jury_rig.experiment_attempted",
            ]
        );
        let replayed = reconstitute(jury_rig_id, &stream).unwrap();
        assert!(replayed.familiar);
        assert!(replayed.salvage.is_empty());
        assert_eq!(replayed.probed_component.as_deref(), Some("keycard reader"));
        assert_eq!(index.find_active(actor_id, "jury-rig").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_experiment_then_iteration_returns_to_method_selection() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let index = InMemoryActiveIndex::new();
        let clock = FixedClock::default();
        let config = RulesConfig::default();
        let jury_rig_id = handle_start_jury_rig(
            &start_command(Uuid::new_v4(), "elevator", false),
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap()
        .aggregate_id;
        // two dice without successes, then a 7 on the complication table
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![4, 6, 7]));
        handle_probe_mechanism(
            &ProbeMechanism {
                correlation_id: Uuid::new_v4(),
                jury_rig_id,
                component: "call panel".to_owned(),
            },
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap();
        handle_select_method(
            &SelectMethod {
                correlation_id: Uuid::new_v4(),
                jury_rig_id,
                method: BypassMethod::PowerCycling,
            },
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap();

        // Act
        let failed = handle_attempt_experiment(
            &AttemptExperiment {
                correlation_id: Uuid::new_v4(),
                jury_rig_id,
                skills: SkillSheet::new().with("system-bypass", 2),
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
        let iterated = handle_apply_iteration(
            &ApplyIteration {
                correlation_id: Uuid::new_v4(),
                jury_rig_id,
            },
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(failed.phase, JuryRigPhase::Iterate);
        assert_eq!(iterated.phase, JuryRigPhase::MethodSelection);
        let replayed = reconstitute(jury_rig_id, &repo.load_events(jury_rig_id).await.unwrap())
            .unwrap();
        assert_eq!(replayed.iterations, 1);
        assert_eq!(replayed.failed_experiments, 1);
        assert_eq!(replayed.method, None);
    }

    #[tokio::test]
    async fn test_handle_abandon_jury_rig_releases_index_entry() {
        let jury_rig_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let repo =
            RecordingEventRepository::with_events(started_events(jury_rig_id, actor_id, false));
        let index = RecordingActiveIndex::new();
        let command = AbandonJuryRig {
            correlation_id: Uuid::new_v4(),
            jury_rig_id,
        };

        let result = handle_abandon_jury_rig(&command, &FixedClock::default(), &repo, &index)
            .await
            .unwrap();

        assert_eq!(result.phase, JuryRigPhase::Abandoned);
        assert_eq!(
            index.released(),
            vec![(actor_id, "jury-rig".to_owned(), jury_rig_id)]
        );
    }
}
