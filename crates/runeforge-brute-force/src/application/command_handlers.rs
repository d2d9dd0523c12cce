//! Command handlers for the brute-force procedure.
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

use crate::domain::aggregates::{BruteForce, BruteForcePhase};
use crate::domain::commands::{AbandonBruteForce, AttemptForce, InitiateBruteForce};
use crate::domain::events::{BruteForceEvent, BruteForceEventKind};

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct BruteForceCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
    /// Phase after the command.
    pub phase: BruteForcePhase,
    /// The check rolled, if any.
    pub check: Option<CheckResult>,
}

/// Reconstitutes a `BruteForce` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    brute_force_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<BruteForce, DomainError> {
    let mut attempt = BruteForce::new(brute_force_id);
    for stored in existing_events {
        let kind: BruteForceEventKind =
            serde_json::from_value(stored.payload.clone()).map_err(|e| {
                DomainError::Infrastructure(format!("event deserialization failed: {e}"))
            })?;
        attempt.apply(&BruteForceEvent {
            metadata: stored.metadata(),
            kind,
        });
    }
    Ok(attempt)
}

async fn load(
    brute_force_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<BruteForce, DomainError> {
    let existing_events = repo.load_events(brute_force_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(brute_force_id));
    }
    reconstitute(brute_force_id, &existing_events)
}

async fn finish(
    mut attempt: BruteForce,
    check: Option<CheckResult>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<BruteForceCommandResult, DomainError> {
    let stored_events = commit(&mut attempt, repo, index).await?;
    let phase = attempt.procedure().phase();

    if let Some(check) = &check {
        debug!(
            outcome = %check.outcome,
            net_successes = check.net_successes,
            effective_dc = check.effective_dc,
            "force check resolved"
        );
        if check.outcome.is_fumble() {
            warn!(
                brute_force_id = %attempt.id,
                damage_taken = attempt.damage_taken,
                broken_tools = ?attempt.broken_tools,
                "brute force fumbled"
            );
        }
    }
    match phase {
        BruteForcePhase::Breached => {
            info!(
                brute_force_id = %attempt.id,
                barrier = %attempt.barrier,
                attempts = attempt.attempts,
                noise = %attempt.loudest_noise,
                content_damage = attempt.content_damage,
                "barrier breached"
            );
        }
        BruteForcePhase::Exhausted => {
            warn!(
                brute_force_id = %attempt.id,
                barrier = %attempt.barrier,
                attempts = attempt.attempts,
                "barrier held; actor exhausted"
            );
        }
        _ => {}
    }

    Ok(BruteForceCommandResult {
        aggregate_id: attempt.id,
        stored_events,
        phase,
        check,
    })
}

/// Handles the `InitiateBruteForce` command.
///
/// This is a CREATION command; the handler generates the `brute_force_id`
/// and indexes it once its events are stored.
///
/// # Errors
///
/// Returns `DomainError::AlreadyActive` if the actor is already forcing a
/// barrier, or `DomainError` if indexing or appending fails.
#[instrument(skip(command, clock, repo, index), fields(actor_id = %command.actor_id, barrier = %command.barrier))]
pub async fn handle_initiate_brute_force(
    command: &InitiateBruteForce,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<BruteForceCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling initiate_brute_force command");

    ensure_no_active(index, command.actor_id, BruteForce::KIND).await?;

    let mut attempt = BruteForce::new(Uuid::now_v7());
    attempt.initiate(
        command.actor_id,
        command.barrier,
        command.correlation_id,
        clock,
    )?;

    let result = finish(attempt, None, repo, index).await?;
    index
        .mark_active(command.actor_id, BruteForce::KIND, result.aggregate_id)
        .await?;
    Ok(result)
}

/// Handles the `AttemptForce` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, config, clock, rng, repo, index), fields(brute_force_id = %command.brute_force_id))]
pub async fn handle_attempt_force(
    command: &AttemptForce,
    config: &RulesConfig,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<BruteForceCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling attempt_force command");

    let mut attempt = load(command.brute_force_id, repo).await?;
    let check = {
        let mut rng_guard = lock_rng(rng)?;
        attempt.force(
            &command.skills,
            command.effort,
            command.advantage,
            &config.skill_check(),
            &config.procedure(BruteForce::KIND),
            command.correlation_id,
            clock,
            &mut *rng_guard,
        )?
    };
    finish(attempt, Some(check), repo, index).await
}

/// Handles the `AbandonBruteForce` command.
///
/// # Errors
///
/// Returns `DomainError` if loading, validation, or appending fails.
#[instrument(skip(command, clock, repo, index), fields(brute_force_id = %command.brute_force_id))]
pub async fn handle_abandon_brute_force(
    command: &AbandonBruteForce,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<BruteForceCommandResult, DomainError> {
    info!(correlation_id = %command.correlation_id, "handling abandon_brute_force command");

    let mut attempt = load(command.brute_force_id, repo).await?;
    attempt.abandon(command.correlation_id, clock)?;
    finish(attempt, None, repo, index).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use runeforge_event_store::{InMemoryActiveIndex, InMemoryEventRepository};
    use runeforge_rules::domain::check::CheckOutcome;
    use runeforge_rules::domain::dice::AdvantageType;
    use runeforge_rules::domain::skills::SkillSheet;
    use runeforge_test_support::{
        EmptyEventRepository, FailingEventRepository, FixedClock, MockRng, RecordingActiveIndex,
        RecordingEventRepository, SequenceRng,
    };

    use crate::domain::barrier::{BarrierKind, ForceEffort, Tool};

    fn initiated_events(brute_force_id: Uuid, actor_id: Uuid) -> Vec<StoredEvent> {
        let mut attempt = BruteForce::new(brute_force_id);
        attempt
            .initiate(
                actor_id,
                BarrierKind::ReinforcedDoor,
                Uuid::new_v4(),
                &FixedClock::default(),
            )
            .unwrap();
        attempt
            .uncommitted_events()
            .iter()
            .map(StoredEvent::from_domain_event)
            .collect()
    }

    fn attempt_command(brute_force_id: Uuid, might: u32, effort: ForceEffort) -> AttemptForce {
        AttemptForce {
            correlation_id: Uuid::new_v4(),
            brute_force_id,
            skills: SkillSheet::new().with("might", might),
            effort,
            advantage: AdvantageType::None,
        }
    }

    #[tokio::test]
    async fn test_handle_initiate_brute_force_persists_and_marks_active() {
        // Arrange
        let actor_id = Uuid::new_v4();
        let repo = RecordingEventRepository::new();
        let index = RecordingActiveIndex::new();
        let command = InitiateBruteForce {
            correlation_id: Uuid::new_v4(),
            actor_id,
            barrier: BarrierKind::Vault,
        };

        // Act
        let result = handle_initiate_brute_force(&command, &FixedClock::default(), &repo, &index)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.phase, BruteForcePhase::Forcing);
        assert_eq!(result.stored_events.len(), 1);
        assert_eq!(result.stored_events[0].event_type, "brute_force.initiated");
        assert_eq!(
            index.marked(),
            vec![(actor_id, "brute-force".to_owned(), result.aggregate_id)]
        );
    }

    #[tokio::test]
    async fn test_handle_initiate_brute_force_rejects_second_active_instance() {
        let repo = RecordingEventRepository::new();
        let index = RecordingActiveIndex::with_active(Uuid::new_v4());
        let command = InitiateBruteForce {
            correlation_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            barrier: BarrierKind::SimpleDoor,
        };

        let result =
            handle_initiate_brute_force(&command, &FixedClock::default(), &repo, &index).await;

        assert!(matches!(result, Err(DomainError::AlreadyActive { .. })));
        assert!(repo.appended_events().is_empty());
        assert!(index.marked().is_empty());
    }

    #[tokio::test]
    async fn test_handle_initiate_brute_force_does_not_index_when_append_fails() {
        let index = RecordingActiveIndex::new();
        let command = InitiateBruteForce {
            correlation_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            barrier: BarrierKind::SimpleDoor,
        };

        let result = handle_initiate_brute_force(
            &command,
            &FixedClock::default(),
            &FailingEventRepository,
            &index,
        )
        .await;

        match result.unwrap_err() {
            DomainError::Infrastructure(message) => assert_eq!(message, "connection refused"),
            other => panic!("expected Infrastructure, got {other:?}"),
        }
        assert!(index.marked().is_empty());
    }

    #[tokio::test]
    async fn test_handle_attempt_force_records_fumble_and_stays_active() {
        // Arrange
        let brute_force_id = Uuid::new_v4();
        let repo = RecordingEventRepository::with_events(initiated_events(
            brute_force_id,
            Uuid::new_v4(),
        ));
        let index = RecordingActiveIndex::new();
        let rng: Mutex<MockRng> = Mutex::new(MockRng);
        let effort = ForceEffort {
            tool: Some(Tool::Crowbar),
            ..ForceEffort::default()
        };

        // Act
        let result = handle_attempt_force(
            &attempt_command(brute_force_id, 2, effort),
            &RulesConfig::default(),
            &FixedClock::default(),
            &rng,
            &repo,
            &index,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(result.check.unwrap().outcome, CheckOutcome::Fumble);
        assert_eq!(result.phase, BruteForcePhase::Forcing);
        let appended = repo.appended_events();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].1, 1);
        assert_eq!(appended[0].2[0].event_type, "brute_force.force_attempted");
        assert!(index.released().is_empty());
    }

    #[tokio::test]
    async fn test_handle_attempt_force_returns_not_found_when_no_events() {
        let brute_force_id = Uuid::new_v4();
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![]));

        let result = handle_attempt_force(
            &attempt_command(brute_force_id, 3, ForceEffort::default()),
            &RulesConfig::default(),
            &FixedClock::default(),
            &rng,
            &EmptyEventRepository,
            &RecordingActiveIndex::new(),
        )
        .await;

        match result.unwrap_err() {
            DomainError::AggregateNotFound(id) => assert_eq!(id, brute_force_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_attempt_force_propagates_repository_failure() {
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(vec![]));

        let result = handle_attempt_force(
            &attempt_command(Uuid::new_v4(), 3, ForceEffort::default()),
            &RulesConfig::default(),
            &FixedClock::default(),
            &rng,
            &FailingEventRepository,
            &RecordingActiveIndex::new(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_door_breached_on_second_attempt_against_in_memory_store() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let index = InMemoryActiveIndex::new();
        let clock = FixedClock::default();
        let config = RulesConfig::default();
        let actor_id = Uuid::new_v4();
        let brute_force_id = handle_initiate_brute_force(
            &InitiateBruteForce {
                correlation_id: Uuid::new_v4(),
                actor_id,
                barrier: BarrierKind::SimpleDoor,
            },
            &clock,
            &repo,
            &index,
        )
        .await
        .unwrap()
        .aggregate_id;
        let mut script = vec![5, 5];
        script.extend([10; 9]);
        let rng: Mutex<SequenceRng> = Mutex::new(SequenceRng::new(script));
        let shoulder = attempt_command(brute_force_id, 2, ForceEffort::default());
        let hammer = attempt_command(
            brute_force_id,
            5,
            ForceEffort {
                tool: Some(Tool::Sledgehammer),
                assistants: 2,
                exhaustion: 0,
            },
        );

        // Act
        let first = handle_attempt_force(&shoulder, &config, &clock, &rng, &repo, &index)
            .await
            .unwrap();
        let second = handle_attempt_force(&hammer, &config, &clock, &rng, &repo, &index)
            .await
            .unwrap();

        // Assert
        assert_eq!(first.phase, BruteForcePhase::Forcing);
        let check = second.check.unwrap();
        // 12 base, +1 for the failed shoulder charge, -4 for the sledgehammer
        assert_eq!(check.effective_dc, 9);
        assert_eq!(check.outcome, CheckOutcome::CriticalSuccess);
        assert_eq!(second.phase, BruteForcePhase::Breached);
        let replayed =
            reconstitute(brute_force_id, &repo.load_events(brute_force_id).await.unwrap())
                .unwrap();
        assert_eq!(replayed.attempts, 2);
        assert_eq!(replayed.exhaustion_gained, 1);
        assert_eq!(
            index.find_active(actor_id, "brute-force").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_handle_abandon_brute_force_releases_index_entry() {
        let brute_force_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let repo =
            RecordingEventRepository::with_events(initiated_events(brute_force_id, actor_id));
        let index = RecordingActiveIndex::new();
        let command = AbandonBruteForce {
            correlation_id: Uuid::new_v4(),
            brute_force_id,
        };

        let result = handle_abandon_brute_force(&command, &FixedClock::default(), &repo, &index)
            .await
            .unwrap();

        assert_eq!(result.phase, BruteForcePhase::Abandoned);
        assert_eq!(
            index.released(),
            vec![(actor_id, "brute-force".to_owned(), brute_force_id)]
        );
    }
}
