//! Shared orchestration for procedure command handlers: the one-active-
//! instance guard, RNG locking, and committing an aggregate's events.

use std::sync::{Mutex, MutexGuard};

use runeforge_core::aggregate::AggregateRoot;
use runeforge_core::error::DomainError;
use runeforge_core::repository::{ActiveProcedureIndex, EventRepository, StoredEvent};
use runeforge_core::rng::DeterministicRng;
use tracing::debug;
use uuid::Uuid;

use crate::domain::procedure::ProcedureInstance;

/// Fails if `actor_id` already has an active instance of `kind`.
///
/// # Errors
///
/// Returns `DomainError::AlreadyActive` if an instance exists, or whatever
/// the index reports.
pub async fn ensure_no_active(
    index: &dyn ActiveProcedureIndex,
    actor_id: Uuid,
    kind: &str,
) -> Result<(), DomainError> {
    if let Some(existing) = index.find_active(actor_id, kind).await? {
        debug!(%actor_id, kind, %existing, "rejecting second active procedure");
        return Err(DomainError::AlreadyActive {
            actor_id,
            kind: kind.to_owned(),
        });
    }
    Ok(())
}

/// Locks the shared RNG. Hold the guard only around synchronous domain calls.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the mutex is poisoned.
pub fn lock_rng(
    rng: &Mutex<dyn DeterministicRng + Send>,
) -> Result<MutexGuard<'_, dyn DeterministicRng + Send + 'static>, DomainError> {
    rng.lock()
        .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))
}

/// Appends the aggregate's uncommitted events at its committed version and,
/// if the instance has reached a terminal phase, releases its index entry.
///
/// # Errors
///
/// Returns `DomainError` if appending or releasing fails.
pub async fn commit<A>(
    aggregate: &mut A,
    repo: &dyn EventRepository,
    index: &dyn ActiveProcedureIndex,
) -> Result<Vec<StoredEvent>, DomainError>
where
    A: AggregateRoot + ProcedureInstance,
{
    let stored_events: Vec<StoredEvent> = aggregate
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_domain_event)
        .collect();

    repo.append_events(
        aggregate.aggregate_id(),
        aggregate.committed_version(),
        &stored_events,
    )
    .await?;
    aggregate.clear_uncommitted_events();

    if aggregate.procedure().is_terminal() {
        index
            .release(aggregate.actor_id(), A::KIND, aggregate.instance_id())
            .await?;
    }

    Ok(stored_events)
}
