//! In-memory implementation of the `EventRepository` trait.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use runeforge_core::error::DomainError;
use runeforge_core::repository::{EventRepository, StoredEvent};

/// Event streams keyed by aggregate id.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events stored for `aggregate_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn stream_len(&self, aggregate_id: Uuid) -> Result<usize, DomainError> {
        let streams = self
            .streams
            .read()
            .map_err(|e| DomainError::Infrastructure(format!("event store lock poisoned: {e}")))?;
        Ok(streams.get(&aggregate_id).map_or(0, Vec::len))
    }
}

fn current_version(stream: &[StoredEvent]) -> i64 {
    stream.last().map_or(0, |event| event.sequence_number)
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = self
            .streams
            .read()
            .map_err(|e| DomainError::Infrastructure(format!("event store lock poisoned: {e}")))?;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|e| DomainError::Infrastructure(format!("event store lock poisoned: {e}")))?;
        let stream = streams.entry(aggregate_id).or_default();

        let actual = current_version(stream);
        if actual != expected_version {
            warn!(%aggregate_id, expected_version, actual, "rejecting stale append");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let mut next = actual;
        for event in events {
            if event.aggregate_id != aggregate_id {
                return Err(DomainError::InvalidArgument(format!(
                    "event {} belongs to aggregate {}, not {aggregate_id}",
                    event.event_id, event.aggregate_id
                )));
            }
            next += 1;
            if event.sequence_number != next {
                return Err(DomainError::InvalidArgument(format!(
                    "event {} has sequence number {}, expected {next}",
                    event.event_id, event.sequence_number
                )));
            }
        }

        stream.extend_from_slice(events);
        debug!(%aggregate_id, appended = events.len(), version = next, "appended events");
        Ok(())
    }
}
