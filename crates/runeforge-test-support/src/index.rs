//! Mock `ActiveProcedureIndex` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use runeforge_core::error::DomainError;
use runeforge_core::repository::ActiveProcedureIndex;
use uuid::Uuid;

/// Reports a preset active instance (or none) and records mark/release calls.
#[derive(Debug, Default)]
pub struct RecordingActiveIndex {
    active: Option<Uuid>,
    marked: Mutex<Vec<(Uuid, String, Uuid)>>,
    released: Mutex<Vec<(Uuid, String, Uuid)>>,
}

impl RecordingActiveIndex {
    /// An index with no active instances.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that reports `instance_id` as active for every actor and kind.
    #[must_use]
    pub fn with_active(instance_id: Uuid) -> Self {
        Self {
            active: Some(instance_id),
            ..Self::default()
        }
    }

    /// Recorded `mark_active` calls as (actor, kind, instance).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn marked(&self) -> Vec<(Uuid, String, Uuid)> {
        self.marked.lock().unwrap().clone()
    }

    /// Recorded `release` calls as (actor, kind, instance).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn released(&self) -> Vec<(Uuid, String, Uuid)> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActiveProcedureIndex for RecordingActiveIndex {
    async fn find_active(&self, _actor_id: Uuid, _kind: &str) -> Result<Option<Uuid>, DomainError> {
        Ok(self.active)
    }

    async fn mark_active(
        &self,
        actor_id: Uuid,
        kind: &str,
        instance_id: Uuid,
    ) -> Result<(), DomainError> {
        self.marked
            .lock()
            .unwrap()
            .push((actor_id, kind.to_owned(), instance_id));
        Ok(())
    }

    async fn release(
        &self,
        actor_id: Uuid,
        kind: &str,
        instance_id: Uuid,
    ) -> Result<(), DomainError> {
        self.released
            .lock()
            .unwrap()
            .push((actor_id, kind.to_owned(), instance_id));
        Ok(())
    }
}

/// Fails every call with an infrastructure error.
#[derive(Debug)]
pub struct FailingActiveIndex;

#[async_trait]
impl ActiveProcedureIndex for FailingActiveIndex {
    async fn find_active(&self, _actor_id: Uuid, _kind: &str) -> Result<Option<Uuid>, DomainError> {
        Err(DomainError::Infrastructure("index unavailable".into()))
    }

    async fn mark_active(
        &self,
        _actor_id: Uuid,
        _kind: &str,
        _instance_id: Uuid,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("index unavailable".into()))
    }

    async fn release(
        &self,
        _actor_id: Uuid,
        _kind: &str,
        _instance_id: Uuid,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("index unavailable".into()))
    }
}
