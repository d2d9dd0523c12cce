//! In-memory implementation of the `ActiveProcedureIndex` trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use runeforge_core::error::DomainError;
use runeforge_core::repository::ActiveProcedureIndex;

/// Active instance per (actor, kind).
#[derive(Debug, Default)]
pub struct InMemoryActiveIndex {
    entries: Mutex<HashMap<(Uuid, String), Uuid>>,
}

impl InMemoryActiveIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(Uuid, String), Uuid>>, DomainError> {
        self.entries
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("active index lock poisoned: {e}")))
    }
}

#[async_trait]
impl ActiveProcedureIndex for InMemoryActiveIndex {
    async fn find_active(&self, actor_id: Uuid, kind: &str) -> Result<Option<Uuid>, DomainError> {
        let entries = self.lock()?;
        Ok(entries.get(&(actor_id, kind.to_owned())).copied())
    }

    async fn mark_active(
        &self,
        actor_id: Uuid,
        kind: &str,
        instance_id: Uuid,
    ) -> Result<(), DomainError> {
        let mut entries = self.lock()?;
        let key = (actor_id, kind.to_owned());
        if entries.get(&key).is_some_and(|existing| *existing != instance_id) {
            return Err(DomainError::AlreadyActive {
                actor_id,
                kind: kind.to_owned(),
            });
        }
        entries.insert(key, instance_id);
        debug!(%actor_id, kind, %instance_id, "marked procedure active");
        Ok(())
    }

    async fn release(
        &self,
        actor_id: Uuid,
        kind: &str,
        instance_id: Uuid,
    ) -> Result<(), DomainError> {
        let mut entries = self.lock()?;
        let key = (actor_id, kind.to_owned());
        if entries.get(&key) == Some(&instance_id) {
            entries.remove(&key);
            debug!(%actor_id, kind, %instance_id, "released procedure");
        }
        Ok(())
    }
}
