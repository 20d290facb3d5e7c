//! In-process implementation of the `SessionRegistry` port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{SessionRegistry, SessionRegistryError};
use crate::domain::session_guard::{SessionId, SessionRecord};

type Records = HashMap<SessionId, SessionRecord>;

/// Session registry backed by a mutex-guarded map.
///
/// Expired records are pruned whenever a new record is inserted, using the
/// new record's issue time as "now", so the map does not grow without bound.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRegistry {
    records: Arc<Mutex<Records>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>, SessionRegistryError> {
        self.records
            .lock()
            .map_err(|_| SessionRegistryError::unavailable("session registry lock poisoned"))
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn insert(&self, record: SessionRecord) -> Result<(), SessionRegistryError> {
        let mut records = self.lock()?;
        let now = record.issued_at;
        records.retain(|_, existing| existing.is_live_at(now));
        records.insert(record.session_id, record);
        Ok(())
    }

    async fn find(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, SessionRegistryError> {
        Ok(self.lock()?.get(session_id).cloned())
    }

    async fn revoke(&self, session_id: &SessionId) -> Result<bool, SessionRegistryError> {
        Ok(self.lock()?.remove(session_id).is_some())
    }
}
