use std::collections::HashMap;
use std::sync::RwLock;

use ulid::Ulid;

use super::traits::{SessionResolver, StoreError};
use super::types::{NewSession, ResolvedSession};

/// In-process [`SessionResolver`] keyed by ULID.
///
/// Sessions live until deleted or the process exits. Suitable for tests and
/// single-instance deployments.
#[derive(Debug, Default)]
pub struct MemorySessionResolver {
    sessions: RwLock<HashMap<String, ResolvedSession>>,
}

impl MemorySessionResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    "session map lock poisoned".into()
}

impl SessionResolver for MemorySessionResolver {
    async fn create(&self, session: NewSession) -> Result<String, StoreError> {
        let id = Ulid::new().to_string();
        let resolved = ResolvedSession::from_new(id.clone(), session);
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .insert(id.clone(), resolved);
        tracing::debug!(session_id = %id, "Session created");
        Ok(id)
    }

    async fn find(&self, session_id: &str) -> Result<Option<ResolvedSession>, StoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|_| poisoned())?
            .get(session_id)
            .cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions
            .write()
            .map_err(|_| poisoned())?
            .remove(session_id);
        Ok(())
    }
}
