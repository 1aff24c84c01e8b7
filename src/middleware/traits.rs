use std::future::Future;

use super::types::{NewSession, ResolvedSession};

/// Boxed error returned by consumer stores.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided session persistence.
///
/// Sessions are identified by opaque `String` IDs; the implementation picks
/// the format (ULID, UUID, ...).
///
/// # Example
///
/// ```rust,ignore
/// impl SessionResolver for MyAppState {
///     async fn create(&self, session: NewSession) -> Result<String, StoreError> {
///         let id = Ulid::new().to_string();
///         self.db.insert_session(&id, &session).await?;
///         Ok(id)
///     }
///
///     async fn find(&self, session_id: &str) -> Result<Option<ResolvedSession>, StoreError> {
///         self.db.find_session(session_id).await
///     }
///
///     async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
///         self.db.delete_session(session_id).await
///     }
/// }
/// ```
pub trait SessionResolver: Send + Sync + 'static {
    /// Persist a new session. Returns its ID.
    fn create(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Look up a session. `None` if it does not exist or has expired.
    fn find(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<ResolvedSession>, StoreError>> + Send;

    /// Delete a session (logout).
    fn delete(&self, session_id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
