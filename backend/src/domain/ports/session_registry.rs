//! Driven port for server-side session records.
//!
//! The session cookie only names a session; the registry decides whether that
//! session is still live. Revoking a record therefore invalidates every copy
//! of the cookie, including replayed ones.

use async_trait::async_trait;

use crate::domain::session_guard::{SessionId, SessionRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by session registry adapters.
    pub enum SessionRegistryError {
        /// The backing store could not be used.
        Unavailable { message: String } => "session registry unavailable: {message}",
    }
}

/// Storage for issued session records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Store a freshly issued record, replacing any with the same id.
    async fn insert(&self, record: SessionRecord) -> Result<(), SessionRegistryError>;

    /// Fetch a record that has not been revoked.
    ///
    /// Expiry is checked by the caller against its own clock.
    async fn find(&self, session_id: &SessionId)
    -> Result<Option<SessionRecord>, SessionRegistryError>;

    /// Remove a record. Returns `true` when a record was present.
    async fn revoke(&self, session_id: &SessionId) -> Result<bool, SessionRegistryError>;
}
