//! Server half of the session guard.
//!
//! Issues anti-forgery tokens bound to a server-side session record,
//! validates them on state-changing requests and revokes the record on
//! logout. Only a SHA-256 digest of each token is stored, and presented
//! tokens are compared against it in constant time.
//!
//! Sessions are anonymous: the record ties a browser session to a token and
//! nothing else.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, error, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::Error;
use super::ports::{SessionRegistry, SessionRegistryError};

/// Random bytes in a CSRF token before hex encoding.
pub const CSRF_TOKEN_BYTES: usize = 32;
/// Message returned for any anti-forgery failure.
pub const INVALID_CSRF: &str = "Invalid CSRF token";
/// Default lifetime of a session record, matching the session cookie.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 2 * 60 * 60;

/// Opaque identifier naming a server-side session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Hex-encoded anti-forgery token as handed to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(Zeroizing<String>);

impl CsrfToken {
    /// Mint a token from [`CSRF_TOKEN_BYTES`] random bytes.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0_u8; CSRF_TOKEN_BYTES]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self(Zeroizing::new(hex::encode(&bytes[..])))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn digest(&self) -> CsrfDigest {
        CsrfDigest::of(self.as_str())
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(<redacted>)")
    }
}

/// SHA-256 digest of a CSRF token.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CsrfDigest([u8; 32]);

impl CsrfDigest {
    fn of(token: &str) -> Self {
        Self(Sha256::digest(token.as_bytes()).into())
    }

    /// Whether `presented` hashes to this digest, compared in constant time.
    pub fn matches(&self, presented: &str) -> bool {
        let candidate = Self::of(presented);
        self.0.as_slice().ct_eq(candidate.0.as_slice()).into()
    }
}

impl fmt::Debug for CsrfDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CsrfDigest({})", hex::encode(self.0))
    }
}

/// Server-side state for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub csrf_digest: CsrfDigest,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Result of [`CsrfGuard::issue`].
#[derive(Debug, Clone)]
pub struct IssuedCsrf {
    pub session_id: SessionId,
    pub token: CsrfToken,
}

/// Result of [`CsrfGuard::teardown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// A live record was revoked.
    Revoked,
    /// There was nothing to revoke; the session had already ended.
    AlreadyEnded,
}

fn registry_failure(err: &SessionRegistryError) -> Error {
    error!(error = %err, "session registry failure");
    Error::internal("Session store unavailable")
}

/// Issues, validates and revokes anti-forgery tokens.
pub struct CsrfGuard {
    registry: Arc<dyn SessionRegistry>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl CsrfGuard {
    pub fn new(registry: Arc<dyn SessionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(registry, clock, TimeDelta::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    pub fn with_ttl(
        registry: Arc<dyn SessionRegistry>,
        clock: Arc<dyn Clock>,
        ttl: TimeDelta,
    ) -> Self {
        Self {
            registry,
            clock,
            ttl,
        }
    }

    /// Mint a fresh session and token, revoking `existing` if present.
    ///
    /// Every call rotates the token: only its digest is kept, so a previous
    /// token can never be handed out again.
    pub async fn issue(&self, existing: Option<&SessionId>) -> Result<IssuedCsrf, Error> {
        if let Some(previous) = existing {
            self.registry
                .revoke(previous)
                .await
                .map_err(|err| registry_failure(&err))?;
        }

        let session_id = SessionId::generate();
        let token = CsrfToken::generate();
        let issued_at = self.clock.utc();
        self.registry
            .insert(SessionRecord {
                session_id,
                csrf_digest: token.digest(),
                issued_at,
                expires_at: issued_at + self.ttl,
            })
            .await
            .map_err(|err| registry_failure(&err))?;

        debug!(%session_id, "issued CSRF token");
        Ok(IssuedCsrf { session_id, token })
    }

    /// Check `presented` against the record for `session`.
    ///
    /// Missing, unknown, revoked or expired sessions and mismatched tokens
    /// all fail the same way.
    pub async fn validate(
        &self,
        session: Option<&SessionId>,
        presented: Option<&str>,
    ) -> Result<SessionId, Error> {
        let (Some(session_id), Some(presented)) = (session, presented) else {
            debug!("CSRF check without session or token");
            return Err(Error::forbidden(INVALID_CSRF));
        };

        let record = self
            .registry
            .find(session_id)
            .await
            .map_err(|err| registry_failure(&err))?;
        let now = self.clock.utc();
        match record {
            Some(record) if record.is_live_at(now) && record.csrf_digest.matches(presented) => {
                Ok(*session_id)
            }
            Some(record) if !record.is_live_at(now) => {
                debug!(%session_id, "CSRF check against expired session");
                Err(Error::forbidden(INVALID_CSRF))
            }
            Some(_) => {
                info!(%session_id, "CSRF token mismatch");
                Err(Error::forbidden(INVALID_CSRF))
            }
            None => {
                debug!(%session_id, "CSRF check against unknown session");
                Err(Error::forbidden(INVALID_CSRF))
            }
        }
    }

    /// Revoke the record for `session`. Safe to call repeatedly.
    pub async fn teardown(&self, session: Option<&SessionId>) -> Result<TeardownOutcome, Error> {
        let Some(session_id) = session else {
            return Ok(TeardownOutcome::AlreadyEnded);
        };
        let revoked = self
            .registry
            .revoke(session_id)
            .await
            .map_err(|err| registry_failure(&err))?;
        info!(%session_id, revoked, "session torn down");
        Ok(if revoked {
            TeardownOutcome::Revoked
        } else {
            TeardownOutcome::AlreadyEnded
        })
    }
}

impl fmt::Debug for CsrfGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfGuard")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
