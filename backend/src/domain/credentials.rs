//! Mail relay credentials.
//!
//! [`StaticCredentials`] hands out a fixed username and password.
//! [`CredentialBroker`] caches an OAuth2 access token and refreshes it through
//! a [`TokenExchange`] when it is missing or about to expire. Concurrent
//! callers that find the cache empty share one in-flight exchange, so the
//! identity provider sees at most one refresh at a time.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use mockable::Clock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::ports::{CredentialRefreshError, CredentialStrategy, TokenExchange};

/// Tokens this close to expiry are treated as already expired.
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

/// Short-lived bearer token issued by the identity provider.
///
/// The secret is wiped from memory on drop and never serialised.
#[derive(Clone)]
pub struct AccessToken {
    value: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
            expires_at,
        }
    }

    /// The raw bearer token.
    pub fn secret(&self) -> &str {
        self.value.as_str()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token may still be presented at `now`, allowing for skew.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(TOKEN_EXPIRY_SKEW_SECS) < self.expires_at
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expires_at == other.expires_at && self.secret() == other.secret()
    }
}

impl Eq for AccessToken {}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Credentials presented to the mail relay for one session.
#[derive(Clone, PartialEq, Eq)]
pub enum RelayAuth {
    /// Username and password (`PLAIN`/`LOGIN`).
    Basic {
        username: String,
        password: Zeroizing<String>,
    },
    /// OAuth2 bearer token (`XOAUTH2`).
    Bearer { username: String, token: AccessToken },
}

impl RelayAuth {
    pub fn username(&self) -> &str {
        match self {
            Self::Basic { username, .. } | Self::Bearer { username, .. } => username,
        }
    }

    /// The password or bearer token.
    pub fn secret(&self) -> &str {
        match self {
            Self::Basic { password, .. } => password.as_str(),
            Self::Bearer { token, .. } => token.secret(),
        }
    }
}

impl fmt::Debug for RelayAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Basic { .. } => "Basic",
            Self::Bearer { .. } => "Bearer",
        };
        f.debug_struct(kind)
            .field("username", &self.username())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Fixed username/password credentials.
pub struct StaticCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: Zeroizing<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialStrategy for StaticCredentials {
    async fn relay_auth(&self) -> Result<RelayAuth, CredentialRefreshError> {
        Ok(RelayAuth::Basic {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }

    fn invalidate(&self, _auth: &RelayAuth) {
        // Nothing to refresh; the operator has to fix the configured secret.
        warn!(username = %self.username, "mail relay rejected static credentials");
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<AccessToken, CredentialRefreshError>>>;

enum Lookup {
    Cached(AccessToken),
    Refresh(RefreshFuture),
}

#[derive(Default)]
struct BrokerState {
    cached: Option<AccessToken>,
    in_flight: Option<RefreshFuture>,
}

/// OAuth2 credential cache with single-flight refresh.
///
/// # Examples
/// ```ignore
/// let broker = CredentialBroker::new("mailer@example.com", exchange, Arc::new(DefaultClock));
/// let auth = broker.relay_auth().await?;
/// ```
pub struct CredentialBroker {
    username: String,
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    state: Mutex<BrokerState>,
}

impl CredentialBroker {
    pub fn new(
        username: impl Into<String>,
        exchange: Arc<dyn TokenExchange>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            username: username.into(),
            exchange,
            clock,
            state: Mutex::new(BrokerState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bearer(&self, token: AccessToken) -> RelayAuth {
        RelayAuth::Bearer {
            username: self.username.clone(),
            token,
        }
    }

    /// Return the cached token, or join (or start) the refresh.
    fn cached_or_refresh(&self) -> Lookup {
        let now = self.clock.utc();
        let mut state = self.lock_state();
        if let Some(token) = state.cached.as_ref().filter(|t| t.is_usable_at(now)) {
            return Lookup::Cached(token.clone());
        }
        if let Some(in_flight) = state.in_flight.as_ref() {
            debug!("joining in-flight credential refresh");
            return Lookup::Refresh(in_flight.clone());
        }

        info!("refreshing mail relay access token");
        let exchange = Arc::clone(&self.exchange);
        let refresh = async move {
            exchange
                .exchange()
                .await
                .map_err(CredentialRefreshError::from)
        }
        .boxed()
        .shared();
        state.cached = None;
        state.in_flight = Some(refresh.clone());
        Lookup::Refresh(refresh)
    }

    fn settle(
        &self,
        refresh: &RefreshFuture,
        outcome: &Result<AccessToken, CredentialRefreshError>,
    ) {
        let mut state = self.lock_state();
        let owns_slot = state
            .in_flight
            .as_ref()
            .is_some_and(|current| Shared::ptr_eq(current, refresh));
        if !owns_slot {
            return;
        }
        state.in_flight = None;
        match outcome {
            Ok(token) => state.cached = Some(token.clone()),
            Err(error) => warn!(%error, "mail relay access token refresh failed"),
        }
    }
}

impl fmt::Debug for CredentialBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBroker")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialStrategy for CredentialBroker {
    async fn relay_auth(&self) -> Result<RelayAuth, CredentialRefreshError> {
        let refresh = match self.cached_or_refresh() {
            Lookup::Cached(token) => return Ok(self.bearer(token)),
            Lookup::Refresh(refresh) => refresh,
        };
        let outcome = refresh.clone().await;
        self.settle(&refresh, &outcome);
        outcome.map(|token| self.bearer(token))
    }

    fn invalidate(&self, auth: &RelayAuth) {
        let RelayAuth::Bearer { token, .. } = auth else {
            return;
        };
        let mut state = self.lock_state();
        if state.cached.as_ref() == Some(token) {
            debug!("dropping rejected mail relay access token");
            state.cached = None;
        }
    }
}
