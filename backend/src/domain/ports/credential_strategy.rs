//! Port for obtaining mail relay credentials.
//!
//! Two strategies exist: fixed username/password credentials and an OAuth2
//! broker that refreshes bearer tokens. The mail dispatcher is written once
//! against this trait.

use async_trait::async_trait;

use crate::domain::credentials::RelayAuth;

use super::{TokenExchangeError, define_port_error};

define_port_error! {
    /// Errors raised while producing relay credentials.
    pub enum CredentialRefreshError {
        /// The identity provider refused to issue a token.
        Rejected { message: String } => "credential refresh rejected: {message}",
        /// The identity provider did not answer in time.
        Timeout { message: String } => "credential refresh timed out: {message}",
        /// The identity provider could not be reached or answered garbage.
        Unavailable { message: String } => "credential refresh unavailable: {message}",
    }
}

impl From<TokenExchangeError> for CredentialRefreshError {
    fn from(err: TokenExchangeError) -> Self {
        match err {
            TokenExchangeError::Timeout { .. } => Self::timeout(err.to_string()),
            TokenExchangeError::Rejected { .. } => Self::rejected(err.to_string()),
            TokenExchangeError::Transport { .. } | TokenExchangeError::Decode { .. } => {
                Self::unavailable(err.to_string())
            }
        }
    }
}

/// Source of credentials for a single relay authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    /// Return credentials valid for at least the next send.
    async fn relay_auth(&self) -> Result<RelayAuth, CredentialRefreshError>;

    /// Forget `auth` after the relay rejected it.
    ///
    /// Implementations must ignore stale calls: if the cached credential has
    /// already been replaced, it stays.
    fn invalidate(&self, auth: &RelayAuth);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TokenExchangeError::timeout("10s"), "timed out")]
    #[case(TokenExchangeError::rejected(400_u16, "invalid_grant"), "rejected")]
    #[case(TokenExchangeError::transport("connection reset"), "unavailable")]
    #[case(TokenExchangeError::decode("missing access_token"), "unavailable")]
    fn exchange_errors_map_to_refresh_errors(
        #[case] source: TokenExchangeError,
        #[case] fragment: &str,
    ) {
        let mapped = CredentialRefreshError::from(source.clone());
        let rendered = mapped.to_string();
        assert!(rendered.contains(fragment), "{rendered}");
        assert!(rendered.contains(&source.to_string()), "{rendered}");
    }
}
