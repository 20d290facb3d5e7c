//! Driven port for the OAuth2 `refresh_token` grant.
//!
//! The credential broker owns caching and single-flight behaviour; adapters
//! behind this port perform exactly one exchange per call and never retry.

use async_trait::async_trait;

use crate::domain::credentials::AccessToken;

use super::define_port_error;

define_port_error! {
    /// Errors raised while exchanging a refresh token for an access token.
    pub enum TokenExchangeError {
        /// The token endpoint did not answer in time.
        Timeout { message: String } => "token exchange timed out: {message}",
        /// The token endpoint refused the grant (4xx).
        Rejected { status: u16, message: String } =>
            "token exchange rejected with status {status}: {message}",
        /// The request failed below HTTP or with a server-side status.
        Transport { message: String } => "token exchange transport failure: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "token exchange response invalid: {message}",
    }
}

/// Exchange a long-lived refresh token for a short-lived access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Perform a single exchange.
    async fn exchange(&self) -> Result<AccessToken, TokenExchangeError>;
}
