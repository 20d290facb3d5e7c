//! Reqwest-backed OAuth2 token exchange adapter.
//!
//! This adapter owns transport details only: form serialisation, timeout and
//! HTTP error mapping, and JSON decoding into an [`AccessToken`]. Caching and
//! single-flight coordination live in the credential broker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{TokenErrorDto, TokenResponseDto};
use crate::domain::credentials::AccessToken;
use crate::domain::ports::{TokenExchange, TokenExchangeError};

/// Client registration and long-lived refresh token for the mail account.
pub struct OAuthClientCredentials {
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub refresh_token: Zeroizing<String>,
}

impl std::fmt::Debug for OAuthClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Token exchange adapter that POSTs the `refresh_token` grant to one endpoint.
pub struct HttpTokenExchange {
    client: Client,
    endpoint: Url,
    credentials: OAuthClientCredentials,
    clock: Arc<dyn Clock>,
}

impl HttpTokenExchange {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        credentials: OAuthClientCredentials,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            credentials,
            clock,
        })
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn exchange(&self) -> Result<AccessToken, TokenExchangeError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let token = parse_token(body.as_ref(), self.clock.utc())?;
        debug!(expires_at = %token.expires_at(), "exchanged refresh token");
        Ok(token)
    }
}

fn parse_token(
    body: &[u8],
    now: chrono::DateTime<chrono::Utc>,
) -> Result<AccessToken, TokenExchangeError> {
    let decoded: TokenResponseDto = serde_json::from_slice(body).map_err(|error| {
        TokenExchangeError::decode(format!("invalid token response payload: {error}"))
    })?;
    decoded
        .into_access_token(now)
        .map_err(TokenExchangeError::decode)
}

fn map_transport_error(error: reqwest::Error) -> TokenExchangeError {
    if error.is_timeout() {
        TokenExchangeError::timeout(error.to_string())
    } else {
        TokenExchangeError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> TokenExchangeError {
    // Error bodies are reduced to the OAuth `error` fields; raw bodies may echo
    // request parameters.
    let summary = serde_json::from_slice::<TokenErrorDto>(body)
        .ok()
        .and_then(|dto| dto.summary());
    let message = match summary {
        Some(summary) => format!("status {}: {summary}", status.as_u16()),
        None => format!("status {}", status.as_u16()),
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            TokenExchangeError::timeout(message)
        }
        _ if status.is_client_error() => TokenExchangeError::rejected(status.as_u16(), message),
        _ => TokenExchangeError::transport(message),
    }
}
