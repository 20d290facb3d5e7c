//! DTOs for decoding OAuth2 token endpoint responses.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::domain::credentials::AccessToken;

#[derive(Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    pub(super) expires_in: i64,
    #[serde(default)]
    pub(super) token_type: Option<String>,
}

impl TokenResponseDto {
    /// Convert into a domain token whose expiry is relative to `now`.
    pub(super) fn into_access_token(self, now: DateTime<Utc>) -> Result<AccessToken, String> {
        if self.access_token.is_empty() {
            return Err("access_token is empty".to_owned());
        }
        if self.expires_in <= 0 {
            return Err(format!("expires_in must be positive, got {}", self.expires_in));
        }
        match self.token_type.as_deref() {
            Some(kind) if !kind.eq_ignore_ascii_case("bearer") => {
                return Err(format!("unsupported token_type {kind}"));
            }
            _ => {}
        }
        let lifetime = TimeDelta::try_seconds(self.expires_in)
            .ok_or_else(|| format!("expires_in out of range: {}", self.expires_in))?;
        Ok(AccessToken::new(self.access_token, now + lifetime))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TokenErrorDto {
    #[serde(default)]
    pub(super) error: Option<String>,
    #[serde(default)]
    pub(super) error_description: Option<String>,
}

impl TokenErrorDto {
    /// Compact `error: description` summary; never includes secrets.
    pub(super) fn summary(&self) -> Option<String> {
        match (self.error.as_deref(), self.error_description.as_deref()) {
            (Some(error), Some(description)) => Some(format!("{error}: {description}")),
            (Some(error), None) => Some(error.to_owned()),
            (None, Some(description)) => Some(description.to_owned()),
            (None, None) => None,
        }
    }
}
