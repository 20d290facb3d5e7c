//! OAuth2 outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `TokenExchange`
//! port for the `refresh_token` grant.

mod dto;
mod http_token_exchange;

pub use http_token_exchange::{HttpTokenExchange, OAuthClientCredentials};
