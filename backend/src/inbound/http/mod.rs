//! HTTP inbound adapter exposing REST endpoints.

pub mod after_payments;
pub mod csrf;
pub mod dto;
pub mod error;
pub mod health;
pub mod receipt_stream;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
