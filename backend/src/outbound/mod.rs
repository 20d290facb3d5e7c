//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed payment record store using Diesel ORM
//! - **oauth**: reqwest-backed OAuth2 `refresh_token` exchange
//! - **mail**: lettre-backed SMTP relay
//! - **session**: in-process session registry for CSRF records
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod mail;
pub mod oauth;
pub mod persistence;
pub mod session;
