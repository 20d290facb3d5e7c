//! SMTP outbound adapters.
//!
//! This module provides a `lettre` implementation of the `MailRelay` port.

mod lettre_relay;

pub use lettre_relay::{LettreMailRelay, SmtpSettings};
