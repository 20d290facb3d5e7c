//! Driven port for handing a composed email to an outbound relay.

use async_trait::async_trait;

use crate::domain::credentials::RelayAuth;
use crate::domain::receipt_email::ReceiptEmail;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mail relay adapters.
    pub enum MailRelayError {
        /// The relay refused the supplied credentials.
        Authentication { message: String } => "mail relay authentication failed: {message}",
        /// The relay accepted the session but refused the message.
        Rejected { message: String } => "mail relay rejected the message: {message}",
        /// The relay could not be reached or the session broke.
        Transport { message: String } => "mail relay transport failure: {message}",
        /// The relay did not answer in time.
        Timeout { message: String } => "mail relay timed out: {message}",
    }
}

/// Outbound mail relay.
///
/// A successful return means the relay accepted the message for delivery,
/// not that it reached the recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Submit `email` once, authenticating with `auth`.
    async fn deliver(&self, email: &ReceiptEmail, auth: &RelayAuth) -> Result<(), MailRelayError>;
}
