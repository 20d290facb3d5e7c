//! Receipt email dispatch.
//!
//! One dispatcher serves both credential strategies: it asks the strategy
//! for relay credentials, composes the receipt and hands it to the relay
//! exactly once. Rejected credentials are invalidated so the next dispatch
//! starts from a fresh token; the failed send itself is not retried.

use std::sync::Arc;

use tracing::{info, warn};

use super::PaymentRecord;
use super::ports::{CredentialRefreshError, CredentialStrategy, MailRelay, MailRelayError};
use super::receipt::DateStyle;
use super::receipt_email::ReceiptEmail;

/// Reasons a receipt email could not be handed to the relay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Relay credentials could not be obtained.
    #[error("could not obtain mail credentials: {message}")]
    Credential { message: String },
    /// The relay refused the credentials.
    #[error("mail relay refused credentials: {message}")]
    Authentication { message: String },
    /// The relay refused the message.
    #[error("mail relay rejected the receipt: {message}")]
    Rejected { message: String },
    /// The relay could not be reached.
    #[error("mail relay unreachable: {message}")]
    Transport { message: String },
    /// The relay or identity provider did not answer in time.
    #[error("mail dispatch timed out: {message}")]
    Timeout { message: String },
}

impl From<CredentialRefreshError> for DispatchError {
    fn from(err: CredentialRefreshError) -> Self {
        match err {
            CredentialRefreshError::Timeout { .. } => Self::Timeout {
                message: err.to_string(),
            },
            CredentialRefreshError::Rejected { .. } | CredentialRefreshError::Unavailable { .. } => {
                Self::Credential {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<MailRelayError> for DispatchError {
    fn from(err: MailRelayError) -> Self {
        let message = err.to_string();
        match err {
            MailRelayError::Authentication { .. } => Self::Authentication { message },
            MailRelayError::Rejected { .. } => Self::Rejected { message },
            MailRelayError::Transport { .. } => Self::Transport { message },
            MailRelayError::Timeout { .. } => Self::Timeout { message },
        }
    }
}

/// Sends receipt emails through a relay.
pub struct MailDispatcher {
    credentials: Arc<dyn CredentialStrategy>,
    relay: Arc<dyn MailRelay>,
    date_style: DateStyle,
}

impl MailDispatcher {
    pub fn new(
        credentials: Arc<dyn CredentialStrategy>,
        relay: Arc<dyn MailRelay>,
        date_style: DateStyle,
    ) -> Self {
        Self {
            credentials,
            relay,
            date_style,
        }
    }

    /// Compose and submit the receipt for `record`.
    ///
    /// Success means the relay accepted the message, not that it was
    /// delivered.
    pub async fn send_receipt(&self, record: &PaymentRecord) -> Result<(), DispatchError> {
        let order_id = record.order_id();
        let auth = self.credentials.relay_auth().await?;
        let email = ReceiptEmail::compose(record, self.date_style);

        match self.relay.deliver(&email, &auth).await {
            Ok(()) => {
                info!(%order_id, "receipt email accepted by relay");
                Ok(())
            }
            Err(error) => {
                if matches!(error, MailRelayError::Authentication { .. }) {
                    self.credentials.invalidate(&auth);
                }
                warn!(%order_id, %error, "receipt email dispatch failed");
                Err(error.into())
            }
        }
    }
}

impl std::fmt::Debug for MailDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailDispatcher")
            .field("date_style", &self.date_style)
            .finish_non_exhaustive()
    }
}
