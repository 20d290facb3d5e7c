//! `lettre`-backed SMTP relay adapter.
//!
//! A fresh STARTTLS transport is built for every send, so the credentials in
//! the supplied [`RelayAuth`] are always the ones presented. Basic auth offers
//! `PLAIN` then `LOGIN`; bearer auth offers only `XOAUTH2`.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::domain::credentials::RelayAuth;
use crate::domain::ports::{MailRelay, MailRelayError};
use crate::domain::receipt_email::ReceiptEmail;

/// Connection settings for the SMTP submission server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

/// Mail relay adapter that submits over SMTP with STARTTLS.
pub struct LettreMailRelay {
    settings: SmtpSettings,
    from: Mailbox,
}

impl LettreMailRelay {
    /// Build a relay sending as `from_name <from_address>`.
    ///
    /// # Errors
    ///
    /// Returns `MailRelayError::Rejected` when `from_address` is not a valid
    /// mailbox address.
    pub fn new(
        settings: SmtpSettings,
        from_name: impl Into<String>,
        from_address: &str,
    ) -> Result<Self, MailRelayError> {
        let address: Address = from_address
            .parse()
            .map_err(|err| MailRelayError::rejected(format!("invalid sender address: {err}")))?;
        Ok(Self {
            settings,
            from: Mailbox::new(Some(from_name.into()), address),
        })
    }

    fn transport(&self, auth: &RelayAuth) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailRelayError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)
            .map_err(|err| MailRelayError::transport(err.to_string()))?
            .port(self.settings.port)
            .timeout(Some(self.settings.timeout))
            .credentials(Credentials::new(
                auth.username().to_owned(),
                auth.secret().to_owned(),
            ))
            .authentication(mechanisms_for(auth))
            .build();
        Ok(transport)
    }
}

impl std::fmt::Debug for LettreMailRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LettreMailRelay")
            .field("settings", &self.settings)
            .field("from", &self.from.to_string())
            .finish()
    }
}

#[async_trait]
impl MailRelay for LettreMailRelay {
    async fn deliver(&self, email: &ReceiptEmail, auth: &RelayAuth) -> Result<(), MailRelayError> {
        let message = build_message(&self.from, email)?;
        let transport = self.transport(auth)?;

        let response = transport.send(message).await.map_err(|err| {
            classify_smtp_failure(
                err.status().map(|code| code.to_string()).as_deref(),
                err.is_permanent(),
                err.is_timeout(),
                err.to_string(),
            )
        })?;

        info!(
            host = %self.settings.host,
            code = %response.code(),
            "relay accepted receipt email"
        );
        Ok(())
    }
}

fn mechanisms_for(auth: &RelayAuth) -> Vec<Mechanism> {
    match auth {
        RelayAuth::Basic { .. } => vec![Mechanism::Plain, Mechanism::Login],
        RelayAuth::Bearer { .. } => vec![Mechanism::Xoauth2],
    }
}

fn build_message(from: &Mailbox, email: &ReceiptEmail) -> Result<Message, MailRelayError> {
    let address: Address = email
        .to()
        .as_str()
        .parse()
        .map_err(|err| MailRelayError::rejected(format!("invalid recipient address: {err}")))?;
    let to = Mailbox::new(Some(email.to_name().to_owned()), address);

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject())
        .multipart(MultiPart::alternative_plain_html(
            email.text_body().to_owned(),
            email.html_body().to_owned(),
        ))
        .map_err(|err| MailRelayError::rejected(format!("message could not be built: {err}")))
}

/// Map an SMTP failure onto the relay error taxonomy.
///
/// Permanent 53x replies are authentication failures (535 bad credentials,
/// 534 mechanism refused, 530 auth required); any other permanent reply is a
/// rejection of the message itself.
fn classify_smtp_failure(
    code: Option<&str>,
    permanent: bool,
    timed_out: bool,
    message: String,
) -> MailRelayError {
    debug!(code, permanent, timed_out, "smtp send failed");
    if timed_out {
        return MailRelayError::timeout(message);
    }
    match code {
        Some(code) if permanent && code.starts_with("53") => {
            MailRelayError::authentication(message)
        }
        Some(_) if permanent => MailRelayError::rejected(message),
        _ => MailRelayError::transport(message),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use zeroize::Zeroizing;

    use super::*;
    use crate::domain::DateStyle;
    use crate::domain::credentials::AccessToken;
    use crate::test_support::{fixture_now, sample_record};

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_owned(),
            port: 587,
            timeout: Duration::from_secs(30),
        }
    }

    #[rstest]
    #[case::bad_credentials(Some("535"), true, false)]
    #[case::mechanism_refused(Some("534"), true, false)]
    fn permanent_auth_replies_are_authentication(
        #[case] code: Option<&str>,
        #[case] permanent: bool,
        #[case] timed_out: bool,
    ) {
        let err = classify_smtp_failure(code, permanent, timed_out, "auth".to_owned());
        assert!(matches!(err, MailRelayError::Authentication { .. }));
    }

    #[rstest]
    fn permanent_mailbox_reply_is_rejected() {
        let err = classify_smtp_failure(Some("550"), true, false, "no such user".to_owned());
        assert!(matches!(err, MailRelayError::Rejected { .. }));
    }

    #[rstest]
    #[case::transient(Some("421"), false)]
    #[case::no_reply(None, false)]
    fn other_failures_are_transport(#[case] code: Option<&str>, #[case] permanent: bool) {
        let err = classify_smtp_failure(code, permanent, false, "busy".to_owned());
        assert!(matches!(err, MailRelayError::Transport { .. }));
    }

    #[rstest]
    fn timeouts_win_over_status() {
        let err = classify_smtp_failure(None, false, true, "timed out".to_owned());
        assert!(matches!(err, MailRelayError::Timeout { .. }));
    }

    #[test]
    fn basic_auth_offers_plain_then_login() {
        let auth = RelayAuth::Basic {
            username: "mailer".to_owned(),
            password: Zeroizing::new("secret".to_owned()),
        };
        assert_eq!(mechanisms_for(&auth), vec![Mechanism::Plain, Mechanism::Login]);
    }

    #[test]
    fn bearer_auth_offers_only_xoauth2() {
        let auth = RelayAuth::Bearer {
            username: "mailer@example.com".to_owned(),
            token: AccessToken::new("ya29", fixture_now()),
        };
        assert_eq!(mechanisms_for(&auth), vec![Mechanism::Xoauth2]);
    }

    #[test]
    fn message_is_addressed_to_the_customer() {
        let relay = LettreMailRelay::new(settings(), "Tours", "receipts@example.com")
            .expect("valid sender");
        let email = ReceiptEmail::compose(&sample_record("ORDER_1"), DateStyle::UsNumeric);

        let message = build_message(&relay.from, &email).expect("message builds");
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(formatted.contains("a@b.com"));
        assert!(formatted.contains("receipts@example.com"));
        assert!(formatted.contains("Payment Confirmation - ORDER_1"));
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let err = LettreMailRelay::new(settings(), "Tours", "not an address")
            .expect_err("invalid sender");
        assert!(matches!(err, MailRelayError::Rejected { .. }));
    }
}
