//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;
use zeroize::Zeroizing;

use super::session_config::SESSION_COOKIE_NAME;
use super::state::HttpState;
use crate::domain::credentials::StaticCredentials;
use crate::domain::mail_dispatcher::MailDispatcher;
use crate::domain::ports::{MailRelay, PaymentRecordStore};
use crate::domain::receipt_document::ReceiptDocument;
use crate::domain::{AfterPaymentService, CsrfGuard, DateStyle};
use crate::test_support::RecordingMailRelay;

/// Build a session middleware configured for tests.
///
/// Generates a fresh key per invocation and disables the `Secure` flag for
/// local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name(SESSION_COOKIE_NAME.to_owned())
        .cookie_secure(false)
        .build()
}

/// Handler state over the real service with a relay that accepts everything.
pub fn fixture_http_state(store: Arc<dyn PaymentRecordStore>, csrf: Arc<CsrfGuard>) -> HttpState {
    http_state_with_relay(store, Arc::new(RecordingMailRelay::default()), csrf)
}

/// Handler state over the real service and the supplied relay.
pub fn http_state_with_relay(
    store: Arc<dyn PaymentRecordStore>,
    relay: Arc<dyn MailRelay>,
    csrf: Arc<CsrfGuard>,
) -> HttpState {
    let credentials = Arc::new(StaticCredentials::new(
        "mailer",
        Zeroizing::new("secret".to_owned()),
    ));
    let dispatcher = MailDispatcher::new(credentials, relay, DateStyle::UsNumeric);
    let service = Arc::new(AfterPaymentService::new(
        store,
        Arc::new(dispatcher),
        ReceiptDocument::default(),
    ));
    HttpState::new(service.clone(), service, csrf)
}
