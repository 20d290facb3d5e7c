//! Builders wiring outbound adapters into the HTTP state.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use crate::domain::credentials::{CredentialBroker, StaticCredentials};
use crate::domain::mail_dispatcher::MailDispatcher;
use crate::domain::ports::{CredentialStrategy, FixturePaymentRecordStore, PaymentRecordStore};
use crate::domain::receipt_document::ReceiptDocument;
use crate::domain::{AfterPaymentService, CsrfGuard};
use crate::inbound::http::state::HttpState;
use crate::outbound::mail::LettreMailRelay;
use crate::outbound::oauth::{HttpTokenExchange, OAuthClientCredentials};
use crate::outbound::persistence::{DbPool, DieselPaymentRecordStore, PoolConfig};
use crate::outbound::session::InMemorySessionRegistry;

use super::config::{DatabaseConfig, MailConfig, MailCredentials};

/// Errors raised while constructing adapters at startup.
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("failed to build database pool: {0}")]
    Pool(#[from] crate::outbound::persistence::PoolError),
    #[error("failed to build OAuth2 HTTP client: {0}")]
    OAuthClient(#[from] reqwest::Error),
    #[error("failed to configure mail relay: {0}")]
    MailRelay(#[from] crate::domain::ports::MailRelayError),
    #[error("failed to bind HTTP listener: {0}")]
    Bind(#[from] std::io::Error),
}

fn build_record_store(
    database: Option<&DatabaseConfig>,
) -> Result<Arc<dyn PaymentRecordStore>, StartupError> {
    let Some(database) = database else {
        warn!("DATABASE_URL not set; serving payment records from an empty in-memory store");
        return Ok(Arc::new(FixturePaymentRecordStore::default()));
    };
    let pool = DbPool::new(
        PoolConfig::new(database.url.clone())
            .with_max_size(database.max_size)
            .with_connection_timeout(database.connect_timeout),
    )?;
    Ok(Arc::new(DieselPaymentRecordStore::new(
        pool,
        database.connect_timeout,
    )))
}

fn build_credentials(
    mail: &MailConfig,
    clock: &Arc<dyn Clock>,
) -> Result<Arc<dyn CredentialStrategy>, StartupError> {
    match &mail.credentials {
        MailCredentials::Smtp { username, password } => {
            info!(transport = "smtp", "mail relay uses static credentials");
            Ok(Arc::new(StaticCredentials::new(
                username.clone(),
                password.clone(),
            )))
        }
        MailCredentials::OAuth2 {
            username,
            client_id,
            client_secret,
            refresh_token,
            token_url,
        } => {
            info!(transport = "oauth2", "mail relay uses refreshable bearer tokens");
            let exchange = HttpTokenExchange::new(
                token_url.clone(),
                OAuthClientCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                },
                mail.smtp.timeout,
                Arc::clone(clock),
            )?;
            Ok(Arc::new(CredentialBroker::new(
                username.clone(),
                Arc::new(exchange),
                Arc::clone(clock),
            )))
        }
    }
}

/// Build the handler state from configuration.
///
/// # Errors
///
/// Returns [`StartupError`] when an adapter cannot be constructed.
pub fn build_http_state(
    database: Option<&DatabaseConfig>,
    mail: &MailConfig,
) -> Result<HttpState, StartupError> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let store = build_record_store(database)?;
    let relay = LettreMailRelay::new(mail.smtp.clone(), mail.from_name.clone(), &mail.from_address)?;
    let dispatcher = MailDispatcher::new(
        build_credentials(mail, &clock)?,
        Arc::new(relay),
        mail.date_style,
    );
    let service = Arc::new(AfterPaymentService::new(
        store,
        Arc::new(dispatcher),
        ReceiptDocument::new(mail.date_style),
    ));
    let csrf = Arc::new(CsrfGuard::new(
        Arc::new(InMemorySessionRegistry::new()),
        clock,
    ));
    Ok(HttpState::new(service.clone(), service, csrf))
}
