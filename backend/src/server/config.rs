//! HTTP server configuration object and environment parsing.
//!
//! Everything is read through [`mockable::Env`] so the rules below can be
//! exercised with `MockEnv`:
//!
//! - `MAIL_TRANSPORT` selects `smtp` (static credentials) or `oauth2`
//!   (refreshable bearer tokens). When it is unset the transport is inferred
//!   from which credential variables are present; both sets present is an
//!   error.
//! - `DATABASE_URL` is optional. Without it the server serves an empty
//!   in-memory store, which only suits local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use mockable::Env;
use reqwest::Url;
use zeroize::Zeroizing;

use crate::domain::DateStyle;
use crate::inbound::http::session_config::{
    BuildMode, SessionConfigError, SessionSettings, session_settings_from_env,
};
use crate::outbound::mail::SmtpSettings;

const BIND_ADDR_ENV: &str = "BIND_ADDR";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const DB_POOL_MAX_SIZE_ENV: &str = "DB_POOL_MAX_SIZE";
const DB_CONNECT_TIMEOUT_ENV: &str = "DB_CONNECT_TIMEOUT_SECS";
const MAIL_TRANSPORT_ENV: &str = "MAIL_TRANSPORT";
const SMTP_HOST_ENV: &str = "SMTP_HOST";
const SMTP_PORT_ENV: &str = "SMTP_PORT";
const SMTP_USER_ENV: &str = "SMTP_USER";
const SMTP_PASS_ENV: &str = "SMTP_PASS";
const OAUTH_CLIENT_ID_ENV: &str = "OAUTH_CLIENT_ID";
const OAUTH_CLIENT_SECRET_ENV: &str = "OAUTH_CLIENT_SECRET";
const OAUTH_REFRESH_TOKEN_ENV: &str = "OAUTH_REFRESH_TOKEN";
const OAUTH_USER_ENV: &str = "OAUTH_USER";
const OAUTH_TOKEN_URL_ENV: &str = "OAUTH_TOKEN_URL";
const MAIL_FROM_NAME_ENV: &str = "MAIL_FROM_NAME";
const MAIL_FROM_ADDRESS_ENV: &str = "MAIL_FROM_ADDRESS";
const MAIL_TIMEOUT_ENV: &str = "MAIL_TIMEOUT_SECS";
const RECEIPT_DATE_STYLE_ENV: &str = "RECEIPT_DATE_STYLE";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAIL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FROM_NAME: &str = "Receipts";

/// Errors raised while reading server configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {name}")]
    Missing { name: &'static str },
    /// A variable is present but could not be parsed.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Both credential sets are configured and `MAIL_TRANSPORT` is unset.
    #[error("both SMTP and OAuth2 credentials are set; choose one with MAIL_TRANSPORT")]
    AmbiguousTransport,
    /// Neither credential set is configured.
    #[error("no mail credentials configured; set SMTP_USER/SMTP_PASS or the OAUTH_* variables")]
    NoTransport,
    /// Session cookie settings were rejected.
    #[error(transparent)]
    Session(#[from] SessionConfigError),
}

/// Mail relay authentication strategy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MailTransport {
    /// Static username and password.
    Smtp,
    /// OAuth2 refresh-token grant with XOAUTH2.
    OAuth2,
}

impl FromStr for MailTransport {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "oauth2" => Ok(Self::OAuth2),
            _ => Err(()),
        }
    }
}

/// Credentials for the selected [`MailTransport`].
pub enum MailCredentials {
    Smtp {
        username: String,
        password: Zeroizing<String>,
    },
    OAuth2 {
        username: String,
        client_id: String,
        client_secret: Zeroizing<String>,
        refresh_token: Zeroizing<String>,
        token_url: Url,
    },
}

impl MailCredentials {
    /// Transport these credentials belong to.
    pub fn transport(&self) -> MailTransport {
        match self {
            Self::Smtp { .. } => MailTransport::Smtp,
            Self::OAuth2 { .. } => MailTransport::OAuth2,
        }
    }
}

impl std::fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Smtp { username, .. } => f
                .debug_struct("Smtp")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::OAuth2 {
                username,
                client_id,
                token_url,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("username", username)
                .field("client_id", client_id)
                .field("token_url", &token_url.as_str())
                .finish_non_exhaustive(),
        }
    }
}

/// Settings for the mail dispatcher and its relay.
#[derive(Debug)]
pub struct MailConfig {
    pub smtp: SmtpSettings,
    pub credentials: MailCredentials,
    pub from_name: String,
    pub from_address: String,
    pub date_style: DateStyle,
}

/// Settings for the PostgreSQL payment record store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_size: u32,
    pub connect_timeout: Duration,
}

/// Builder-style configuration for creating the HTTP server.
#[derive(Debug)]
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) database: Option<DatabaseConfig>,
    pub(crate) mail: MailConfig,
}

impl ServerConfig {
    /// Construct a server configuration from its parts.
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr, mail: MailConfig) -> Self {
        Self {
            session,
            bind_addr,
            database: None,
            mail,
        }
    }

    /// Serve payment records from PostgreSQL instead of the in-memory store.
    #[must_use]
    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    /// Read the whole configuration from the environment.
    ///
    /// `bind_override` (from the command line) wins over `BIND_ADDR`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing or malformed variables.
    pub fn from_env<E: Env>(
        env: &E,
        mode: BuildMode,
        bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let session = session_settings_from_env(env, mode)?;
        let bind_addr = match bind_override {
            Some(addr) => addr,
            None => parsed_or(env, BIND_ADDR_ENV, "host:port", DEFAULT_BIND_ADDR.parse())?,
        };
        let config = Self::new(session, bind_addr, mail_config_from_env(env)?);
        Ok(match database_config_from_env(env)? {
            Some(database) => config.with_database(database),
            None => config,
        })
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

fn non_blank<E: Env>(env: &E, name: &'static str) -> Option<String> {
    env.string(name).filter(|value| !value.trim().is_empty())
}

fn required<E: Env>(env: &E, name: &'static str) -> Result<String, ConfigError> {
    non_blank(env, name).ok_or(ConfigError::Missing { name })
}

/// Parse `name` when set, otherwise use `default`.
fn parsed_or<E: Env, T: FromStr>(
    env: &E,
    name: &'static str,
    expected: &'static str,
    default: Result<T, T::Err>,
) -> Result<T, ConfigError> {
    let invalid = |value: String| ConfigError::Invalid {
        name,
        value,
        expected,
    };
    match non_blank(env, name) {
        Some(value) => value.trim().parse().map_err(|_| invalid(value)),
        None => default.map_err(|_| invalid(String::new())),
    }
}

fn seconds_or<E: Env>(env: &E, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = parsed_or(env, name, "a whole number of seconds", Ok(default))?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: secs.to_string(),
            expected: "a positive number of seconds",
        });
    }
    Ok(Duration::from_secs(secs))
}

fn database_config_from_env<E: Env>(env: &E) -> Result<Option<DatabaseConfig>, ConfigError> {
    let Some(url) = non_blank(env, DATABASE_URL_ENV) else {
        return Ok(None);
    };
    let max_size = parsed_or(
        env,
        DB_POOL_MAX_SIZE_ENV,
        "a positive integer",
        Ok(DEFAULT_POOL_MAX_SIZE),
    )?;
    let connect_timeout = seconds_or(env, DB_CONNECT_TIMEOUT_ENV, DEFAULT_CONNECT_TIMEOUT_SECS)?;
    Ok(Some(DatabaseConfig {
        url,
        max_size,
        connect_timeout,
    }))
}

fn select_transport<E: Env>(env: &E) -> Result<MailTransport, ConfigError> {
    if let Some(value) = non_blank(env, MAIL_TRANSPORT_ENV) {
        return value.parse().map_err(|()| ConfigError::Invalid {
            name: MAIL_TRANSPORT_ENV,
            value,
            expected: "smtp|oauth2",
        });
    }
    let has_smtp = non_blank(env, SMTP_USER_ENV).is_some() && non_blank(env, SMTP_PASS_ENV).is_some();
    let has_oauth = [
        OAUTH_CLIENT_ID_ENV,
        OAUTH_CLIENT_SECRET_ENV,
        OAUTH_REFRESH_TOKEN_ENV,
    ]
    .into_iter()
    .all(|name| non_blank(env, name).is_some());
    match (has_smtp, has_oauth) {
        (true, true) => Err(ConfigError::AmbiguousTransport),
        (true, false) => Ok(MailTransport::Smtp),
        (false, true) => Ok(MailTransport::OAuth2),
        (false, false) => Err(ConfigError::NoTransport),
    }
}

fn credentials_from_env<E: Env>(
    env: &E,
    transport: MailTransport,
) -> Result<MailCredentials, ConfigError> {
    match transport {
        MailTransport::Smtp => Ok(MailCredentials::Smtp {
            username: required(env, SMTP_USER_ENV)?,
            password: Zeroizing::new(required(env, SMTP_PASS_ENV)?),
        }),
        MailTransport::OAuth2 => {
            let raw_url = required(env, OAUTH_TOKEN_URL_ENV)?;
            let token_url = Url::parse(&raw_url).map_err(|_| ConfigError::Invalid {
                name: OAUTH_TOKEN_URL_ENV,
                value: raw_url.clone(),
                expected: "an absolute URL",
            })?;
            Ok(MailCredentials::OAuth2 {
                username: required(env, OAUTH_USER_ENV)?,
                client_id: required(env, OAUTH_CLIENT_ID_ENV)?,
                client_secret: Zeroizing::new(required(env, OAUTH_CLIENT_SECRET_ENV)?),
                refresh_token: Zeroizing::new(required(env, OAUTH_REFRESH_TOKEN_ENV)?),
                token_url,
            })
        }
    }
}

fn mail_config_from_env<E: Env>(env: &E) -> Result<MailConfig, ConfigError> {
    let credentials = credentials_from_env(env, select_transport(env)?)?;
    let smtp = SmtpSettings {
        host: required(env, SMTP_HOST_ENV)?,
        port: parsed_or(env, SMTP_PORT_ENV, "a TCP port", Ok(DEFAULT_SMTP_PORT))?,
        timeout: seconds_or(env, MAIL_TIMEOUT_ENV, DEFAULT_MAIL_TIMEOUT_SECS)?,
    };
    let date_style = match non_blank(env, RECEIPT_DATE_STYLE_ENV) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name: RECEIPT_DATE_STYLE_ENV,
            value,
            expected: "us|iso|long",
        })?,
        None => DateStyle::default(),
    };
    Ok(MailConfig {
        smtp,
        credentials,
        from_name: non_blank(env, MAIL_FROM_NAME_ENV).unwrap_or_else(|| DEFAULT_FROM_NAME.to_owned()),
        from_address: required(env, MAIL_FROM_ADDRESS_ENV)?,
        date_style,
    })
}
