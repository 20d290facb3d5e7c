//! Session guard endpoints.
//!
//! ```text
//! GET  /api/payments/csrf-token
//! POST /api/logout
//! ```
//!
//! Issuing a token rotates the session: any record named by the incoming
//! cookie is revoked and a fresh one is bound to the response cookie.

use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use tracing::info;

use crate::domain::session_guard::TeardownOutcome;
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{ActionResponse, CsrfTokenResponse};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Header carrying the anti-forgery token on state-changing requests.
pub const CSRF_HEADER: &str = "X-CSRF-Token";
/// Value of `Clear-Site-Data` sent on logout.
pub const CLEAR_SITE_DATA: &str = "\"cookies\", \"storage\"";
/// Message returned after logout.
pub const LOGGED_OUT: &str = "Logged out";

/// Token presented in the [`CSRF_HEADER`] header, if readable.
pub(crate) fn presented_csrf_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Issue a fresh anti-forgery token bound to the session cookie.
#[utoipa::path(
    get,
    path = "/api/payments/csrf-token",
    responses(
        (status = 200, description = "Fresh CSRF token", body = CsrfTokenResponse),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["session"],
    operation_id = "getCsrfToken"
)]
#[get("/payments/csrf-token")]
pub async fn csrf_token(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let existing = session.session_id()?;
    let issued = state.csrf.issue(existing.as_ref()).await?;
    session.persist_session_id(&issued.session_id)?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(CsrfTokenResponse {
            csrf_token: issued.token.as_str().to_owned(),
        }))
}

/// End the session: revoke the server record, expire the cookie and ask
/// the browser to clear site storage.
///
/// Safe to repeat; a missing or already-ended session still succeeds.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session ended", body = ActionResponse),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["session"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let session_id = session.session_id()?;
    let outcome = state.csrf.teardown(session_id.as_ref()).await?;
    session.purge();
    if outcome == TeardownOutcome::AlreadyEnded {
        info!("logout for a session that had already ended");
    }

    Ok(HttpResponse::Ok()
        .insert_header((
            header::HeaderName::from_static("clear-site-data"),
            HeaderValue::from_static(CLEAR_SITE_DATA),
        ))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(ActionResponse::ok(LOGGED_OUT)))
}
