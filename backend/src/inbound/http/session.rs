//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The cookie session carries one value: the id of the server-side CSRF
//! record. Everything else about the session lives in the registry.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::Error;
use crate::domain::session_guard::SessionId;

pub(crate) const SESSION_ID_KEY: &str = "session_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Remember the server-side record backing this browser session.
    pub fn persist_session_id(&self, session_id: &SessionId) -> Result<(), Error> {
        self.0
            .insert(SESSION_ID_KEY, session_id.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the record id from the cookie, if present and well formed.
    ///
    /// A tampered or malformed value is treated as no session.
    pub fn session_id(&self) -> Result<Option<SessionId>, Error> {
        let raw = self
            .0
            .get::<String>(SESSION_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        Ok(raw.and_then(|value| match value.parse() {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%error, "invalid session id in session cookie");
                None
            }
        }))
    }

    /// Drop every value and instruct the middleware to expire the cookie.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};

    use super::*;
    use crate::inbound::http::test_utils::test_session_middleware;

    #[actix_web::test]
    async fn round_trips_session_id() {
        let expected = SessionId::generate();
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set",
                    web::get().to(move |session: SessionContext| async move {
                        session.persist_session_id(&expected)?;
                        Ok::<_, Error>(HttpResponse::Ok())
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        let id = session.session_id()?;
                        Ok::<_, Error>(HttpResponse::Ok().body(
                            id.map(|id| id.to_string()).unwrap_or_default(),
                        ))
                    }),
                ),
        )
        .await;

        let set_res =
            test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        assert_eq!(set_res.status(), StatusCode::OK);
        let cookie = set_res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned();

        let get_res = test::call_service(
            &app,
            test::TestRequest::get().uri("/get").cookie(cookie).to_request(),
        )
        .await;
        let body = test::read_body(get_res).await;
        assert_eq!(body, expected.to_string());
    }

    #[actix_web::test]
    async fn tampered_session_id_reads_as_none() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set-invalid",
                    web::get().to(|session: Session| async move {
                        session
                            .insert(SESSION_ID_KEY, "not-a-uuid")
                            .expect("set invalid session id");
                        HttpResponse::Ok()
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        let id = session.session_id()?;
                        Ok::<_, Error>(HttpResponse::Ok().body(format!("{}", id.is_some())))
                    }),
                ),
        )
        .await;

        let set_res = test::call_service(
            &app,
            test::TestRequest::get().uri("/set-invalid").to_request(),
        )
        .await;
        let cookie = set_res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned();

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/get").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(test::read_body(res).await, "false");
    }
}
