//! After-payment fulfilment service.
//!
//! Serves a confirmed booking, emails its receipt and streams the receipt
//! as a PDF, with CSRF-guarded sessions on the server side and the page
//! session lifecycle in [`client`].

pub mod client;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
