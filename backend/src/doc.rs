//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: the after-payment endpoints, the session guard endpoints and
//!   the health probes
//! - **Schemas**: the JSON DTOs plus [`ErrorSchema`] and [`ErrorCodeSchema`],
//!   which describe domain errors without coupling them to utoipa
//! - **Security**: the anonymous session cookie that binds a CSRF token
//!
//! The generated document is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::dto::{
    ActionResponse, CsrfTokenResponse, CustomerDto, PaymentRecordDto,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by GET /api/payments/csrf-token.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "After-payment fulfilment API",
        description = "Booking lookup, receipt email and download, and CSRF-guarded session teardown."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::after_payments::get_booking,
        crate::inbound::http::after_payments::email_receipt,
        crate::inbound::http::after_payments::download_receipt,
        crate::inbound::http::csrf::csrf_token,
        crate::inbound::http::csrf::logout,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        PaymentRecordDto,
        CustomerDto,
        ActionResponse,
        CsrfTokenResponse,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "after-payments", description = "Receipts for completed orders"),
        (name = "session", description = "Anti-forgery tokens and logout"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_wire_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "error");
        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[test]
    fn openapi_booking_schema_uses_camel_case() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let booking = schemas.get("PaymentRecordDto").expect("booking schema");

        assert_object_schema_has_field(booking, "orderId");
        assert_object_schema_has_field(booking, "createdAt");
    }

    #[test]
    fn openapi_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/after-payments/{orderId}",
            "/api/after-payments/{orderId}/email-receipt",
            "/api/after-payments/{orderId}/download-receipt",
            "/api/payments/csrf-token",
            "/api/logout",
            "/health/ready",
            "/health/live",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing path {path}");
        }
    }
}
