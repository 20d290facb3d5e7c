//! Tests for the domain error payload.

use super::*;
use rstest::rstest;
use serde_json::{Value, json};
use uuid::Uuid;

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::forbidden("nope"), ErrorCode::Forbidden)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::conflict("busy"), ErrorCode::Conflict)]
#[case(Error::upstream("relay down"), ErrorCode::UpstreamFailure)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_expected_code(#[case] error: Error, #[case] code: ErrorCode) {
    assert_eq!(error.code(), code);
}

#[test]
fn blank_message_is_replaced() {
    let error = Error::internal("   ");
    assert_eq!(error.message(), "Unexpected error");
}

#[test]
fn serialises_message_under_error_key() {
    let error = Error::upstream("Failed to send email").with_details("smtp timeout");
    let value = serde_json::to_value(&error).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "error": "Failed to send email",
            "code": "upstream_failure",
            "details": "smtp timeout"
        })
    );
}

#[test]
fn omits_absent_optional_fields() {
    let value = serde_json::to_value(Error::not_found("Payment not found")).expect("serialise");
    assert!(value.get("details").is_none());
    assert!(value.get("traceId").is_none());
}

#[tokio::test]
async fn captures_ambient_trace_id() {
    let trace_id = TraceId::from_uuid(Uuid::nil());
    let error = TraceId::scope(trace_id, async { Error::forbidden("Invalid CSRF token") }).await;
    let value: Value = serde_json::to_value(&error).expect("serialise");
    assert_eq!(
        value.get("traceId").and_then(Value::as_str),
        Some("00000000-0000-0000-0000-000000000000")
    );
}

#[test]
fn display_includes_details() {
    let error = Error::upstream("Failed to send email").with_details("quota exceeded");
    assert_eq!(error.to_string(), "Failed to send email: quota exceeded");
}
