//! JSON payloads for the after-payment endpoints.
//!
//! Domain records stay framework-agnostic; these DTOs carry the wire shape
//! (camelCase keys, amount as a decimal string) and the OpenAPI schemas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::PaymentRecord;

/// Customer details embedded in a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    #[schema(example = "Ada")]
    pub first_name: String,
    #[schema(example = "Lovelace")]
    pub last_name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "+44 20 7946 0000")]
    pub phone: String,
    #[schema(example = "Kandy Tour")]
    pub trip_name: String,
}

/// Booking payload returned by `GET /api/after-payments/{orderId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecordDto {
    #[schema(example = "ORDER_1")]
    pub order_id: String,
    #[schema(example = "card")]
    pub payment_type: String,
    /// ISO 4217 currency code.
    #[schema(example = "USD")]
    pub currency: String,
    /// Decimal amount with two fraction digits.
    #[schema(example = "150.00")]
    pub amount: String,
    pub customer: CustomerDto,
    pub created_at: DateTime<Utc>,
}

impl From<&PaymentRecord> for PaymentRecordDto {
    fn from(record: &PaymentRecord) -> Self {
        let customer = record.customer();
        Self {
            order_id: record.order_id().to_string(),
            payment_type: record.payment_type().to_string(),
            currency: record.currency().to_string(),
            amount: record.amount().to_string(),
            customer: CustomerDto {
                first_name: customer.first_name().to_owned(),
                last_name: customer.last_name().to_owned(),
                email: customer.email().to_string(),
                phone: customer.phone().to_owned(),
                trip_name: customer.trip_name().to_owned(),
            },
            created_at: record.created_at(),
        }
    }
}

/// Acknowledgement returned by state-changing actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
    #[schema(example = "Email sent")]
    pub message: String,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Anti-forgery token to echo in the `X-CSRF-Token` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub csrf_token: String,
}
