//! Receipt content shared by the email and document renderers.
//!
//! Both channels print the same labelled fields in the same order, so the
//! list is built once here from a [`PaymentRecord`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::PaymentRecord;

/// Title printed at the top of the receipt document and email.
pub const RECEIPT_TITLE: &str = "Payment Receipt";

/// How the capture date is printed on receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateStyle {
    /// `8/18/2025`, matching the usual browser default.
    #[default]
    UsNumeric,
    /// `2025-08-18`.
    Iso,
    /// `18 August 2025`.
    Long,
}

impl DateStyle {
    /// Format a timestamp's calendar date in this style.
    pub fn format(self, at: DateTime<Utc>) -> String {
        match self {
            Self::UsNumeric => at.format("%-m/%-d/%Y").to_string(),
            Self::Iso => at.format("%Y-%m-%d").to_string(),
            Self::Long => at.format("%-d %B %Y").to_string(),
        }
    }
}

/// Error raised when a date style name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown receipt date style '{0}'; expected us|iso|long")]
pub struct UnknownDateStyle(pub String);

impl FromStr for DateStyle {
    type Err = UnknownDateStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Self::UsNumeric),
            "iso" => Ok(Self::Iso),
            "long" => Ok(Self::Long),
            _ => Err(UnknownDateStyle(s.to_owned())),
        }
    }
}

/// A single labelled line on a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptField {
    pub label: &'static str,
    pub value: String,
}

impl fmt::Display for ReceiptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

/// Build the ordered receipt fields for a record.
///
/// # Examples
/// ```ignore
/// let fields = receipt_fields(&record, DateStyle::UsNumeric);
/// assert_eq!(fields[0].label, "Order ID");
/// ```
pub fn receipt_fields(record: &PaymentRecord, date_style: DateStyle) -> Vec<ReceiptField> {
    let customer = record.customer();
    vec![
        field("Order ID", record.order_id().as_str()),
        field("Payment Type", record.payment_type().as_str()),
        field("Trip Name", customer.trip_name()),
        field(
            "Amount",
            format!("{} {}", record.currency(), record.amount()),
        ),
        field("Name", customer.full_name()),
        field("Email", customer.email().as_str()),
        field("Phone", customer.phone()),
        field("Date", date_style.format(record.created_at())),
    ]
}

fn field(label: &'static str, value: impl Into<String>) -> ReceiptField {
    ReceiptField {
        label,
        value: value.into(),
    }
}
