//! Receipt email composition.
//!
//! Builds the confirmation message sent to the customer after payment. The
//! HTML body escapes every record value; the plain-text alternative carries
//! the same lines.

use std::fmt::Write as _;

use super::receipt::{DateStyle, receipt_fields};
use super::{EmailAddress, PaymentRecord};

const HEADING: &str = "Payment Confirmation";
const OPENING: &str = "Thank you for your payment!";
const CLOSING: &str = "We look forward to serving you!";

/// A fully composed receipt email, ready for a relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptEmail {
    to: EmailAddress,
    to_name: String,
    subject: String,
    html_body: String,
    text_body: String,
}

impl ReceiptEmail {
    /// Compose the receipt email for `record`.
    ///
    /// # Examples
    /// ```ignore
    /// let email = ReceiptEmail::compose(&record, DateStyle::UsNumeric);
    /// assert_eq!(email.subject(), "Payment Confirmation - ORDER_1");
    /// ```
    pub fn compose(record: &PaymentRecord, date_style: DateStyle) -> Self {
        let fields = receipt_fields(record, date_style);

        let mut html = format!("<h2>{HEADING}</h2>\n<p>{OPENING}</p>\n");
        let mut text = format!("{HEADING}\n\n{OPENING}\n\n");
        for field in &fields {
            // Writing to a String cannot fail.
            let _ = writeln!(
                html,
                "<p><strong>{}:</strong> {}</p>",
                field.label,
                html_escape::encode_safe(&field.value)
            );
            let _ = writeln!(text, "{field}");
        }
        let _ = writeln!(html, "<p>{CLOSING}</p>");
        let _ = write!(text, "\n{CLOSING}\n");

        Self {
            to: record.customer().email().clone(),
            to_name: record.customer().full_name(),
            subject: format!("{HEADING} - {}", record.order_id()),
            html_body: html,
            text_body: text,
        }
    }

    pub fn to(&self) -> &EmailAddress {
        &self.to
    }

    /// Display name of the recipient.
    pub fn to_name(&self) -> &str {
        &self.to_name
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn html_body(&self) -> &str {
        &self.html_body
    }

    pub fn text_body(&self) -> &str {
        &self.text_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerDraft, PaymentRecordDraft};
    use crate::test_support::sample_record;
    use chrono::Utc;

    #[test]
    fn subject_names_the_order() {
        let email = ReceiptEmail::compose(&sample_record("ORDER_1"), DateStyle::UsNumeric);
        assert_eq!(email.subject(), "Payment Confirmation - ORDER_1");
        assert_eq!(email.to().as_str(), "a@b.com");
        assert_eq!(email.to_name(), "A B");
    }

    #[test]
    fn bodies_list_fields_between_greeting_and_closing() {
        let email = ReceiptEmail::compose(&sample_record("ORDER_1"), DateStyle::UsNumeric);
        let text = email.text_body();

        let opening = text.find(OPENING).expect("opening line");
        let order = text.find("Order ID: ORDER_1").expect("order line");
        let amount = text.find("Amount: USD 150.00").expect("amount line");
        let date = text.find("Date: 8/18/2025").expect("date line");
        let closing = text.find(CLOSING).expect("closing line");
        assert!(opening < order && order < amount && amount < date && date < closing);

        assert!(
            email
                .html_body()
                .contains("<p><strong>Trip Name:</strong> Kandy Tour</p>")
        );
    }

    #[test]
    fn html_body_escapes_record_values() {
        let record = PaymentRecord::try_from_draft(PaymentRecordDraft {
            order_id: "ORDER_9".into(),
            payment_type: "card".into(),
            currency: "USD".into(),
            amount: "1".into(),
            customer: CustomerDraft {
                first_name: "<script>alert(1)</script>".into(),
                last_name: "O'Brien & Co".into(),
                email: "x@y.com".into(),
                phone: String::new(),
                trip_name: "Tour".into(),
            },
            created_at: Utc::now(),
        })
        .expect("valid record");

        let email = ReceiptEmail::compose(&record, DateStyle::Iso);

        assert!(!email.html_body().contains("<script>"));
        assert!(email.html_body().contains("&lt;script&gt;"));
        assert!(email.html_body().contains("&amp; Co"));
        assert!(email.text_body().contains("Name: <script>alert(1)</script> O'Brien & Co"));
    }
}
