//! Diesel table definitions for the payment records this service reads.
//!
//! The table is owned and migrated by the payment-capture flow. These
//! definitions must match its schema; `diesel print-schema` against a live
//! database regenerates them.

diesel::table! {
    /// Completed payments, one row per order.
    ///
    /// Rows are written once when a payment is captured and never updated.
    payments (order_id) {
        /// Primary key: caller-visible order identifier.
        order_id -> Varchar,
        /// Payment method tag (`card`, `bank_transfer`, ...).
        payment_type -> Varchar,
        /// ISO 4217 currency code.
        currency -> Varchar,
        /// Amount in minor units (cents).
        amount_minor -> Int8,
        customer_first_name -> Varchar,
        customer_last_name -> Varchar,
        customer_email -> Varchar,
        customer_phone -> Varchar,
        /// Name of the booked trip.
        trip_name -> Varchar,
        /// Capture timestamp.
        created_at -> Timestamptz,
    }
}
