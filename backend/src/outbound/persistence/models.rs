//! Diesel row structs for the payments table.
//!
//! Internal to the persistence layer; the store converts rows into validated
//! domain records before they leave this module.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::payments;

/// Row struct for reading from the payments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentRow {
    pub order_id: String,
    pub payment_type: String,
    pub currency: String,
    pub amount_minor: i64,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub trip_name: String,
    pub created_at: DateTime<Utc>,
}
