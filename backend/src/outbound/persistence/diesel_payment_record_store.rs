//! PostgreSQL-backed `PaymentRecordStore` implementation using Diesel ORM.
//!
//! Reads are bounded by a query timeout so a stalled database surfaces as a
//! store failure instead of hanging the request.

use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};

use crate::domain::ports::{PaymentRecordStore, PaymentRecordStoreError};
use crate::domain::{Amount, CustomerDraft, OrderId, PaymentRecord, PaymentRecordDraft};

use super::models::PaymentRow;
use super::pool::{DbPool, PoolError};
use super::schema::payments;

/// Diesel-backed implementation of the `PaymentRecordStore` port.
#[derive(Clone)]
pub struct DieselPaymentRecordStore {
    pool: DbPool,
    query_timeout: Duration,
}

impl DieselPaymentRecordStore {
    /// Create a store over `pool`, abandoning lookups after `query_timeout`.
    pub fn new(pool: DbPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn lookup(&self, order_id: &OrderId) -> Result<Option<PaymentRow>, PaymentRecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        payments::table
            .filter(payments::order_id.eq(order_id.as_str()))
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)
    }
}

/// Map pool errors to domain store errors.
fn map_pool_error(error: PoolError) -> PaymentRecordStoreError {
    match error {
        PoolError::Timeout { timeout } => {
            PaymentRecordStoreError::timeout(format!("no connection within {timeout:?}"))
        }
        PoolError::Checkout { message } | PoolError::Build { message } => {
            PaymentRecordStoreError::connection(message)
        }
    }
}

/// Map Diesel errors to domain store errors.
fn map_diesel_error(error: diesel::result::Error) -> PaymentRecordStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::QueryBuilderError(_) => PaymentRecordStoreError::query("database query error"),
        DieselError::DeserializationError(_) => {
            PaymentRecordStoreError::invalid_record("column could not be decoded")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            PaymentRecordStoreError::connection("database connection error")
        }
        _ => PaymentRecordStoreError::query("database error"),
    }
}

/// Convert a database row into a validated domain record.
fn row_to_record(row: PaymentRow) -> Result<PaymentRecord, PaymentRecordStoreError> {
    let order_id = row.order_id.clone();
    let amount = Amount::from_minor_units(row.amount_minor)
        .map_err(|err| PaymentRecordStoreError::invalid_record(err.to_string()))?;

    PaymentRecord::try_from_draft(PaymentRecordDraft {
        order_id: row.order_id,
        payment_type: row.payment_type,
        currency: row.currency,
        amount: amount.to_string(),
        customer: CustomerDraft {
            first_name: row.customer_first_name,
            last_name: row.customer_last_name,
            email: row.customer_email,
            phone: row.customer_phone,
            trip_name: row.trip_name,
        },
        created_at: row.created_at,
    })
    .map_err(|err| {
        warn!(%order_id, error = %err, "stored payment row failed validation");
        PaymentRecordStoreError::invalid_record(err.to_string())
    })
}

#[async_trait]
impl PaymentRecordStore for DieselPaymentRecordStore {
    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>, PaymentRecordStoreError> {
        let row = tokio::time::timeout(self.query_timeout, self.lookup(order_id))
            .await
            .map_err(|_| {
                PaymentRecordStoreError::timeout(format!(
                    "lookup exceeded {:?}",
                    self.query_timeout
                ))
            })??;

        row.map(row_to_record).transpose()
    }
}
