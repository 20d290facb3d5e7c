//! Driven port for reading payment records.
//!
//! Records are created by the payment-capture flow, which owns the schema.
//! This service only ever reads them, so the port exposes a single lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::{OrderId, PaymentRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment record store adapters.
    pub enum PaymentRecordStoreError {
        /// The store could not be reached.
        Connection { message: String } =>
            "payment record store connection failed: {message}",
        /// The lookup query failed.
        Query { message: String } =>
            "payment record store query failed: {message}",
        /// The lookup did not complete in time.
        Timeout { message: String } =>
            "payment record store timed out: {message}",
        /// A stored row could not be mapped to a valid record.
        InvalidRecord { message: String } =>
            "stored payment record is invalid: {message}",
    }
}

/// Read-only access to persisted payment records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRecordStore: Send + Sync {
    /// Look up the record for an order.
    ///
    /// Returns `Ok(None)` when no record exists; errors are reserved for
    /// store failures.
    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>, PaymentRecordStoreError>;
}

/// In-memory store used for development without a database and in tests.
///
/// # Examples
/// ```
/// use after_payments::domain::ports::{FixturePaymentRecordStore, PaymentRecordStore};
/// use after_payments::domain::OrderId;
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let store = FixturePaymentRecordStore::default();
/// let order_id = OrderId::new("ORDER_404").expect("valid id");
/// assert!(store.find_by_order_id(&order_id).await.expect("lookup").is_none());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixturePaymentRecordStore {
    records: Arc<RwLock<HashMap<OrderId, PaymentRecord>>>,
}

impl FixturePaymentRecordStore {
    /// Build a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = PaymentRecord>) -> Self {
        let store = Self::default();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Add or replace a record.
    pub fn insert(&self, record: PaymentRecord) {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(record.order_id().clone(), record);
    }
}

#[async_trait]
impl PaymentRecordStore for FixturePaymentRecordStore {
    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>, PaymentRecordStoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| PaymentRecordStoreError::query("fixture store lock poisoned"))?;
        Ok(guard.get(order_id).cloned())
    }
}
