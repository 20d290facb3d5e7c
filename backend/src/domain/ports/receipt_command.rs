//! Driving port for receipt fulfilment actions.

use async_trait::async_trait;

use crate::domain::receipt_document::PreparedReceipt;
use crate::domain::{Error, OrderId};

/// Domain use-case port for emailing and downloading receipts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReceiptCommand: Send + Sync {
    /// Email the receipt for `order_id` to the customer on record.
    ///
    /// At most one dispatch per order runs at a time; a concurrent call for
    /// the same order fails with a `conflict` error.
    async fn email_receipt(&self, order_id: &OrderId) -> Result<(), Error>;

    /// Look up the record and return a renderer for its receipt document.
    ///
    /// Store failures and missing records are reported here, before any
    /// document bytes exist.
    async fn prepare_receipt(&self, order_id: &OrderId) -> Result<PreparedReceipt, Error>;
}
