//! After-payment fulfilment use-cases.
//!
//! Implements the [`BookingQuery`] and [`ReceiptCommand`] driving ports over
//! the payment record store, the mail dispatcher and the receipt renderer.
//! Email dispatch runs on its own task holding the order's
//! [`DispatchPermit`], so a caller that disconnects mid-send cannot cut the
//! dispatch short or leave the order marked as sending.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::dispatch_gate::DispatchGate;
use super::mail_dispatcher::MailDispatcher;
use super::ports::{BookingQuery, PaymentRecordStore, ReceiptCommand};
use super::receipt_document::{PreparedReceipt, ReceiptDocument};
use super::{Error, OrderId, PaymentRecord, TraceId};

/// Message returned when no record exists for an order.
pub const PAYMENT_NOT_FOUND: &str = "Payment not found";
/// Message returned when the store fails.
pub const STORE_FAILURE: &str = "Server error";
/// Message returned when the relay or credentials fail.
pub const EMAIL_FAILURE: &str = "Failed to send email";
/// Message returned when a dispatch for the order is already running.
pub const EMAIL_IN_FLIGHT: &str = "Receipt email already being sent";

/// Fulfilment service shared by the HTTP handlers.
///
/// # Examples
/// ```ignore
/// let service = AfterPaymentService::new(store, dispatcher, ReceiptDocument::default());
/// let record = service.get_booking(&order_id).await?;
/// ```
pub struct AfterPaymentService {
    store: Arc<dyn PaymentRecordStore>,
    dispatcher: Arc<MailDispatcher>,
    gate: DispatchGate,
    document: ReceiptDocument,
}

impl AfterPaymentService {
    pub fn new(
        store: Arc<dyn PaymentRecordStore>,
        dispatcher: Arc<MailDispatcher>,
        document: ReceiptDocument,
    ) -> Self {
        Self {
            store,
            dispatcher,
            gate: DispatchGate::new(),
            document,
        }
    }

    /// The gate tracking in-flight dispatches.
    pub fn dispatch_gate(&self) -> &DispatchGate {
        &self.gate
    }

    async fn find_record(&self, order_id: &OrderId) -> Result<PaymentRecord, Error> {
        match self.store.find_by_order_id(order_id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => {
                info!(%order_id, "payment record not found");
                Err(Error::not_found(PAYMENT_NOT_FOUND))
            }
            Err(err) => {
                error!(%order_id, error = %err, "payment record lookup failed");
                Err(Error::internal(STORE_FAILURE))
            }
        }
    }
}

#[async_trait]
impl BookingQuery for AfterPaymentService {
    async fn get_booking(&self, order_id: &OrderId) -> Result<PaymentRecord, Error> {
        self.find_record(order_id).await
    }
}

#[async_trait]
impl ReceiptCommand for AfterPaymentService {
    async fn email_receipt(&self, order_id: &OrderId) -> Result<(), Error> {
        // Absent orders are reported as missing whatever the gate holds.
        let record = self.find_record(order_id).await?;
        let Some(permit) = self.gate.try_acquire(order_id) else {
            return Err(Error::conflict(EMAIL_IN_FLIGHT));
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let dispatch = tokio::spawn(TraceId::propagate(async move {
            let outcome = dispatcher.send_receipt(&record).await;
            permit.settle(outcome.is_ok());
            outcome
        }));

        match dispatch.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(Error::upstream(EMAIL_FAILURE).with_details(err.to_string())),
            Err(join_err) => {
                warn!(%order_id, error = %join_err, "receipt dispatch task aborted");
                Err(Error::internal(EMAIL_FAILURE))
            }
        }
    }

    async fn prepare_receipt(&self, order_id: &OrderId) -> Result<PreparedReceipt, Error> {
        let record = self.find_record(order_id).await?;
        Ok(PreparedReceipt::new(record, self.document))
    }
}

#[cfg(test)]
mod tests;
