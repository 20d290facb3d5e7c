//! Driving port for reading a booking's payment record.
//!
//! Inbound adapters call this to serve `getBooking` without knowing which
//! store backs the record.

use async_trait::async_trait;

use crate::domain::{Error, OrderId, PaymentRecord};

/// Domain use-case port for fetching a booking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingQuery: Send + Sync {
    /// Fetch the payment record for `order_id`.
    ///
    /// Returns a `not_found` error when no record exists.
    async fn get_booking(&self, order_id: &OrderId) -> Result<PaymentRecord, Error>;
}
