//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::CsrfGuard;
use crate::domain::ports::{BookingQuery, ReceiptCommand};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub bookings: Arc<dyn BookingQuery>,
    pub receipts: Arc<dyn ReceiptCommand>,
    pub csrf: Arc<CsrfGuard>,
}

impl HttpState {
    /// Construct state from the use-case ports and the CSRF guard.
    ///
    /// `AfterPaymentService` implements both ports, so callers usually pass
    /// the same `Arc` twice.
    pub fn new(
        bookings: Arc<dyn BookingQuery>,
        receipts: Arc<dyn ReceiptCommand>,
        csrf: Arc<CsrfGuard>,
    ) -> Self {
        Self {
            bookings,
            receipts,
            csrf,
        }
    }
}
