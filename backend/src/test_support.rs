//! Test utilities for the after-payments crate.
//!
//! Shared by unit tests in `src/` and by integration tests in `tests/`, which
//! enable the `test-support` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use tokio::sync::Semaphore;

use crate::domain::credentials::RelayAuth;
use crate::domain::ports::{MailRelay, MailRelayError};
use crate::domain::receipt_email::ReceiptEmail;
use crate::domain::{CustomerDraft, PaymentRecord, PaymentRecordDraft};

/// Clock whose time only moves when a test advances it.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Fixed instant used as "now" across tests.
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 18, 19, 0, 0)
        .single()
        .expect("fixed fixture timestamp")
}

/// Payment record for `order_id` with the Kandy Tour customer details.
pub fn sample_record(order_id: &str) -> PaymentRecord {
    PaymentRecord::try_from_draft(PaymentRecordDraft {
        order_id: order_id.to_owned(),
        payment_type: "card".to_owned(),
        currency: "USD".to_owned(),
        amount: "150.00".to_owned(),
        customer: CustomerDraft {
            first_name: "A".to_owned(),
            last_name: "B".to_owned(),
            email: "a@b.com".to_owned(),
            phone: "555".to_owned(),
            trip_name: "Kandy Tour".to_owned(),
        },
        created_at: Utc
            .with_ymd_and_hms(2025, 8, 18, 19, 2, 55)
            .single()
            .expect("fixed fixture timestamp"),
    })
    .expect("sample record is valid")
}

/// Mail relay that records every accepted message.
///
/// Built with [`RecordingMailRelay::failing`] it refuses every message with
/// the given error instead.
#[derive(Debug, Default)]
pub struct RecordingMailRelay {
    sent: Mutex<Vec<ReceiptEmail>>,
    failure: Option<MailRelayError>,
}

impl RecordingMailRelay {
    pub fn failing(error: MailRelayError) -> Self {
        Self {
            sent: Mutex::default(),
            failure: Some(error),
        }
    }

    /// Messages accepted so far, in submission order.
    pub fn sent(&self) -> Vec<ReceiptEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MailRelay for RecordingMailRelay {
    async fn deliver(&self, email: &ReceiptEmail, _auth: &RelayAuth) -> Result<(), MailRelayError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email.clone());
        Ok(())
    }
}

/// Relay that holds every delivery until released.
pub struct GatedMailRelay {
    deliveries: AtomicUsize,
    gate: Semaphore,
}

impl GatedMailRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            deliveries: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        })
    }

    /// Let waiting and future deliveries through.
    pub fn release(&self) {
        self.gate.add_permits(1024);
    }

    /// Deliveries started so far, released or not.
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailRelay for GatedMailRelay {
    async fn deliver(&self, _email: &ReceiptEmail, _auth: &RelayAuth) -> Result<(), MailRelayError> {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|err| MailRelayError::transport(err.to_string()))?;
        Ok(())
    }
}
