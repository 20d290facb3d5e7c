//! Tests for the fulfilment use-cases.

use std::sync::Arc;

use futures::FutureExt;
use rstest::{fixture, rstest};
use zeroize::Zeroizing;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::credentials::StaticCredentials;
use crate::domain::dispatch_gate::DispatchState;
use crate::domain::ports::{
    CredentialRefreshError, CredentialStrategy, FixturePaymentRecordStore, MailRelay,
    MockCredentialStrategy, MockMailRelay, MockPaymentRecordStore, PaymentRecordStoreError,
    VecDocumentSink,
};
use crate::domain::receipt::DateStyle;
use crate::test_support::{GatedMailRelay, sample_record};

fn order(raw: &str) -> OrderId {
    OrderId::new(raw).expect("valid order id")
}

fn static_credentials() -> Arc<dyn CredentialStrategy> {
    Arc::new(StaticCredentials::new(
        "mailer",
        Zeroizing::new("secret".to_owned()),
    ))
}

fn service_with(
    store: Arc<dyn PaymentRecordStore>,
    credentials: Arc<dyn CredentialStrategy>,
    relay: Arc<dyn MailRelay>,
) -> AfterPaymentService {
    let dispatcher = MailDispatcher::new(credentials, relay, DateStyle::UsNumeric);
    AfterPaymentService::new(store, Arc::new(dispatcher), ReceiptDocument::default())
}

#[fixture]
fn store() -> Arc<FixturePaymentRecordStore> {
    Arc::new(FixturePaymentRecordStore::with_records([
        sample_record("ORDER_1"),
        sample_record("ORDER_2"),
    ]))
}

fn unused_relay() -> Arc<MockMailRelay> {
    let mut relay = MockMailRelay::new();
    relay.expect_deliver().never();
    Arc::new(relay)
}

#[rstest]
#[tokio::test]
async fn get_booking_returns_record_for_order(store: Arc<FixturePaymentRecordStore>) {
    let service = service_with(store, static_credentials(), unused_relay());

    let record = service
        .get_booking(&order("ORDER_1"))
        .await
        .expect("record found");

    assert_eq!(record.order_id(), &order("ORDER_1"));
}

#[rstest]
#[tokio::test]
async fn missing_record_is_not_found_everywhere(store: Arc<FixturePaymentRecordStore>) {
    let mut credentials = MockCredentialStrategy::new();
    credentials.expect_relay_auth().never();
    let service = service_with(store, Arc::new(credentials), unused_relay());
    let missing = order("ORDER_404");

    let booking = service.get_booking(&missing).await.expect_err("absent");
    let email = service.email_receipt(&missing).await.expect_err("absent");
    let download = service.prepare_receipt(&missing).await.expect_err("absent");

    for error in [booking, email, download] {
        assert_eq!(error.code(), ErrorCode::NotFound);
        assert_eq!(error.message(), PAYMENT_NOT_FOUND);
    }
    assert_eq!(service.dispatch_gate().state(&missing), DispatchState::Idle);
}

#[tokio::test]
async fn store_failure_is_internal() {
    let mut store = MockPaymentRecordStore::new();
    store
        .expect_find_by_order_id()
        .returning(|_| Err(PaymentRecordStoreError::connection("refused")));
    let service = service_with(Arc::new(store), static_credentials(), unused_relay());

    let error = service
        .get_booking(&order("ORDER_1"))
        .await
        .expect_err("store fails");

    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(error.message(), STORE_FAILURE);
}

/// Store with no records whose lookups only return once two of them overlap.
struct OverlappingEmptyStore {
    barrier: tokio::sync::Barrier,
}

#[async_trait::async_trait]
impl PaymentRecordStore for OverlappingEmptyStore {
    async fn find_by_order_id(
        &self,
        _order_id: &OrderId,
    ) -> Result<Option<PaymentRecord>, PaymentRecordStoreError> {
        self.barrier.wait().await;
        Ok(None)
    }
}

#[tokio::test]
async fn concurrent_email_for_missing_order_is_not_found_for_both() {
    let store = Arc::new(OverlappingEmptyStore {
        barrier: tokio::sync::Barrier::new(2),
    });
    let service = service_with(store, static_credentials(), unused_relay());
    let missing = order("MISSING");

    let (first, second) = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        async { tokio::join!(service.email_receipt(&missing), service.email_receipt(&missing)) },
    )
    .await
    .expect("both lookups overlap");

    for error in [first.expect_err("absent"), second.expect_err("absent")] {
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
    assert_eq!(service.dispatch_gate().state(&missing), DispatchState::Idle);
}

#[rstest]
#[tokio::test]
async fn email_receipt_sends_once(store: Arc<FixturePaymentRecordStore>) {
    let mut relay = MockMailRelay::new();
    relay.expect_deliver().times(1).returning(|_, _| Ok(()));
    let service = service_with(store, static_credentials(), Arc::new(relay));

    service
        .email_receipt(&order("ORDER_1"))
        .await
        .expect("email sent");

    assert_eq!(
        service.dispatch_gate().state(&order("ORDER_1")),
        DispatchState::Idle
    );
}

#[rstest]
#[tokio::test]
async fn concurrent_email_for_same_order_is_rejected(store: Arc<FixturePaymentRecordStore>) {
    let relay = GatedMailRelay::new();
    let service = service_with(store, static_credentials(), relay.clone());
    let order_id = order("ORDER_1");

    let (first, second) = tokio::join!(service.email_receipt(&order_id), async {
        tokio::task::yield_now().await;
        let outcome = service.email_receipt(&order_id).await;
        relay.release();
        outcome
    });

    first.expect("first dispatch succeeds");
    let conflict = second.expect_err("second dispatch rejected");
    assert_eq!(conflict.code(), ErrorCode::Conflict);
    assert_eq!(relay.deliveries(), 1);
}

#[rstest]
#[tokio::test]
async fn emails_for_different_orders_both_send(store: Arc<FixturePaymentRecordStore>) {
    let relay = GatedMailRelay::new();
    let service = service_with(store, static_credentials(), relay.clone());

    let (first_order, second_order) = (order("ORDER_1"), order("ORDER_2"));

    let (first, second, ()) = tokio::join!(
        service.email_receipt(&first_order),
        service.email_receipt(&second_order),
        async {
            tokio::task::yield_now().await;
            relay.release();
        }
    );

    first.expect("first order sent");
    second.expect("second order sent");
    assert_eq!(relay.deliveries(), 2);
}

#[rstest]
#[tokio::test]
async fn refresh_failure_is_upstream_and_frees_order(store: Arc<FixturePaymentRecordStore>) {
    let mut credentials = MockCredentialStrategy::new();
    credentials
        .expect_relay_auth()
        .times(1)
        .returning(|| Err(CredentialRefreshError::unavailable("token endpoint down")));
    let service = service_with(store, Arc::new(credentials), unused_relay());

    let error = service
        .email_receipt(&order("ORDER_1"))
        .await
        .expect_err("dispatch fails");

    assert_eq!(error.code(), ErrorCode::UpstreamFailure);
    assert_eq!(error.message(), EMAIL_FAILURE);
    assert!(
        error
            .details()
            .is_some_and(|details| details.contains("token endpoint down"))
    );
    assert_eq!(
        service.dispatch_gate().state(&order("ORDER_1")),
        DispatchState::Idle
    );
}

#[rstest]
#[tokio::test]
async fn abandoned_request_does_not_abort_dispatch(store: Arc<FixturePaymentRecordStore>) {
    let relay = GatedMailRelay::new();
    let service = service_with(store, static_credentials(), relay.clone());
    let order_id = order("ORDER_1");

    assert!(service.email_receipt(&order_id).now_or_never().is_none());
    assert_eq!(
        service.dispatch_gate().state(&order_id),
        DispatchState::Sending
    );

    relay.release();
    for _ in 0..16 {
        if service.dispatch_gate().state(&order_id) == DispatchState::Idle {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(relay.deliveries(), 1);
    assert_eq!(
        service.dispatch_gate().state(&order_id),
        DispatchState::Idle
    );
}

#[rstest]
#[tokio::test]
async fn prepared_receipt_renders_record(store: Arc<FixturePaymentRecordStore>) {
    let service = service_with(store, static_credentials(), unused_relay());

    let prepared = service
        .prepare_receipt(&order("ORDER_1"))
        .await
        .expect("record found");
    let mut sink = VecDocumentSink::default();
    prepared.render(&mut sink).await.expect("render succeeds");

    assert_eq!(prepared.filename(), "receipt_ORDER_1.pdf");
    let text = String::from_utf8_lossy(&sink.into_bytes()).into_owned();
    for expected in ["ORDER_1", "150", "USD", "Kandy Tour", "a@b.com"] {
        assert!(text.contains(expected), "missing {expected}");
    }
}
