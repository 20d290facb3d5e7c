//! Domain primitives, services and ports.
//!
//! Purpose: model the after-payment fulfilment rules (record lookup,
//! receipt composition and rendering, single-flight credentials, at most one
//! dispatch per order, CSRF-guarded session teardown) without depending on
//! HTTP, SMTP or SQL. Adapters in `inbound` and `outbound` plug into the
//! traits in [`ports`].
//!
//! Public surface:
//! - Error: transport-agnostic failure payload.
//! - PaymentRecord and its field newtypes: the read-only order record.
//! - AfterPaymentService: the use-cases behind the HTTP API.
//! - CsrfGuard: the server half of session teardown.

pub mod after_payment_service;
pub mod credentials;
pub mod dispatch_gate;
pub mod error;
pub mod mail_dispatcher;
pub mod payment;
pub mod ports;
pub mod receipt;
pub mod receipt_document;
pub mod receipt_email;
pub mod session_guard;
pub mod trace_id;

pub use self::after_payment_service::AfterPaymentService;
pub use self::error::{Error, ErrorCode, TRACE_ID_HEADER};
pub use self::payment::{
    Amount, CurrencyCode, Customer, CustomerDraft, EmailAddress, OrderId, PaymentRecord,
    PaymentRecordDraft, PaymentType, PaymentValidationError,
};
pub use self::receipt::DateStyle;
pub use self::session_guard::CsrfGuard;
pub use self::trace_id::TraceId;

/// Convenient result alias for domain use-cases.
pub type ApiResult<T> = Result<T, Error>;
