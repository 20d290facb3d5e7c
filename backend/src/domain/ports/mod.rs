//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod booking_query;
mod credential_strategy;
mod document_sink;
mod mail_relay;
mod payment_record_store;
mod receipt_command;
mod session_registry;
mod token_exchange;

#[cfg(test)]
pub use booking_query::MockBookingQuery;
pub use booking_query::BookingQuery;
#[cfg(test)]
pub use credential_strategy::MockCredentialStrategy;
pub use credential_strategy::{CredentialRefreshError, CredentialStrategy};
#[cfg(test)]
pub use document_sink::MockDocumentSink;
pub use document_sink::{DocumentSink, DocumentSinkError, VecDocumentSink};
#[cfg(test)]
pub use mail_relay::MockMailRelay;
pub use mail_relay::{MailRelay, MailRelayError};
#[cfg(test)]
pub use payment_record_store::MockPaymentRecordStore;
pub use payment_record_store::{
    FixturePaymentRecordStore, PaymentRecordStore, PaymentRecordStoreError,
};
#[cfg(test)]
pub use receipt_command::MockReceiptCommand;
pub use receipt_command::ReceiptCommand;
#[cfg(test)]
pub use session_registry::MockSessionRegistry;
pub use session_registry::{SessionRegistry, SessionRegistryError};
#[cfg(test)]
pub use token_exchange::MockTokenExchange;
pub use token_exchange::{TokenExchange, TokenExchangeError};
