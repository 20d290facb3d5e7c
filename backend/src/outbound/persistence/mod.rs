//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Provides the read-only payment record store backed by PostgreSQL via
//! `diesel-async` with `bb8` connection pooling.
//!
//! Diesel row structs (`models.rs`) and schema definitions (`schema.rs`) are
//! internal; only validated domain records cross into the domain layer, and
//! every database failure is mapped to a `PaymentRecordStoreError`.
//!
//! # Example
//!
//! ```ignore
//! use after_payments::outbound::persistence::{DbPool, DieselPaymentRecordStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/payments"))?;
//! let store = DieselPaymentRecordStore::new(pool, Duration::from_secs(5));
//! ```

mod diesel_payment_record_store;
mod models;
mod pool;
mod schema;

pub use diesel_payment_record_store::DieselPaymentRecordStore;
pub use pool::{DbPool, PoolConfig, PoolError};
