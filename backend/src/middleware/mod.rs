//! Request middleware shared by every route.
//!
//! Only request correlation lives here; session cookies are handled by
//! `actix-session` on the `/api` scope.

pub mod trace;

pub use trace::Trace;
