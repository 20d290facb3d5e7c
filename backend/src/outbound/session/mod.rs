//! Session registry outbound adapters.
//!
//! Records live in process memory. A restart ends every session, which only
//! costs clients a fresh CSRF token.

mod in_memory;

pub use in_memory::InMemorySessionRegistry;
