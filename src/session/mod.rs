//! Connection session: transport lifecycle, event routing, and the
//! initial-load gate in front of every read.

pub mod connection;
pub mod timeout;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::{ConnectionSession, ServerStatus, SessionSettings};
pub use timeout::{Outcome, run_with_timeout};
