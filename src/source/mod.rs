//! Backing sources for waiting-time refreshes
//!
//! A source returns the full authoritative record set for one kind. The
//! in-memory implementation stands in for the hospital's queueing backend.

pub mod provider;

// Re-export commonly used types
pub use provider::{InMemoryWaitingSource, WaitingSource};

#[cfg(test)]
pub use provider::MockWaitingSource;
