//! Waitboard - shared waiting-time store for hospital boards
//!
//! This crate keeps the waiting counts, estimated waits and status of
//! examinations and consultation rooms in one in-memory store per kind,
//! refreshes them from a waiting source, applies staff edits and notifies
//! subscribers synchronously after every change.

pub mod catalog;
pub mod config;
pub mod display;
pub mod error;
pub mod metrics;
pub mod query;
pub mod seed;
pub mod service;
pub mod source;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{classify, IntegrityError, Result, WaitingTimeError};
pub use types::*;

// Re-export key components
pub use catalog::{Catalog, CatalogEntry, SubjectResolver};
pub use query::{filter_views, StatusFilter, WaitingFilter};
pub use source::{InMemoryWaitingSource, WaitingSource};
pub use store::{RefreshOutcome, Snapshot, Subscription, WaitingBoard, WaitingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
