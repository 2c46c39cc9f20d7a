//! Shared waiting-record stores
//!
//! Each record kind gets its own [`WaitingStore`]; the [`WaitingBoard`] holds
//! both and drives periodic refresh.

pub mod board;
pub mod join;
pub mod scheduler;
pub mod subscription;
pub mod waiting_store;

// Re-export commonly used types
pub use board::WaitingBoard;
pub use join::{join_records, Snapshot};
pub use scheduler::{spawn_polling, PollingHandle, DEFAULT_REFRESH_INTERVAL};
pub use subscription::{SnapshotCallback, Subscription};
pub use waiting_store::{RefreshOutcome, WaitingStore, DEFAULT_SOURCE_TIMEOUT};
