//! Utility functions for the waiting-time board

use crate::types::{RecordKind, Timestamp};
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Get the current UTC timestamp
pub fn current_timestamp() -> Timestamp {
    Utc::now()
}

/// Current time, nudged forward so it is strictly after `previous`.
///
/// Two mutations inside the same clock tick still get ordered timestamps.
pub fn next_timestamp(previous: Option<Timestamp>) -> Timestamp {
    let now = current_timestamp();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Record id the store assigns to the default record of a new subject
pub fn default_record_id(kind: RecordKind, subject_id: &str) -> String {
    format!("{}-{}", kind.record_prefix(), subject_id)
}

/// Generate a new unique subscription id
pub fn generate_subscription_id() -> Uuid {
    Uuid::new_v4()
}
