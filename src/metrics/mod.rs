//! Metrics for the waiting-time board
//!
//! Prometheus counters and gauges recorded by the record stores.

pub mod collector;

pub use collector::{MetricsCollector, MetricsTimer, RefreshOutcomeLabel, UpdateOutcomeLabel};
