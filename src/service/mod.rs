//! Service layer for the waitboard binary
//!
//! This module contains the main application state, background refresh
//! management and health reporting.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{freshness_check, BoardStats, ComponentCheck, HealthCheck, HealthStatus};
