//! Health checks and monitoring
//!
//! A kind is healthy while its data is fresher than the configured stale
//! threshold, degraded once it is older, and unhealthy if it never loaded.

use crate::metrics::RefreshOutcomeLabel;
use crate::service::app::AppState;
use crate::types::{RecordKind, Timestamp};
use crate::utils::current_timestamp;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Per-component checks
    pub checks: Vec<ComponentCheck>,
    /// Board statistics
    pub stats: BoardStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional detail when not healthy
    pub message: Option<String>,
}

/// Board statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardStats {
    pub examinations: usize,
    pub rooms: usize,
    pub failed_refreshes: u64,
    pub integrity_errors: u64,
}

impl HealthCheck {
    /// Check the running state and the freshness of both record kinds
    pub async fn check(app_state: &AppState) -> Result<Self> {
        let now = current_timestamp();
        let stale_after = app_state.config().stale_after();
        let mut checks = Vec::new();

        checks.push(if app_state.is_running().await {
            ComponentCheck {
                name: "service".to_string(),
                status: HealthStatus::Healthy,
                message: None,
            }
        } else {
            ComponentCheck {
                name: "service".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some("Service is not running".to_string()),
            }
        });

        for kind in RecordKind::ALL {
            let last = app_state.board().last_refreshed_at(kind)?;
            checks.push(freshness_check(kind, last, now, stale_after));
        }

        let status = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        let stats = gather_stats(app_state)?;
        debug!("Health check: {} ({:?})", status, stats);

        Ok(HealthCheck {
            status,
            service: app_state.config().service.name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: now,
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: &AppState) -> HealthStatus {
        if app_state.is_running().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

/// Grade one kind by the age of its last successful refresh or update
pub fn freshness_check(
    kind: RecordKind,
    last_refreshed_at: Option<Timestamp>,
    now: Timestamp,
    stale_after: Duration,
) -> ComponentCheck {
    let name = format!("{}_data", kind);
    let Some(last) = last_refreshed_at else {
        return ComponentCheck {
            name,
            status: HealthStatus::Unhealthy,
            message: Some(format!("{} data has never been loaded", kind)),
        };
    };

    let age = (now - last).to_std().unwrap_or(Duration::ZERO);
    if age > stale_after {
        ComponentCheck {
            name,
            status: HealthStatus::Degraded,
            message: Some(format!(
                "{} data is {}s old (stale after {}s)",
                kind,
                age.as_secs(),
                stale_after.as_secs()
            )),
        }
    } else {
        ComponentCheck {
            name,
            status: HealthStatus::Healthy,
            message: None,
        }
    }
}

fn gather_stats(app_state: &AppState) -> Result<BoardStats> {
    let board = app_state.board();
    let metrics = board.metrics();

    Ok(BoardStats {
        examinations: board.examinations().records()?.len(),
        rooms: board.rooms().records()?.len(),
        failed_refreshes: RecordKind::ALL
            .iter()
            .map(|kind| metrics.refresh_count(*kind, RefreshOutcomeLabel::Failed))
            .sum(),
        integrity_errors: RecordKind::ALL
            .iter()
            .map(|kind| metrics.integrity_error_count(*kind))
            .sum(),
    })
}
