//! Main application state and service coordination
//!
//! This module contains the AppState that owns the waiting board, its
//! background refresh and the subscribers the service itself registers.

use crate::catalog::CatalogEntry;
use crate::config::AppConfig;
use crate::display::DisplayFormatter;
use crate::metrics::{MetricsCollector, RefreshOutcomeLabel};
use crate::source::{InMemoryWaitingSource, WaitingSource};
use crate::store::{PollingHandle, Snapshot, Subscription, WaitingBoard};
use crate::types::{ConsultationRoom, Examination, RecordKind, WaitingStatus};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Examination and consultation-room stores
    board: WaitingBoard,

    /// Renders snapshots for the board log
    formatter: DisplayFormatter,

    /// Background refresh task
    polling: Option<PollingHandle>,

    /// Subscriptions held by the service itself
    exam_subscription: Option<Subscription<Examination>>,
    room_subscription: Option<Subscription<ConsultationRoom>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with the in-memory seeded source
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        Self::with_source(config, Arc::new(InMemoryWaitingSource::seeded()))
    }

    /// Initialize the application against any waiting source
    pub fn with_source(
        config: AppConfig,
        source: Arc<dyn WaitingSource>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing {} waiting-time board", config.service.name);
        info!(
            "Configuration: refresh_interval={}s, source_timeout={}s, utc_offset={}h",
            config.refresh.interval_seconds,
            config.refresh.source_timeout_seconds,
            config.display.utc_offset_hours
        );

        let formatter = DisplayFormatter::new(config.display.utc_offset_hours).map_err(|e| {
            ServiceError::Configuration {
                message: e.to_string(),
            }
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let board = WaitingBoard::seeded(source, metrics_collector, config.source_timeout())
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to seed waiting board: {}", e),
            })?;

        Ok(Self {
            config,
            board,
            formatter,
            polling: None,
            exam_subscription: None,
            room_subscription: None,
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Subscribe the board log and start background refresh
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {} service", self.config.service.name);

        *self.is_running.write().await = true;

        let formatter = self.formatter;
        self.exam_subscription = Some(
            self.board
                .examinations()
                .subscribe(move |snapshot| log_snapshot(&formatter, snapshot))
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to subscribe to examinations: {}", e),
                })?,
        );
        self.room_subscription = Some(
            self.board
                .rooms()
                .subscribe(move |snapshot| log_snapshot(&formatter, snapshot))
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to subscribe to rooms: {}", e),
                })?,
        );

        self.polling = Some(self.board.start_polling(self.config.refresh_interval()));

        info!("✅ {} service started successfully", self.config.service.name);
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of {}", self.config.service.name);

        *self.is_running.write().await = false;

        if let Some(polling) = self.polling.take() {
            let timeout = self.config.shutdown_timeout();
            if tokio::time::timeout(timeout, polling.stop()).await.is_err() {
                return Err(ServiceError::BackgroundTask {
                    message: format!("Background refresh did not stop within {:?}", timeout),
                });
            }
            info!("✅ Background refresh stopped");
        }

        self.exam_subscription.take();
        self.room_subscription.take();

        let metrics = self.board.metrics();
        for kind in RecordKind::ALL {
            info!(
                "Final {} statistics: {} refreshed, {} skipped, {} failed",
                kind,
                metrics.refresh_count(kind, RefreshOutcomeLabel::Refreshed),
                metrics.refresh_count(kind, RefreshOutcomeLabel::Skipped),
                metrics.refresh_count(kind, RefreshOutcomeLabel::Failed)
            );
        }
        info!("✅ {} shutdown completed", self.config.service.name);

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn board(&self) -> &WaitingBoard {
        &self.board
    }

    pub fn formatter(&self) -> &DisplayFormatter {
        &self.formatter
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.board.metrics()
    }
}

fn log_snapshot<S: CatalogEntry>(formatter: &DisplayFormatter, snapshot: &Snapshot<S>) {
    let count = |status| {
        snapshot
            .views
            .iter()
            .filter(|v| v.status() == status)
            .count()
    };
    info!(
        "{} board updated at {}: {} entries ({} crowded, {} closed)",
        snapshot.kind,
        formatter.refreshed_label(snapshot.last_refreshed_at),
        snapshot.len(),
        count(WaitingStatus::Crowded),
        count(WaitingStatus::Closed)
    );
    if !snapshot.integrity_errors.is_empty() {
        warn!(
            "{} board is hiding {} record(s) with unknown subjects",
            snapshot.kind,
            snapshot.integrity_errors.len()
        );
    }

    for row in formatter.render_all(&snapshot.views) {
        debug!(
            "  {} | {} waiting | {} min | {}",
            row.title, row.waiting_count, row.estimated_minutes, row.status_label
        );
    }
}
