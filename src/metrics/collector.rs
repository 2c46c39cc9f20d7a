//! Metrics collection using Prometheus
//!
//! Both record stores report into one collector; every series is labelled
//! with the record kind.

use crate::types::RecordKind;
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome label for refresh attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcomeLabel {
    Refreshed,
    Skipped,
    Failed,
}

impl RefreshOutcomeLabel {
    fn as_str(&self) -> &'static str {
        match self {
            RefreshOutcomeLabel::Refreshed => "refreshed",
            RefreshOutcomeLabel::Skipped => "skipped",
            RefreshOutcomeLabel::Failed => "failed",
        }
    }
}

/// Outcome label for staff updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcomeLabel {
    Applied,
    Rejected,
    NotFound,
}

impl UpdateOutcomeLabel {
    fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcomeLabel::Applied => "applied",
            UpdateOutcomeLabel::Rejected => "rejected",
            UpdateOutcomeLabel::NotFound => "not_found",
        }
    }
}

/// Main metrics collector for the waiting-time board
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Refresh attempts by outcome
    refreshes_total: IntCounterVec,

    /// Time spent pulling from the source
    refresh_duration_seconds: HistogramVec,

    /// Staff updates by outcome
    updates_total: IntCounterVec,

    /// Records dropped from joined views because their subject is missing
    integrity_errors_total: IntCounterVec,

    /// Records currently held
    records: IntGaugeVec,

    /// Active snapshot subscribers
    subscribers: IntGaugeVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let refreshes_total = IntCounterVec::new(
            Opts::new("waitboard_refreshes_total", "Refresh attempts by outcome"),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(refreshes_total.clone()))?;

        let refresh_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "waitboard_refresh_duration_seconds",
                "Time spent fetching from the waiting source",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["kind"],
        )?;
        registry.register(Box::new(refresh_duration_seconds.clone()))?;

        let updates_total = IntCounterVec::new(
            Opts::new("waitboard_updates_total", "Staff updates by outcome"),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(updates_total.clone()))?;

        let integrity_errors_total = IntCounterVec::new(
            Opts::new(
                "waitboard_integrity_errors_total",
                "Records excluded because their subject is missing from the catalog",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(integrity_errors_total.clone()))?;

        let records = IntGaugeVec::new(
            Opts::new("waitboard_records", "Waiting records currently held"),
            &["kind"],
        )?;
        registry.register(Box::new(records.clone()))?;

        let subscribers = IntGaugeVec::new(
            Opts::new("waitboard_subscribers", "Active snapshot subscribers"),
            &["kind"],
        )?;
        registry.register(Box::new(subscribers.clone()))?;

        Ok(Self {
            registry,
            refreshes_total,
            refresh_duration_seconds,
            updates_total,
            integrity_errors_total,
            records,
            subscribers,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn record_refresh(&self, kind: RecordKind, outcome: RefreshOutcomeLabel) {
        self.refreshes_total
            .with_label_values(&[kind.as_str(), outcome.as_str()])
            .inc();
    }

    pub fn record_refresh_duration(&self, kind: RecordKind, duration: Duration) {
        self.refresh_duration_seconds
            .with_label_values(&[kind.as_str()])
            .observe(duration.as_secs_f64());
    }

    pub fn record_update(&self, kind: RecordKind, outcome: UpdateOutcomeLabel) {
        self.updates_total
            .with_label_values(&[kind.as_str(), outcome.as_str()])
            .inc();
    }

    pub fn record_integrity_errors(&self, kind: RecordKind, count: usize) {
        if count > 0 {
            self.integrity_errors_total
                .with_label_values(&[kind.as_str()])
                .inc_by(count as u64);
        }
    }

    pub fn set_record_count(&self, kind: RecordKind, count: usize) {
        self.records
            .with_label_values(&[kind.as_str()])
            .set(count as i64);
    }

    pub fn set_subscriber_count(&self, kind: RecordKind, count: usize) {
        self.subscribers
            .with_label_values(&[kind.as_str()])
            .set(count as i64);
    }

    /// Current value of a refresh counter (for testing and health output)
    pub fn refresh_count(&self, kind: RecordKind, outcome: RefreshOutcomeLabel) -> u64 {
        self.refreshes_total
            .with_label_values(&[kind.as_str(), outcome.as_str()])
            .get()
    }

    /// Current value of an update counter
    pub fn update_count(&self, kind: RecordKind, outcome: UpdateOutcomeLabel) -> u64 {
        self.updates_total
            .with_label_values(&[kind.as_str(), outcome.as_str()])
            .get()
    }

    pub fn integrity_error_count(&self, kind: RecordKind) -> u64 {
        self.integrity_errors_total
            .with_label_values(&[kind.as_str()])
            .get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Start a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer utility for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time without stopping the timer
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return elapsed duration
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}
