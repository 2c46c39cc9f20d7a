//! Waiting source interface and the in-memory implementation

use crate::error::{Result, WaitingTimeError};
use crate::seed;
use crate::types::{RecordKind, SubjectId, WaitingRecord};
use crate::utils::{current_timestamp, default_record_id};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Trait for pulling authoritative waiting records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WaitingSource: Send + Sync {
    /// Fetch the complete record set for `kind`.
    ///
    /// `subject_ids` lists the catalog entries in registration order so the
    /// source can cover subjects it has not reported on yet.
    async fn fetch(&self, kind: RecordKind, subject_ids: &[SubjectId])
        -> Result<Vec<WaitingRecord>>;
}

/// Source backed by an in-process table of rows
#[derive(Debug)]
pub struct InMemoryWaitingSource {
    rows: RwLock<HashMap<RecordKind, Vec<WaitingRecord>>>,
    available: AtomicBool,
    latency: RwLock<Duration>,
    fetch_count: AtomicU64,
}

impl InMemoryWaitingSource {
    /// Create an empty source; every subject gets a default row
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            latency: RwLock::new(Duration::ZERO),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Create a source holding the seed dataset for both kinds
    pub fn seeded() -> Self {
        let source = Self::new();
        source.set_records(RecordKind::Examination, seed::examination_records());
        source.set_records(RecordKind::Room, seed::room_records());
        source
    }

    /// Replace all rows of a kind
    pub fn set_records(&self, kind: RecordKind, records: Vec<WaitingRecord>) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(kind, records);
        }
    }

    /// Insert or replace the row with the same record id
    pub fn upsert(&self, kind: RecordKind, record: WaitingRecord) {
        if let Ok(mut rows) = self.rows.write() {
            let kind_rows = rows.entry(kind).or_default();
            match kind_rows.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => kind_rows.push(record),
            }
        }
    }

    /// Simulate the backend going down or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every fetch by `latency`
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut current) = self.latency.write() {
            *current = latency;
        }
    }

    /// Number of fetches attempted so far (for testing)
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    fn current_latency(&self) -> Duration {
        self.latency.read().map(|l| *l).unwrap_or_default()
    }
}

impl Default for InMemoryWaitingSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WaitingSource for InMemoryWaitingSource {
    async fn fetch(
        &self,
        kind: RecordKind,
        subject_ids: &[SubjectId],
    ) -> Result<Vec<WaitingRecord>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        let latency = self.current_latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(WaitingTimeError::SourceUnavailable {
                kind,
                message: "in-memory source is marked unavailable".to_string(),
            }
            .into());
        }

        let rows = self
            .rows
            .read()
            .map_err(|_| WaitingTimeError::lock_poisoned("source rows"))?;
        let stored = rows.get(&kind).map(Vec::as_slice).unwrap_or_default();

        let mut by_subject: HashMap<&str, Vec<&WaitingRecord>> = HashMap::new();
        for row in stored {
            by_subject.entry(row.subject_id.as_str()).or_default().push(row);
        }

        let now = current_timestamp();
        let mut records = Vec::with_capacity(subject_ids.len().max(stored.len()));
        for subject_id in subject_ids {
            match by_subject.get(subject_id.as_str()) {
                Some(known) => records.extend(known.iter().map(|r| (*r).clone())),
                None => records.push(WaitingRecord::placeholder(
                    default_record_id(kind, subject_id),
                    subject_id.clone(),
                    now,
                )),
            }
        }

        // Rows for subjects the catalog does not list are still authoritative
        let requested: HashSet<&str> = subject_ids.iter().map(String::as_str).collect();
        records.extend(
            stored
                .iter()
                .filter(|r| !requested.contains(r.subject_id.as_str()))
                .cloned(),
        );

        debug!(
            "In-memory source returned {} {} records for {} subjects",
            records.len(),
            kind,
            subject_ids.len()
        );

        Ok(records)
    }
}
