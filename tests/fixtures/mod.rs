//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use waitboard::error::{Result, WaitingTimeError};
use waitboard::metrics::MetricsCollector;
use waitboard::source::{InMemoryWaitingSource, WaitingSource};
use waitboard::store::{Snapshot, WaitingBoard};
use waitboard::types::{RecordKind, SubjectId, WaitingRecord};

/// Captures every snapshot a store publishes
#[derive(Debug)]
pub struct SnapshotRecorder<S> {
    snapshots: Arc<Mutex<Vec<Snapshot<S>>>>,
}

impl<S: Clone + Send + Sync + 'static> SnapshotRecorder<S> {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Callback to pass to `subscribe`
    pub fn callback(&self) -> impl Fn(&Snapshot<S>) + Send + Sync + 'static {
        let snapshots = Arc::clone(&self.snapshots);
        move |snapshot: &Snapshot<S>| {
            if let Ok(mut captured) = snapshots.lock() {
                captured.push(snapshot.clone());
            }
        }
    }

    /// Get all captured snapshots (for testing)
    pub fn snapshots(&self) -> Vec<Snapshot<S>> {
        self.snapshots
            .lock()
            .map(|captured| captured.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn last(&self) -> Option<Snapshot<S>> {
        self.snapshots().pop()
    }
}

/// Source that fails a scripted number of times before delegating
pub struct FlakySource {
    inner: InMemoryWaitingSource,
    failures: Mutex<VecDeque<String>>,
    calls: AtomicU64,
}

impl FlakySource {
    pub fn seeded() -> Self {
        Self {
            inner: InMemoryWaitingSource::seeded(),
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Make the next fetch fail with `message`
    pub fn fail_next(&self, message: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(message.to_string());
        }
    }

    pub fn inner(&self) -> &InMemoryWaitingSource {
        &self.inner
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WaitingSource for FlakySource {
    async fn fetch(
        &self,
        kind: RecordKind,
        subject_ids: &[SubjectId],
    ) -> Result<Vec<WaitingRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failure = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        if let Some(message) = failure {
            return Err(WaitingTimeError::SourceUnavailable { kind, message }.into());
        }

        self.inner.fetch(kind, subject_ids).await
    }
}

/// Board seeded with the standard dataset over an in-memory source
pub fn create_test_board() -> (WaitingBoard, Arc<InMemoryWaitingSource>) {
    let source = Arc::new(InMemoryWaitingSource::seeded());
    let board = WaitingBoard::seeded(
        source.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
        Duration::from_secs(1),
    )
    .unwrap();
    (board, source)
}

/// Board seeded with the standard dataset over a scripted flaky source
pub fn create_flaky_board() -> (WaitingBoard, Arc<FlakySource>) {
    let source = Arc::new(FlakySource::seeded());
    let board = WaitingBoard::seeded(
        source.clone(),
        Arc::new(MetricsCollector::new().unwrap()),
        Duration::from_secs(1),
    )
    .unwrap();
    (board, source)
}
