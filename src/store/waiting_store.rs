//! Shared waiting-record store for one record kind
//!
//! The store owns the catalog for its kind and the current record set. Reads
//! are served from an in-memory snapshot; refreshes and staff updates are
//! serialized so every subscriber observes mutations in order.

use crate::catalog::{Catalog, CatalogEntry, SubjectResolver};
use crate::error::{classify, IntegrityError, Result, WaitingTimeError};
use crate::metrics::{MetricsCollector, RefreshOutcomeLabel, UpdateOutcomeLabel};
use crate::source::WaitingSource;
use crate::store::join::{join_records, Snapshot};
use crate::store::subscription::{SubscriberRegistry, Subscription};
use crate::types::{
    JoinedWaitingView, RecordId, RecordKind, Timestamp, WaitingRecord, WaitingUpdate,
};
use crate::utils::{default_record_id, next_timestamp};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How long a refresh waits on the source before giving up
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The record set was replaced
    Refreshed { records: usize, at: Timestamp },
    /// Another refresh of this kind was already in flight
    Skipped,
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed { .. })
    }
}

struct StoreState<S> {
    catalog: Catalog<S>,
    records: Vec<WaitingRecord>,
    last_refreshed_at: Option<Timestamp>,
}

impl<S> StoreState<S> {
    /// Latest timestamp the store has handed out
    fn latest_timestamp(&self) -> Option<Timestamp> {
        self.records
            .iter()
            .map(|r| r.updated_at)
            .chain(self.last_refreshed_at)
            .max()
    }
}

/// Clears the in-flight flag when the refresh ends, including on cancellation
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-memory store of waiting records joined to a catalog of `S`
pub struct WaitingStore<S: CatalogEntry> {
    /// Catalog, records and refresh time
    state: Arc<RwLock<StoreState<S>>>,
    /// Serializes refreshes, updates and catalog edits
    mutation_lock: Arc<Mutex<()>>,
    /// Set while a refresh is talking to the source
    refresh_in_flight: Arc<AtomicBool>,
    subscribers: Arc<SubscriberRegistry<S>>,
    /// Dangling record ids already logged and counted
    reported_dangling: Arc<RwLock<HashSet<RecordId>>>,
    source: Arc<dyn WaitingSource>,
    metrics_collector: Arc<MetricsCollector>,
    source_timeout: Duration,
}

impl<S: CatalogEntry> Clone for WaitingStore<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            mutation_lock: Arc::clone(&self.mutation_lock),
            refresh_in_flight: Arc::clone(&self.refresh_in_flight),
            subscribers: Arc::clone(&self.subscribers),
            reported_dangling: Arc::clone(&self.reported_dangling),
            source: Arc::clone(&self.source),
            metrics_collector: Arc::clone(&self.metrics_collector),
            source_timeout: self.source_timeout,
        }
    }
}

impl<S: CatalogEntry> WaitingStore<S> {
    /// Create a store with one default record per catalog entry
    pub fn new(
        catalog: Catalog<S>,
        source: Arc<dyn WaitingSource>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Self> {
        Self::with_records(catalog, Vec::new(), source, metrics_collector)
    }

    /// Create a store from an initial record set.
    ///
    /// Catalog entries without a record get a default one. Records are
    /// stamped with the construction time.
    pub fn with_records(
        catalog: Catalog<S>,
        records: Vec<WaitingRecord>,
        source: Arc<dyn WaitingSource>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let kind = S::KIND;
        if let Some(id) = first_duplicate_id(&records) {
            return Err(WaitingTimeError::DuplicateEntry {
                kind,
                id: id.to_string(),
            }
            .into());
        }

        let stamp = next_timestamp(None);
        let mut records: Vec<WaitingRecord> = records
            .into_iter()
            .map(|mut r| {
                r.updated_at = stamp;
                r
            })
            .collect();

        let covered: HashSet<String> = records.iter().map(|r| r.subject_id.clone()).collect();
        for entry in catalog.entries() {
            if !covered.contains(entry.id()) {
                records.push(WaitingRecord::placeholder(
                    default_record_id(kind, entry.id()),
                    entry.id().to_string(),
                    stamp,
                ));
            }
        }

        metrics_collector.set_record_count(kind, records.len());
        debug!(
            "Created {} store with {} subjects and {} records",
            kind,
            catalog.len(),
            records.len()
        );

        Ok(Self {
            state: Arc::new(RwLock::new(StoreState {
                catalog,
                records,
                last_refreshed_at: None,
            })),
            mutation_lock: Arc::new(Mutex::new(())),
            refresh_in_flight: Arc::new(AtomicBool::new(false)),
            subscribers: Arc::new(SubscriberRegistry::new(kind, Arc::clone(&metrics_collector))),
            reported_dangling: Arc::new(RwLock::new(HashSet::new())),
            source,
            metrics_collector,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        })
    }

    /// Override how long a refresh waits on the source
    pub fn with_source_timeout(mut self, source_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self
    }

    pub fn kind(&self) -> RecordKind {
        S::KIND
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, StoreState<S>>> {
        self.state
            .read()
            .map_err(|_| WaitingTimeError::lock_poisoned("store state").into())
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, StoreState<S>>> {
        self.state
            .write()
            .map_err(|_| WaitingTimeError::lock_poisoned("store state").into())
    }

    /// Joined views plus diagnostics for records that could not be joined
    pub fn snapshot(&self) -> Result<Snapshot<S>> {
        let kind = S::KIND;
        let snapshot = {
            let state = self.read_state()?;
            let (views, integrity_errors) = join_records(kind, &state.records, &state.catalog);
            Snapshot {
                kind,
                views,
                integrity_errors,
                last_refreshed_at: state.last_refreshed_at,
            }
        };

        let newly_dangling = self.note_dangling(&snapshot.integrity_errors)?;
        for integrity_error in &newly_dangling {
            warn!("Dropping record from joined view: {}", integrity_error);
        }
        self.metrics_collector
            .record_integrity_errors(kind, newly_dangling.len());

        Ok(snapshot)
    }

    /// Remember the current dangling set and return the records not seen in it before.
    ///
    /// A record that resolves again and later dangles once more is reported again.
    fn note_dangling<'a>(
        &self,
        integrity_errors: &'a [IntegrityError],
    ) -> Result<Vec<&'a IntegrityError>> {
        let mut reported = self
            .reported_dangling
            .write()
            .map_err(|_| WaitingTimeError::lock_poisoned("dangling record set"))?;

        let fresh = integrity_errors
            .iter()
            .filter(|e| !reported.contains(&e.record_id))
            .collect();
        *reported = integrity_errors
            .iter()
            .map(|e| e.record_id.clone())
            .collect();

        Ok(fresh)
    }

    /// Every record joined to its catalog entry, in catalog order
    pub fn load_all(&self) -> Result<Vec<JoinedWaitingView<S>>> {
        Ok(self.snapshot()?.views)
    }

    /// Raw record by id
    pub fn get(&self, record_id: &str) -> Result<WaitingRecord> {
        let state = self.read_state()?;
        state
            .records
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or_else(|| self.not_found(record_id))
    }

    /// Joined view for the record attached to `subject_id`
    pub fn find_by_subject(&self, subject_id: &str) -> Result<JoinedWaitingView<S>> {
        let state = self.read_state()?;
        let subject = state
            .catalog
            .resolve(subject_id)
            .ok_or_else(|| self.not_found(subject_id))?;
        let record = state
            .records
            .iter()
            .find(|r| r.subject_id == subject_id)
            .ok_or_else(|| self.not_found(subject_id))?;

        Ok(JoinedWaitingView {
            record: record.clone(),
            subject: subject.clone(),
        })
    }

    /// Raw records, including ones whose subject is missing
    pub fn records(&self) -> Result<Vec<WaitingRecord>> {
        Ok(self.read_state()?.records.clone())
    }

    pub fn catalog_entries(&self) -> Result<Vec<S>> {
        Ok(self.read_state()?.catalog.entries().to_vec())
    }

    /// Time of the last successful refresh or update
    pub fn last_refreshed_at(&self) -> Result<Option<Timestamp>> {
        Ok(self.read_state()?.last_refreshed_at)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_in_flight.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Register a callback for every snapshot published after a mutation
    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription<S>>
    where
        F: Fn(&Snapshot<S>) + Send + Sync + 'static,
    {
        let id = self.subscribers.add(Arc::new(callback))?;
        Ok(Subscription::new(id, S::KIND, &self.subscribers))
    }

    /// Replace the record set with a fresh pull from the source.
    ///
    /// All-or-nothing: on any failure the previous records and refresh time
    /// stay in place. A call made while another refresh of this kind is in
    /// flight returns [`RefreshOutcome::Skipped`] without touching the source.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let kind = S::KIND;
        let Some(_in_flight) = InFlightGuard::acquire(&self.refresh_in_flight) else {
            warn!("Refresh of {} already in flight, skipping", kind);
            self.metrics_collector
                .record_refresh(kind, RefreshOutcomeLabel::Skipped);
            return Ok(RefreshOutcome::Skipped);
        };
        let _mutation = self.mutation_lock.lock().await;

        let subject_ids = {
            let state = self.read_state()?;
            state.catalog.ids()
        };

        let timer = self.metrics_collector.start_timer();
        let fetched = tokio::time::timeout(
            self.source_timeout,
            self.source.fetch(kind, &subject_ids),
        )
        .await;
        self.metrics_collector
            .record_refresh_duration(kind, timer.stop());

        let incoming = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => return Err(self.refresh_failed(source_unavailable(kind, &e))),
            Err(_) => {
                return Err(self.refresh_failed(WaitingTimeError::SourceUnavailable {
                    kind,
                    message: format!("no response within {:?}", self.source_timeout),
                }))
            }
        };

        if let Some(id) = first_duplicate_id(&incoming) {
            return Err(self.refresh_failed(WaitingTimeError::SourceUnavailable {
                kind,
                message: format!("source returned duplicate record id '{}'", id),
            }));
        }

        let (count, at) = {
            let mut state = self.write_state()?;
            let at = next_timestamp(state.latest_timestamp());
            state.records = incoming
                .into_iter()
                .map(|mut r| {
                    r.updated_at = at;
                    r
                })
                .collect();
            state.last_refreshed_at = Some(at);
            (state.records.len(), at)
        };

        self.metrics_collector.set_record_count(kind, count);
        self.metrics_collector
            .record_refresh(kind, RefreshOutcomeLabel::Refreshed);
        info!("Refreshed {} records: {} loaded", kind, count);

        self.publish();
        Ok(RefreshOutcome::Refreshed { records: count, at })
    }

    fn refresh_failed(&self, error: WaitingTimeError) -> anyhow::Error {
        warn!("Refresh failed, keeping previous snapshot: {}", error);
        self.metrics_collector
            .record_refresh(S::KIND, RefreshOutcomeLabel::Failed);
        error.into()
    }

    /// Apply a staff edit to one record.
    ///
    /// The update is validated in full before anything changes. Fields left
    /// unset keep their current value.
    pub async fn update(&self, record_id: &str, update: WaitingUpdate) -> Result<WaitingRecord> {
        let kind = S::KIND;
        let validated = match update.validate() {
            Ok(validated) => validated,
            Err(e) => {
                warn!("Rejected update for {} record {}: {}", kind, record_id, e);
                self.metrics_collector
                    .record_update(kind, UpdateOutcomeLabel::Rejected);
                return Err(e);
            }
        };

        let _mutation = self.mutation_lock.lock().await;
        let updated = {
            let mut state = self.write_state()?;
            let at = next_timestamp(state.latest_timestamp());
            let Some(record) = state.records.iter_mut().find(|r| r.id == record_id) else {
                self.metrics_collector
                    .record_update(kind, UpdateOutcomeLabel::NotFound);
                return Err(self.not_found(record_id));
            };

            validated.apply_to(record);
            record.updated_at = at;
            let updated = record.clone();
            state.last_refreshed_at = Some(at);
            updated
        };

        self.metrics_collector
            .record_update(kind, UpdateOutcomeLabel::Applied);
        info!(
            "Updated {} record {}: {} waiting, {} min, {} (by {})",
            kind,
            updated.id,
            updated.waiting_count,
            updated.estimated_minutes,
            updated.status,
            updated.last_updated_by
        );

        self.publish();
        Ok(updated)
    }

    /// Register a new subject and give it a default waiting record
    pub async fn add_subject(&self, entry: S) -> Result<WaitingRecord> {
        let kind = S::KIND;
        let _mutation = self.mutation_lock.lock().await;

        let (record, count) = {
            let mut state = self.write_state()?;
            let subject_id = entry.id().to_string();
            if state.catalog.contains(&subject_id) {
                return Err(WaitingTimeError::DuplicateEntry {
                    kind,
                    id: subject_id,
                }
                .into());
            }

            // A record the source already reported for this subject now resolves
            let existing = state
                .records
                .iter()
                .find(|r| r.subject_id == subject_id)
                .cloned();
            let record = match existing {
                Some(existing) => {
                    state.catalog.add(entry)?;
                    existing
                }
                None => {
                    let record_id = default_record_id(kind, &subject_id);
                    if state.records.iter().any(|r| r.id == record_id) {
                        return Err(WaitingTimeError::DuplicateEntry { kind, id: record_id }.into());
                    }
                    state.catalog.add(entry)?;
                    let at = next_timestamp(state.latest_timestamp());
                    let record = WaitingRecord::placeholder(record_id, subject_id, at);
                    state.records.push(record.clone());
                    record
                }
            };
            (record, state.records.len())
        };

        self.metrics_collector.set_record_count(kind, count);
        info!("Added {} subject {} with record {}", kind, record.subject_id, record.id);

        self.publish();
        Ok(record)
    }

    /// Replace a subject's catalog entry, returning the previous one
    pub async fn edit_subject(&self, entry: S) -> Result<S> {
        let _mutation = self.mutation_lock.lock().await;
        let previous = {
            let mut state = self.write_state()?;
            state.catalog.replace(entry)?
        };

        info!("Edited {} subject {}", S::KIND, previous.id());
        self.publish();
        Ok(previous)
    }

    /// Remove a subject and every record attached to it
    pub async fn remove_subject(&self, subject_id: &str) -> Result<Vec<WaitingRecord>> {
        let kind = S::KIND;
        let _mutation = self.mutation_lock.lock().await;

        let (removed, count) = {
            let mut state = self.write_state()?;
            state.catalog.remove(subject_id)?;
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.records)
                .into_iter()
                .partition(|r| r.subject_id == subject_id);
            state.records = kept;
            (removed, state.records.len())
        };

        self.metrics_collector.set_record_count(kind, count);
        info!(
            "Removed {} subject {} and {} record(s)",
            kind,
            subject_id,
            removed.len()
        );

        self.publish();
        Ok(removed)
    }

    /// Deliver the current snapshot to every subscriber before returning
    fn publish(&self) {
        let callbacks = match self.subscribers.callbacks() {
            Ok(callbacks) => callbacks,
            Err(e) => {
                warn!("Skipping {} publish: {}", S::KIND, e);
                return;
            }
        };
        if callbacks.is_empty() {
            return;
        }

        match self.snapshot() {
            Ok(snapshot) => {
                for callback in &callbacks {
                    callback(&snapshot);
                }
                debug!(
                    "Published {} snapshot to {} subscriber(s)",
                    S::KIND,
                    callbacks.len()
                );
            }
            Err(e) => warn!("Skipping {} publish: {}", S::KIND, e),
        }
    }

    fn not_found(&self, id: &str) -> anyhow::Error {
        WaitingTimeError::NotFound {
            kind: S::KIND,
            id: id.to_string(),
        }
        .into()
    }
}

/// First repeated record id, if any
fn first_duplicate_id(records: &[WaitingRecord]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .map(|r| r.id.as_str())
        .find(|id| !seen.insert(*id))
}

fn source_unavailable(kind: RecordKind, error: &anyhow::Error) -> WaitingTimeError {
    match classify(error) {
        Some(e @ WaitingTimeError::SourceUnavailable { .. }) => e.clone(),
        _ => WaitingTimeError::SourceUnavailable {
            kind,
            message: format!("{:#}", error),
        },
    }
}
