//! The hospital board: one store per record kind sharing a source

use crate::catalog::Catalog;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::seed;
use crate::source::WaitingSource;
use crate::store::scheduler::{spawn_polling, PollingHandle};
use crate::store::waiting_store::{RefreshOutcome, WaitingStore};
use crate::types::{
    ConsultationRoom, Examination, RecordKind, Timestamp, WaitingRecord, WaitingUpdate,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Examination and consultation-room stores behind one handle
#[derive(Clone)]
pub struct WaitingBoard {
    examinations: WaitingStore<Examination>,
    rooms: WaitingStore<ConsultationRoom>,
    metrics_collector: Arc<MetricsCollector>,
}

impl WaitingBoard {
    pub fn new(
        examinations: WaitingStore<Examination>,
        rooms: WaitingStore<ConsultationRoom>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            examinations,
            rooms,
            metrics_collector,
        }
    }

    /// Board preloaded with the seed catalog and records
    pub fn seeded(
        source: Arc<dyn WaitingSource>,
        metrics_collector: Arc<MetricsCollector>,
        source_timeout: Duration,
    ) -> Result<Self> {
        let examinations = WaitingStore::with_records(
            Catalog::from_entries(seed::examinations())?,
            seed::examination_records(),
            Arc::clone(&source),
            Arc::clone(&metrics_collector),
        )?
        .with_source_timeout(source_timeout);

        let rooms = WaitingStore::with_records(
            Catalog::from_entries(seed::consultation_rooms())?,
            seed::room_records(),
            source,
            Arc::clone(&metrics_collector),
        )?
        .with_source_timeout(source_timeout);

        info!(
            "Seeded board with {} examinations and {} consultation rooms",
            examinations.catalog_entries()?.len(),
            rooms.catalog_entries()?.len()
        );

        Ok(Self::new(examinations, rooms, metrics_collector))
    }

    pub fn examinations(&self) -> &WaitingStore<Examination> {
        &self.examinations
    }

    pub fn rooms(&self) -> &WaitingStore<ConsultationRoom> {
        &self.rooms
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics_collector)
    }

    pub async fn refresh(&self, kind: RecordKind) -> Result<RefreshOutcome> {
        match kind {
            RecordKind::Examination => self.examinations.refresh().await,
            RecordKind::Room => self.rooms.refresh().await,
        }
    }

    /// Refresh both kinds concurrently; each succeeds or fails on its own
    pub async fn refresh_all(&self) -> Vec<(RecordKind, Result<RefreshOutcome>)> {
        let (examinations, rooms) = tokio::join!(self.examinations.refresh(), self.rooms.refresh());

        vec![
            (RecordKind::Examination, examinations),
            (RecordKind::Room, rooms),
        ]
    }

    pub async fn update(
        &self,
        kind: RecordKind,
        record_id: &str,
        update: WaitingUpdate,
    ) -> Result<WaitingRecord> {
        match kind {
            RecordKind::Examination => self.examinations.update(record_id, update).await,
            RecordKind::Room => self.rooms.update(record_id, update).await,
        }
    }

    pub fn get(&self, kind: RecordKind, record_id: &str) -> Result<WaitingRecord> {
        match kind {
            RecordKind::Examination => self.examinations.get(record_id),
            RecordKind::Room => self.rooms.get(record_id),
        }
    }

    pub fn last_refreshed_at(&self, kind: RecordKind) -> Result<Option<Timestamp>> {
        match kind {
            RecordKind::Examination => self.examinations.last_refreshed_at(),
            RecordKind::Room => self.rooms.last_refreshed_at(),
        }
    }

    /// Refresh both kinds every `interval` until the handle is stopped
    pub fn start_polling(&self, interval: Duration) -> PollingHandle {
        spawn_polling(self.clone(), interval)
    }
}
