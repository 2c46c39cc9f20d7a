//! Periodic background refresh of the board

use crate::store::board::WaitingBoard;
use crate::store::waiting_store::RefreshOutcome;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Default time between background refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to a running polling task.
///
/// Stopping waits for a refresh that is already running to finish; it is
/// never aborted. Dropping the handle stops polling without waiting.
pub struct PollingHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollingHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop polling and wait for the task to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Polling task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Refresh every kind on `board` each `period`, starting immediately
pub fn spawn_polling(board: WaitingBoard, period: Duration) -> PollingHandle {
    let period = period.max(Duration::from_millis(1));
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        // A tick missed during a slow refresh is dropped, not queued
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Background refresh started ({:?} interval)", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for (kind, result) in board.refresh_all().await {
                        match result {
                            Ok(RefreshOutcome::Refreshed { records, .. }) => {
                                debug!("Scheduled refresh of {} loaded {} records", kind, records)
                            }
                            Ok(RefreshOutcome::Skipped) => {
                                debug!("Scheduled refresh of {} coalesced", kind)
                            }
                            Err(e) => error!("Scheduled refresh of {} failed: {:#}", kind, e),
                        }
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }

        info!("Background refresh stopped");
    });

    PollingHandle {
        shutdown_tx,
        task: Some(task),
    }
}
