//! Snapshot subscriptions
//!
//! Views register a callback and keep the returned [`Subscription`] for as
//! long as they are mounted. Dropping the handle unsubscribes.

use crate::error::{Result, WaitingTimeError};
use crate::metrics::MetricsCollector;
use crate::store::join::Snapshot;
use crate::types::RecordKind;
use crate::utils::generate_subscription_id;
use std::sync::{Arc, RwLock, Weak};
use tracing::debug;
use uuid::Uuid;

/// Callback invoked with the new snapshot after every successful mutation
pub type SnapshotCallback<S> = Arc<dyn Fn(&Snapshot<S>) + Send + Sync>;

/// Active callbacks for one record kind, in subscription order
pub(crate) struct SubscriberRegistry<S> {
    kind: RecordKind,
    callbacks: RwLock<Vec<(Uuid, SnapshotCallback<S>)>>,
    metrics: Arc<MetricsCollector>,
}

impl<S> SubscriberRegistry<S> {
    pub(crate) fn new(kind: RecordKind, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            kind,
            callbacks: RwLock::new(Vec::new()),
            metrics,
        }
    }

    pub(crate) fn add(&self, callback: SnapshotCallback<S>) -> Result<Uuid> {
        let id = generate_subscription_id();
        let mut callbacks = self
            .callbacks
            .write()
            .map_err(|_| WaitingTimeError::lock_poisoned("subscribers"))?;
        callbacks.push((id, callback));
        self.metrics.set_subscriber_count(self.kind, callbacks.len());

        debug!("Subscriber {} registered for {} snapshots", id, self.kind);
        Ok(id)
    }

    pub(crate) fn remove(&self, id: Uuid) -> bool {
        let Ok(mut callbacks) = self.callbacks.write() else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        self.metrics.set_subscriber_count(self.kind, callbacks.len());

        let removed = callbacks.len() < before;
        if removed {
            debug!("Subscriber {} removed from {} snapshots", id, self.kind);
        }
        removed
    }

    pub(crate) fn contains(&self, id: Uuid) -> bool {
        self.callbacks
            .read()
            .map(|callbacks| callbacks.iter().any(|(existing, _)| *existing == id))
            .unwrap_or(false)
    }

    /// Copy of the current callbacks so they can run without the lock held
    pub(crate) fn callbacks(&self) -> Result<Vec<SnapshotCallback<S>>> {
        let callbacks = self
            .callbacks
            .read()
            .map_err(|_| WaitingTimeError::lock_poisoned("subscribers"))?;
        Ok(callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.read().map(|c| c.len()).unwrap_or(0)
    }
}

/// Handle returned by `subscribe`; unsubscribes when dropped
#[must_use = "dropping a Subscription immediately unsubscribes it"]
pub struct Subscription<S> {
    id: Uuid,
    kind: RecordKind,
    registry: Weak<SubscriberRegistry<S>>,
}

impl<S> Subscription<S> {
    pub(crate) fn new(id: Uuid, kind: RecordKind, registry: &Arc<SubscriberRegistry<S>>) -> Self {
        Self {
            id,
            kind,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Whether the callback is still registered with a live store
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(self.id))
            .unwrap_or(false)
    }

    /// Stop receiving snapshots
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl<S> Drop for Subscription<S> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl<S> std::fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Examination;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<SubscriberRegistry<Examination>> {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        Arc::new(SubscriberRegistry::new(RecordKind::Examination, metrics))
    }

    fn empty_snapshot() -> Snapshot<Examination> {
        Snapshot {
            kind: RecordKind::Examination,
            views: Vec::new(),
            integrity_errors: Vec::new(),
            last_refreshed_at: None,
        }
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = registry();
        let id = registry.add(Arc::new(|_| {})).unwrap();
        let subscription = Subscription::new(id, RecordKind::Examination, &registry);

        assert!(subscription.is_active());
        assert_eq!(registry.len(), 1);

        drop(subscription);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_explicit_unsubscribe() {
        let registry = registry();
        let id = registry.add(Arc::new(|_| {})).unwrap();
        let subscription = Subscription::new(id, RecordKind::Examination, &registry);

        subscription.unsubscribe();
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_handle_outliving_registry_is_inactive() {
        let registry = registry();
        let id = registry.add(Arc::new(|_| {})).unwrap();
        let subscription = Subscription::new(id, RecordKind::Examination, &registry);

        drop(registry);
        assert!(!subscription.is_active());
        // Dropping the handle after the registry is gone must not panic
        drop(subscription);
    }

    #[test]
    fn test_callbacks_run_in_subscription_order() {
        let registry = registry();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        for label in ["patient", "staff"] {
            let order = Arc::clone(&order);
            let calls = Arc::clone(&calls);
            registry
                .add(Arc::new(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    order.lock().unwrap().push(label);
                }))
                .unwrap();
        }

        let snapshot = empty_snapshot();
        for callback in registry.callbacks().unwrap() {
            callback(&snapshot);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*order.lock().unwrap(), vec!["patient", "staff"]);
    }
}
