//! Per-kind change subscriptions.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use super::{DataKind, DataPayload};

/// Callback invoked with the new data whenever a kind is (re)loaded.
pub type Callback = Arc<dyn Fn(&DataPayload) + Send + Sync>;

/// Opaque handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<DataKind, Vec<Subscriber>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DataKind, Vec<Subscriber>>> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe<F>(&self, kind: DataKind, callback: F) -> SubscriptionId
    where
        F: Fn(&DataPayload) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().entry(kind).or_default().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        debug!(%kind, %id, "Subscribed");
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, kind: DataKind, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(&kind);
        }
        removed
    }

    /// Deliver `data` to every subscriber of `kind`.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe,
    /// unsubscribe or read the cache. A panicking callback is logged and
    /// skipped; the rest still run.
    pub fn notify(&self, kind: DataKind, data: &DataPayload) {
        let callbacks: Vec<(SubscriptionId, Callback)> = self
            .lock()
            .get(&kind)
            .map(|list| list.iter().map(|s| (s.id, Arc::clone(&s.callback))).collect())
            .unwrap_or_default();

        if callbacks.is_empty() {
            return;
        }
        debug!(%kind, count = callbacks.len(), "Notifying subscribers");

        for (id, callback) in callbacks {
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| callback(data))) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(%kind, %id, error = %message, "Subscriber callback panicked");
            }
        }
    }

    pub fn count(&self, kind: DataKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Module;
    use std::sync::atomic::AtomicUsize;

    fn counting(hits: &Arc<AtomicUsize>) -> impl Fn(&DataPayload) + Send + Sync + 'static {
        let hits = Arc::clone(hits);
        move |_: &DataPayload| {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let a = registry.subscribe(DataKind::Modules, counting(&hits));
        let b = registry.subscribe(DataKind::Modules, counting(&hits));
        let c = registry.subscribe(DataKind::Users, counting(&hits));
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(registry.total(), 3);
        assert_eq!(registry.count(DataKind::Modules), 2);
    }

    #[test]
    fn test_notify_fans_out_to_remaining_subscribers() {
        let registry = SubscriptionRegistry::new();
        let counters: Vec<_> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let ids: Vec<_> = counters
            .iter()
            .map(|hits| registry.subscribe(DataKind::Modules, counting(hits)))
            .collect();

        assert!(registry.unsubscribe(DataKind::Modules, ids[1]));
        registry.notify(DataKind::Modules, &DataPayload::Modules(vec![Module::new("m1", "A")]));

        let hits: Vec<_> = counters.iter().map(|h| h.load(Ordering::SeqCst)).collect();
        assert_eq!(hits, vec![1, 0, 1]);
    }

    #[test]
    fn test_notify_only_reaches_matching_kind() {
        let registry = SubscriptionRegistry::new();
        let modules_hits = Arc::new(AtomicUsize::new(0));
        let all_hits = Arc::new(AtomicUsize::new(0));
        registry.subscribe(DataKind::Modules, counting(&modules_hits));
        registry.subscribe(DataKind::All, counting(&all_hits));

        registry.notify(DataKind::All, &DataPayload::empty(DataKind::All));
        assert_eq!(modules_hits.load(Ordering::SeqCst), 0);
        assert_eq!(all_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = registry.subscribe(DataKind::Users, counting(&hits));
        assert!(!registry.unsubscribe(DataKind::Modules, id));
        assert!(registry.unsubscribe(DataKind::Users, id));
        assert!(!registry.unsubscribe(DataKind::Users, id));
        assert_eq!(registry.count(DataKind::Users), 0);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let registry = SubscriptionRegistry::new();
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        registry.subscribe(DataKind::Settings, counting(&before));
        registry.subscribe(DataKind::Settings, |_| panic!("render failed"));
        registry.subscribe(DataKind::Settings, counting(&after));

        registry.notify(DataKind::Settings, &DataPayload::empty(DataKind::Settings));

        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let registry_clone = Arc::clone(&registry);
        let slot_clone = Arc::clone(&slot);
        let id = registry.subscribe(DataKind::Purchases, move |_| {
            if let Some(id) = *slot_clone.lock().unwrap() {
                registry_clone.unsubscribe(DataKind::Purchases, id);
            }
        });
        *slot.lock().unwrap() = Some(id);

        registry.notify(DataKind::Purchases, &DataPayload::empty(DataKind::Purchases));
        assert_eq!(registry.count(DataKind::Purchases), 0);
    }
}
