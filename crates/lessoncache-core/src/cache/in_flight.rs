//! Single-flight bookkeeping for loads in progress.
//!
//! A foreground load is stored as a shared future so concurrent callers for
//! the same kind await one result. Background refreshes are only marked, since
//! nobody waits on them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::DataKind;

pub type PendingLoad<T> = Shared<BoxFuture<'static, T>>;

pub struct InFlightTracker<T: Clone> {
    pending: Mutex<HashMap<DataKind, PendingLoad<T>>>,
    background: Mutex<HashSet<DataKind>>,
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> InFlightTracker<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            background: Mutex::new(HashSet::new()),
        }
    }

    /// The load currently running for `kind`, if any.
    pub fn get(&self, kind: DataKind) -> Option<PendingLoad<T>> {
        lock(&self.pending).get(&kind).cloned()
    }

    /// Join the load running for `kind`, or register the one built by
    /// `start`. The check and the insert happen under one lock, so at most one
    /// load per kind is ever registered. Returns true when `start` ran.
    pub fn join_or_start<F>(&self, kind: DataKind, start: F) -> (PendingLoad<T>, bool)
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let mut pending = lock(&self.pending);
        if let Some(existing) = pending.get(&kind) {
            return (existing.clone(), false);
        }
        let load = start().shared();
        pending.insert(kind, load.clone());
        (load, true)
    }

    pub fn finish(&self, kind: DataKind) {
        lock(&self.pending).remove(&kind);
    }

    /// Mark a background refresh for `kind` as scheduled. Returns false if one
    /// is already scheduled or running.
    pub fn begin_background(&self, kind: DataKind) -> bool {
        lock(&self.background).insert(kind)
    }

    pub fn finish_background(&self, kind: DataKind) {
        lock(&self.background).remove(&kind);
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn background_count(&self) -> usize {
        lock(&self.background).len()
    }
}

impl<T> Default for InFlightTracker<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Clears a tracker slot when dropped, including when the owning task panics
/// or is cancelled.
pub struct InFlightGuard<T>
where
    T: Clone + Send + Sync + 'static,
{
    tracker: Arc<InFlightTracker<T>>,
    kind: DataKind,
    background: bool,
}

impl<T> InFlightGuard<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn foreground(tracker: &Arc<InFlightTracker<T>>, kind: DataKind) -> Self {
        Self {
            tracker: Arc::clone(tracker),
            kind,
            background: false,
        }
    }

    pub fn background(tracker: &Arc<InFlightTracker<T>>, kind: DataKind) -> Self {
        Self {
            tracker: Arc::clone(tracker),
            kind,
            background: true,
        }
    }
}

impl<T> Drop for InFlightGuard<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.background {
            self.tracker.finish_background(self.kind);
        } else {
            self.tracker.finish(self.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_second_caller_joins_existing_load() {
        let tracker: InFlightTracker<u32> = InFlightTracker::new();
        let starts = AtomicUsize::new(0);

        let (first, started_first) = tracker.join_or_start(DataKind::Modules, || {
            starts.fetch_add(1, Ordering::SeqCst);
            async { 7 }.boxed()
        });
        let (second, started_second) = tracker.join_or_start(DataKind::Modules, || {
            starts.fetch_add(1, Ordering::SeqCst);
            async { 8 }.boxed()
        });

        assert!(started_first);
        assert!(!started_second);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pending_count(), 1);
        assert_eq!(first.await, 7);
        assert_eq!(second.await, 7);
    }

    #[tokio::test]
    async fn test_kinds_are_tracked_independently() {
        let tracker: InFlightTracker<&'static str> = InFlightTracker::new();
        let (modules, _) = tracker.join_or_start(DataKind::Modules, || async { "modules" }.boxed());
        let (users, started) = tracker.join_or_start(DataKind::Users, || async { "users" }.boxed());
        assert!(started);
        assert_eq!(tracker.pending_count(), 2);
        assert_eq!(modules.await, "modules");
        assert_eq!(users.await, "users");
    }

    #[test]
    fn test_guard_clears_slot_on_drop() {
        let tracker = Arc::new(InFlightTracker::<u32>::new());
        let _ = tracker.join_or_start(DataKind::Settings, || async { 1 }.boxed());
        assert!(tracker.get(DataKind::Settings).is_some());

        drop(InFlightGuard::foreground(&tracker, DataKind::Settings));
        assert!(tracker.get(DataKind::Settings).is_none());
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn test_background_marks_are_exclusive() {
        let tracker = Arc::new(InFlightTracker::<u32>::new());
        assert!(tracker.begin_background(DataKind::All));
        assert!(!tracker.begin_background(DataKind::All));
        assert!(tracker.begin_background(DataKind::Users));
        assert_eq!(tracker.background_count(), 2);

        drop(InFlightGuard::background(&tracker, DataKind::All));
        assert!(tracker.begin_background(DataKind::All));
    }
}
