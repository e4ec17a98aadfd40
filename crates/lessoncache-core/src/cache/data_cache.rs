//! The stale-while-revalidate orchestrator.
//!
//! `DataCache` answers `get_data(kind)` from memory when it can, serves stale
//! data while refreshing it in the background, and funnels concurrent misses
//! for one kind into a single load. A cold load (nothing cached for the kind)
//! prefers the warm snapshot; every other load goes to the persistent store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{join_all, FutureExt};
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, CachePolicy, Freshness};
use super::error::{CacheError, Result};
use super::in_flight::{InFlightGuard, InFlightTracker, PendingLoad};
use super::subscriptions::{SubscriptionId, SubscriptionRegistry};
use super::warm::{self, WarmCache};
use super::{CacheStats, DataKind, DataPayload, KindData};
use crate::api::{ApiError, PersistentStore};
use crate::models::AppSnapshot;

/// Outcome of one load, shared by every caller that joined it.
pub type LoadResult = Result<Arc<DataPayload>>;

struct Inner {
    policy: CachePolicy,
    app_key: String,
    store: Arc<dyn PersistentStore>,
    warm: Arc<dyn WarmCache>,
    entries: Mutex<HashMap<DataKind, CacheEntry>>,
    subscriptions: SubscriptionRegistry,
    in_flight: Arc<InFlightTracker<LoadResult>>,
    next_version: AtomicU64,
}

/// Process-wide data cache. Clone is cheap and every clone shares the same
/// state; build one at startup and hand clones to consumers.
///
/// Loads and background refreshes run on the ambient tokio runtime.
#[derive(Clone)]
pub struct DataCache {
    inner: Arc<Inner>,
}

impl DataCache {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        warm: Arc<dyn WarmCache>,
        app_key: impl Into<String>,
        policy: CachePolicy,
    ) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                policy,
                app_key: app_key.into(),
                store,
                warm,
                entries: Mutex::new(HashMap::new()),
                subscriptions: SubscriptionRegistry::new(),
                in_flight: Arc::new(InFlightTracker::new()),
                next_version: AtomicU64::new(1),
            }),
        })
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    pub fn app_key(&self) -> &str {
        &self.inner.app_key
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the data for `kind`.
    ///
    /// - joins a load already running for `kind`
    /// - returns fresh cached data without loading
    /// - returns stale-but-usable data and refreshes it in the background
    /// - otherwise loads, caches, notifies subscribers and returns the result
    ///
    /// Only a cold, unforced load may be answered from the warm snapshot;
    /// reloads and background refreshes always go to the store.
    ///
    /// A failed load degrades to the last cached data for `kind` (any age), or
    /// to the kind's empty value. Only a forced load with nothing cached
    /// returns the error.
    pub async fn get_data(&self, kind: DataKind, force_refresh: bool) -> LoadResult {
        if let Some(pending) = self.inner.in_flight.get(kind) {
            debug!(%kind, "Joining in-flight load");
            let outcome = pending.await;
            return self.settle(kind, force_refresh, outcome);
        }

        if !force_refresh {
            if let Some(entry) = self.entry(kind) {
                match entry.freshness(&self.inner.policy) {
                    Freshness::Fresh => {
                        debug!(%kind, "Cache hit");
                        return Ok(entry.data);
                    }
                    Freshness::Stale => {
                        debug!(%kind, "Serving stale data, refreshing in background");
                        self.schedule_refresh(kind);
                        return Ok(entry.data);
                    }
                    Freshness::Expired => {
                        debug!(%kind, "Cached data expired");
                    }
                }
            }
        }

        let outcome = self.start_load(kind, force_refresh).await;
        self.settle(kind, force_refresh, outcome)
    }

    /// Typed variant of `get_data`.
    pub async fn get<T: KindData>(&self, force_refresh: bool) -> Result<T> {
        let payload = self.get_data(T::KIND, force_refresh).await?;
        T::extract(&payload)
            .cloned()
            .ok_or_else(|| CacheError::KindMismatch {
                expected: T::KIND,
                actual: payload.kind(),
            })
    }

    /// Warm the hot kinds concurrently. Each result is reported on its own; one
    /// failure does not stop the others.
    pub async fn preload_data(&self) -> Vec<(DataKind, LoadResult)> {
        info!(kinds = ?DataKind::HOT, "Preloading data");
        let loads = DataKind::HOT
            .iter()
            .map(|&kind| async move { (kind, self.get_data(kind, false).await) });
        let results = join_all(loads).await;

        for (kind, result) in &results {
            if let Err(e) = result {
                warn!(%kind, error = %e, "Preload failed");
            }
        }
        results
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Persist `payload` as the new snapshot of `kind`. When the store accepts
    /// it, the payload replaces the cached entry and subscribers are notified.
    pub async fn save_data(&self, kind: DataKind, payload: DataPayload) -> Result<bool> {
        if payload.kind() != kind {
            return Err(CacheError::KindMismatch {
                expected: kind,
                actual: payload.kind(),
            });
        }

        let version = self.next_version();
        let saved = self
            .with_timeout(kind, self.inner.store.persist_snapshot(kind, &payload))
            .await?;
        if !saved {
            warn!(%kind, "Store rejected snapshot");
            return Ok(false);
        }

        if let DataPayload::All(ref snapshot) = payload {
            self.write_warm(snapshot);
        }
        self.commit(kind, version, Arc::new(payload));
        Ok(true)
    }

    /// Drop the cached entry for `kind`, or every entry. Loads in progress
    /// and the warm snapshot are untouched.
    pub fn clear_cache(&self, kind: Option<DataKind>) {
        let mut entries = self.lock_entries();
        match kind {
            Some(kind) => {
                entries.remove(&kind);
                debug!(%kind, "Cleared cache entry");
            }
            None => {
                entries.clear();
                debug!("Cleared all cache entries");
            }
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Call `callback` with the new data every time `kind` is loaded or
    /// refreshed.
    pub fn subscribe<F>(&self, kind: DataKind, callback: F) -> SubscriptionId
    where
        F: Fn(&DataPayload) + Send + Sync + 'static,
    {
        self.inner.subscriptions.subscribe(kind, callback)
    }

    pub fn unsubscribe(&self, kind: DataKind, id: SubscriptionId) -> bool {
        self.inner.subscriptions.unsubscribe(kind, id)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub fn get_cache_stats(&self) -> CacheStats {
        let (keys, ages) = {
            let entries = self.lock_entries();
            let mut keys: Vec<DataKind> = entries.keys().copied().collect();
            keys.sort();
            let ages = entries
                .iter()
                .map(|(kind, entry)| (*kind, entry.age_display()))
                .collect();
            (keys, ages)
        };

        CacheStats {
            entries: keys.len(),
            subscribers: self.inner.subscriptions.total(),
            keys,
            in_flight: self.inner.in_flight.pending_count(),
            background_refreshes: self.inner.in_flight.background_count(),
            ages,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<DataKind, CacheEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry(&self, kind: DataKind) -> Option<CacheEntry> {
        self.lock_entries().get(&kind).cloned()
    }

    fn next_version(&self) -> u64 {
        self.inner.next_version.fetch_add(1, Ordering::Relaxed)
    }

    /// Store `data` for `kind` and notify subscribers, unless a load that
    /// started later has already stored a result. Returns the data now cached.
    fn commit(&self, kind: DataKind, version: u64, data: Arc<DataPayload>) -> Arc<DataPayload> {
        {
            let mut entries = self.lock_entries();
            if let Some(current) = entries.get(&kind) {
                if current.version > version {
                    debug!(
                        %kind,
                        version,
                        current = current.version,
                        "Discarding out-of-order load result"
                    );
                    return Arc::clone(&current.data);
                }
            }
            entries.insert(
                kind,
                CacheEntry::new(Arc::clone(&data), version, &self.inner.policy),
            );
        }

        self.inner.subscriptions.notify(kind, &data);
        data
    }

    /// Apply the degraded-result rules to a finished load.
    fn settle(&self, kind: DataKind, force_refresh: bool, outcome: LoadResult) -> LoadResult {
        let err = match outcome {
            Ok(data) => return Ok(data),
            Err(err) => err,
        };

        if let Some(entry) = self.entry(kind) {
            warn!(%kind, error = %err, "Load failed, serving cached data");
            return Ok(entry.data);
        }
        if force_refresh {
            warn!(%kind, error = %err, "Forced load failed with nothing cached");
            return Err(err);
        }
        warn!(%kind, error = %err, "Load failed, serving empty data");
        Ok(Arc::new(DataPayload::empty(kind)))
    }

    /// Join or register the foreground load for `kind`. The load runs in its
    /// own task so it completes even if every caller goes away.
    fn start_load(&self, kind: DataKind, force_refresh: bool) -> PendingLoad<LoadResult> {
        let (load, started) = self.inner.in_flight.join_or_start(kind, || {
            let guard = InFlightGuard::foreground(&self.inner.in_flight, kind);
            let this = self.clone();
            let handle = tokio::spawn(async move {
                let _guard = guard;
                this.run_load(kind, force_refresh).await
            });
            async move {
                handle
                    .await
                    .unwrap_or_else(|e| Err(CacheError::TaskFailed(e.to_string())))
            }
            .boxed()
        });

        if !started {
            debug!(%kind, "Joining in-flight load");
        }
        load
    }

    async fn run_load(&self, kind: DataKind, force_refresh: bool) -> LoadResult {
        let version = self.next_version();
        let cold = !force_refresh && self.entry(kind).is_none();
        let payload = if cold {
            self.load_fresh_data(kind).await?
        } else {
            self.fetch_from_store(kind).await?
        };
        debug!(%kind, count = payload.len(), "Loaded fresh data");
        Ok(self.commit(kind, version, Arc::new(payload)))
    }

    /// Fire-and-forget store fetch of `kind` after the refresh delay. On
    /// failure the cached entry is left as is. At most one refresh per kind is
    /// scheduled at a time.
    fn schedule_refresh(&self, kind: DataKind) {
        if !self.inner.in_flight.begin_background(kind) {
            debug!(%kind, "Background refresh already scheduled");
            return;
        }

        let guard = InFlightGuard::background(&self.inner.in_flight, kind);
        let this = self.clone();
        let delay = self.inner.policy.refresh_delay;
        tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;

            let version = this.next_version();
            match this.fetch_from_store(kind).await {
                Ok(payload) => {
                    info!(%kind, count = payload.len(), "Background refresh complete");
                    this.commit(kind, version, Arc::new(payload));
                }
                Err(e) => {
                    warn!(%kind, error = %e, "Background refresh failed, keeping cached data");
                }
            }
        });
    }

    /// Cold-start load: the warm snapshot if one is usable (with a background
    /// sync of the aggregate from the store), else the store itself.
    async fn load_fresh_data(&self, kind: DataKind) -> Result<DataPayload> {
        if kind.served_from_warm() {
            let snapshot = warm::load_snapshot(
                self.inner.warm.as_ref(),
                &self.inner.app_key,
                self.inner.policy.warm_max_age,
            );
            if let Some(snapshot) = snapshot {
                debug!(%kind, "Loaded from warm cache, syncing aggregate in background");
                self.schedule_refresh(DataKind::All);
                return Ok(snapshot.into_projection(kind));
            }
        }
        self.fetch_from_store(kind).await
    }

    /// Fetch `kind` from the persistent store. A fresh aggregate also
    /// rewrites the warm snapshot.
    async fn fetch_from_store(&self, kind: DataKind) -> Result<DataPayload> {
        let payload = self
            .with_timeout(kind, self.inner.store.fetch_snapshot(kind))
            .await?;
        if payload.kind() != kind {
            return Err(CacheError::KindMismatch {
                expected: kind,
                actual: payload.kind(),
            });
        }

        if let DataPayload::All(ref snapshot) = payload {
            self.write_warm(snapshot);
        }
        Ok(payload)
    }

    async fn with_timeout<T, F>(&self, kind: DataKind, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ApiError>>,
    {
        let after = self.inner.policy.fetch_timeout;
        match tokio::time::timeout(after, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::from_api(kind, &e)),
            Err(_) => Err(CacheError::Timeout { kind, after }),
        }
    }

    fn write_warm(&self, snapshot: &AppSnapshot) {
        match warm::store_snapshot(self.inner.warm.as_ref(), &self.inner.app_key, snapshot) {
            Ok(()) => debug!(app_key = %self.inner.app_key, "Warm snapshot written"),
            Err(e) => warn!(app_key = %self.inner.app_key, error = %e, "Failed to write warm snapshot"),
        }
    }
}
