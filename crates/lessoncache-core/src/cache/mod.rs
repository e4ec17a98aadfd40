//! Client-side data cache with stale-while-revalidate semantics.
//!
//! `DataCache` sits in front of a slower `PersistentStore`:
//!
//! - entries are fresh for `CACHE_DURATION` (5 minutes)
//! - until `STALE_WINDOW` (10 minutes) stale data is served while a
//!   background refresh runs
//! - concurrent misses for one kind share a single load
//! - subscribers are notified on every load or refresh of their kind
//! - a `WarmCache` snapshot of the aggregate document answers loads without
//!   a network round trip on startup

pub mod data_cache;
pub mod entry;
pub mod error;
pub mod in_flight;
pub mod kind;
pub mod payload;
pub mod stats;
pub mod subscriptions;
pub mod warm;

pub use data_cache::{DataCache, LoadResult};
pub use entry::{
    CacheEntry, CachePolicy, Freshness, CACHE_DURATION, FETCH_TIMEOUT, MAX_POLICY_DURATION, STALE_WINDOW,
};
pub use error::CacheError;
pub use kind::DataKind;
pub use payload::{DataPayload, KindData};
pub use stats::CacheStats;
pub use subscriptions::{SubscriptionId, SubscriptionRegistry};
pub use warm::{FileWarmCache, MemoryWarmCache, WarmCache};
