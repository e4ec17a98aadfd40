//! lessoncache-core - data cache and store client for the lesson storefront.
//!
//! The storefront UI reads every kind of data (catalog modules, users,
//! purchases, settings, upload queue) through one [`DataCache`], which serves
//! cached data immediately, refreshes it in the background, de-duplicates
//! concurrent loads and notifies subscribers when data changes.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, PersistentStore};
pub use cache::{
    CacheError, CachePolicy, CacheStats, DataCache, DataKind, DataPayload, KindData,
    SubscriptionId, WarmCache,
};
pub use config::Config;
