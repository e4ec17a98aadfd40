use async_trait::async_trait;

use super::ApiError;
use crate::cache::{DataKind, DataPayload};

/// The authoritative, slower data source behind the cache.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Fetch the current snapshot of `kind`. The payload variant must match
    /// `kind`.
    async fn fetch_snapshot(&self, kind: DataKind) -> Result<DataPayload, ApiError>;

    /// Persist `data` as the new snapshot of `kind`. Returns whether the store
    /// accepted it.
    async fn persist_snapshot(&self, kind: DataKind, data: &DataPayload) -> Result<bool, ApiError>;
}
