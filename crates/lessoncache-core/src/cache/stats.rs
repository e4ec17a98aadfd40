use std::collections::BTreeMap;

use serde::Serialize;

use super::DataKind;

/// Read-only snapshot of cache state, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cached kinds
    pub entries: usize,
    /// Subscribers across all kinds
    pub subscribers: usize,
    /// Cached kinds, sorted
    pub keys: Vec<DataKind>,
    /// Foreground loads in progress
    pub in_flight: usize,
    /// Background refreshes scheduled or running
    pub background_refreshes: usize,
    /// Human-readable age of each cached kind
    pub ages: BTreeMap<DataKind, String>,
}

impl CacheStats {
    pub fn is_cached(&self, kind: DataKind) -> bool {
        self.keys.contains(&kind)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Age of `kind` for status display, "never" if not cached
    pub fn age_of(&self, kind: DataKind) -> String {
        self.ages
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| "never".to_string())
    }
}
