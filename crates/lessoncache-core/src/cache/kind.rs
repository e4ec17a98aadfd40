use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A logical partition of cached application data.
///
/// `All` is its own partition holding the aggregate document. Nothing written
/// to `All` propagates to the per-kind partitions, or the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataKind {
    Modules,
    Users,
    Purchases,
    Settings,
    UploadQueue,
    All,
}

impl DataKind {
    pub const VALUES: [DataKind; 6] = [
        DataKind::Modules,
        DataKind::Users,
        DataKind::Purchases,
        DataKind::Settings,
        DataKind::UploadQueue,
        DataKind::All,
    ];

    /// Kinds warmed by `DataCache::preload_data`: the catalog listing and
    /// storefront settings.
    pub const HOT: [DataKind; 2] = [DataKind::Modules, DataKind::Settings];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Modules => "modules",
            DataKind::Users => "users",
            DataKind::Purchases => "purchases",
            DataKind::Settings => "settings",
            DataKind::UploadQueue => "uploadQueue",
            DataKind::All => "all",
        }
    }

    /// Whether a load for this kind may be answered from the warm snapshot.
    /// The upload queue tracks live progress and always goes to the store.
    pub fn served_from_warm(&self) -> bool {
        !matches!(self, DataKind::UploadQueue)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataKind::VALUES
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_ascii_lowercase().as_str() {
                "upload_queue" | "upload-queue" | "uploads" => Some(DataKind::UploadQueue),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown data kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_display() {
        for kind in DataKind::VALUES {
            assert_eq!(kind.to_string().parse::<DataKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_kind_from_str_aliases() {
        assert_eq!("UPLOADQUEUE".parse::<DataKind>(), Ok(DataKind::UploadQueue));
        assert_eq!("upload-queue".parse::<DataKind>(), Ok(DataKind::UploadQueue));
        assert_eq!("Modules".parse::<DataKind>(), Ok(DataKind::Modules));
        assert!("lessons".parse::<DataKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_camel_case() {
        let json = serde_json::to_string(&DataKind::UploadQueue).expect("serialize kind");
        assert_eq!(json, "\"uploadQueue\"");
    }

    #[test]
    fn test_only_upload_queue_bypasses_warm_cache() {
        let bypass: Vec<_> = DataKind::VALUES
            .iter()
            .filter(|kind| !kind.served_from_warm())
            .collect();
        assert_eq!(bypass, vec![&DataKind::UploadQueue]);
    }
}
