//! Type-erased payloads indexed by `DataKind`.

use serde::{Deserialize, Serialize};

use super::DataKind;
use crate::models::{AppSettings, AppSnapshot, Module, Purchase, UploadQueueItem, User};

/// Cached data for one partition. Each variant carries the concrete payload
/// type of the matching `DataKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum DataPayload {
    Modules(Vec<Module>),
    Users(Vec<User>),
    Purchases(Vec<Purchase>),
    Settings(AppSettings),
    UploadQueue(Vec<UploadQueueItem>),
    All(AppSnapshot),
}

impl DataPayload {
    /// The documented empty value served when a kind has never loaded.
    pub fn empty(kind: DataKind) -> Self {
        match kind {
            DataKind::Modules => DataPayload::Modules(Vec::new()),
            DataKind::Users => DataPayload::Users(Vec::new()),
            DataKind::Purchases => DataPayload::Purchases(Vec::new()),
            DataKind::Settings => DataPayload::Settings(AppSettings::default()),
            DataKind::UploadQueue => DataPayload::UploadQueue(Vec::new()),
            DataKind::All => DataPayload::All(AppSnapshot::default()),
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            DataPayload::Modules(_) => DataKind::Modules,
            DataPayload::Users(_) => DataKind::Users,
            DataPayload::Purchases(_) => DataKind::Purchases,
            DataPayload::Settings(_) => DataKind::Settings,
            DataPayload::UploadQueue(_) => DataKind::UploadQueue,
            DataPayload::All(_) => DataKind::All,
        }
    }

    /// Number of records held, for logging. Settings count as one.
    pub fn len(&self) -> usize {
        match self {
            DataPayload::Modules(v) => v.len(),
            DataPayload::Users(v) => v.len(),
            DataPayload::Purchases(v) => v.len(),
            DataPayload::Settings(_) => 1,
            DataPayload::UploadQueue(v) => v.len(),
            DataPayload::All(s) => {
                s.modules.len() + s.users.len() + s.purchases.len() + s.upload_queue.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AppSnapshot {
    /// Extract one partition from the aggregate document.
    pub fn project(&self, kind: DataKind) -> DataPayload {
        match kind {
            DataKind::Modules => DataPayload::Modules(self.modules.clone()),
            DataKind::Users => DataPayload::Users(self.users.clone()),
            DataKind::Purchases => DataPayload::Purchases(self.purchases.clone()),
            DataKind::Settings => DataPayload::Settings(self.settings.clone()),
            DataKind::UploadQueue => DataPayload::UploadQueue(self.upload_queue.clone()),
            DataKind::All => DataPayload::All(self.clone()),
        }
    }

    pub fn into_projection(self, kind: DataKind) -> DataPayload {
        match kind {
            DataKind::Modules => DataPayload::Modules(self.modules),
            DataKind::Users => DataPayload::Users(self.users),
            DataKind::Purchases => DataPayload::Purchases(self.purchases),
            DataKind::Settings => DataPayload::Settings(self.settings),
            DataKind::UploadQueue => DataPayload::UploadQueue(self.upload_queue),
            DataKind::All => DataPayload::All(self),
        }
    }
}

/// Maps a concrete payload type back to its partition so callers can read
/// cached data with its static type.
pub trait KindData: Clone + Send + Sync + 'static {
    const KIND: DataKind;

    fn extract(payload: &DataPayload) -> Option<&Self>;
}

macro_rules! kind_data {
    ($ty:ty, $kind:ident) => {
        impl KindData for $ty {
            const KIND: DataKind = DataKind::$kind;

            fn extract(payload: &DataPayload) -> Option<&Self> {
                match payload {
                    DataPayload::$kind(data) => Some(data),
                    _ => None,
                }
            }
        }
    };
}

kind_data!(Vec<Module>, Modules);
kind_data!(Vec<User>, Users);
kind_data!(Vec<Purchase>, Purchases);
kind_data!(AppSettings, Settings);
kind_data!(Vec<UploadQueueItem>, UploadQueue);
kind_data!(AppSnapshot, All);
