use serde::{Deserialize, Serialize};

use super::{AppSettings, Module, Purchase, UploadQueueItem, User};

/// The full multi-kind document returned by the aggregate endpoint and
/// persisted in the warm cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppSnapshot {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
    #[serde(default)]
    pub settings: AppSettings,
    #[serde(rename = "uploadQueue", default)]
    pub upload_queue: Vec<UploadQueueItem>,
}
