use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Pending,
    Uploading,
    Processing,
    Complete,
    Failed,
}

impl UploadStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, UploadStatus::Complete | UploadStatus::Failed)
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Pending => write!(f, "Pending"),
            UploadStatus::Uploading => write!(f, "Uploading"),
            UploadStatus::Processing => write!(f, "Processing"),
            UploadStatus::Complete => write!(f, "Complete"),
            UploadStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// A media file queued for upload and processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadQueueItem {
    pub id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "moduleId", default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub status: UploadStatus,
    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UploadQueueItem {
    pub fn new(id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            module_id: None,
            status: UploadStatus::Pending,
            progress: 0,
            error: None,
            updated_at: None,
        }
    }
}
