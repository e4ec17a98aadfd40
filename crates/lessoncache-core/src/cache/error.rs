use std::time::Duration;

use thiserror::Error;

use super::DataKind;
use crate::api::ApiError;

/// Errors surfaced by the data cache.
///
/// `Clone` so a single in-flight result can be handed to every caller that
/// joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Failed to load {kind}: {message}")]
    Transport { kind: DataKind, message: String },

    #[error("Loading {kind} timed out after {}s", .after.as_secs())]
    Timeout { kind: DataKind, after: Duration },

    #[error("Corrupt cached data: {0}")]
    Serialization(String),

    #[error("Expected {expected} data but got {actual}")]
    KindMismatch { expected: DataKind, actual: DataKind },

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Invalid cache policy: {0}")]
    InvalidPolicy(String),
}

impl CacheError {
    /// Classify a store failure. Undecodable responses are serialization
    /// errors; everything else is a transport failure.
    pub fn from_api(kind: DataKind, err: &ApiError) -> Self {
        match err {
            ApiError::InvalidResponse(message) => CacheError::Serialization(message.clone()),
            _ => CacheError::Transport {
                kind,
                message: err.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
