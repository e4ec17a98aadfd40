//! HTTP client for the storefront data API.
//!
//! The aggregate document lives at `/api/data`; the upload queue has its own
//! resource at `/api/upload-queue` supporting GET, POST, PUT and DELETE.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ApiError, PersistentStore};
use crate::cache::{DataKind, DataPayload};
use crate::models::{AppSnapshot, UploadQueueItem};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds. Matches the cache's store timeout.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Aggregate document endpoint
const DATA_PATH: &str = "/api/data";

/// Upload queue resource
const UPLOAD_QUEUE_PATH: &str = "/api/upload-queue";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    success: bool,
}

/// API client for the storefront backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for `base_url` (e.g. "https://lessons.example.com")
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new ApiClient with the given bearer token, sharing the
    /// connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Send a request, retrying with exponential backoff while rate limited,
    /// and decode the JSON body of the successful response.
    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .headers(self.auth_headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                let text = response.text().await?;
                debug!(%method, url = %url, bytes = text.len(), "Response received");
                return serde_json::from_str(&text).map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e))
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    // ===== Aggregate Document =====

    /// Fetch the full multi-kind document
    pub async fn fetch_all(&self) -> Result<AppSnapshot, ApiError> {
        self.send::<_, ()>(Method::GET, DATA_PATH, None).await
    }

    /// Store a snapshot of one kind (or the whole document for `All`)
    pub async fn save(&self, data: &DataPayload) -> Result<bool, ApiError> {
        let response: SuccessResponse = self.send(Method::POST, DATA_PATH, Some(data)).await?;
        Ok(response.success)
    }

    // ===== Upload Queue =====

    pub async fn list_uploads(&self) -> Result<Vec<UploadQueueItem>, ApiError> {
        self.send::<_, ()>(Method::GET, UPLOAD_QUEUE_PATH, None).await
    }

    pub async fn add_upload(&self, item: &UploadQueueItem) -> Result<UploadQueueItem, ApiError> {
        self.send(Method::POST, UPLOAD_QUEUE_PATH, Some(item)).await
    }

    pub async fn update_upload(&self, item: &UploadQueueItem) -> Result<UploadQueueItem, ApiError> {
        self.send(Method::PUT, UPLOAD_QUEUE_PATH, Some(item)).await
    }

    pub async fn delete_upload(&self, id: &str) -> Result<bool, ApiError> {
        let body = serde_json::json!({ "id": id });
        let response: SuccessResponse = self.send(Method::DELETE, UPLOAD_QUEUE_PATH, Some(&body)).await?;
        Ok(response.success)
    }
}

#[async_trait]
impl PersistentStore for ApiClient {
    async fn fetch_snapshot(&self, kind: DataKind) -> Result<DataPayload, ApiError> {
        match kind {
            DataKind::UploadQueue => Ok(DataPayload::UploadQueue(self.list_uploads().await?)),
            _ => Ok(self.fetch_all().await?.into_projection(kind)),
        }
    }

    async fn persist_snapshot(&self, kind: DataKind, data: &DataPayload) -> Result<bool, ApiError> {
        if data.kind() != kind {
            return Err(ApiError::Validation(format!(
                "Cannot save {} data as {}",
                data.kind(),
                kind
            )));
        }
        self.save(data).await
    }
}
