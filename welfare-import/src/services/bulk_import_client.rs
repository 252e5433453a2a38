//! Bulk Import Service client
//!
//! Session-oriented REST surface consumed by the import coordinator:
//! - `POST /import/init` (multipart upload) → session + validation partition
//! - `POST /import/chunk` → persist the next batch of valid records
//! - `GET /import/status/{sessionId}` → progress snapshot
//! - `POST /import/finalize` → close the session server-side
//!
//! The coordinator talks to the [`BulkImportService`] trait so it can be
//! driven by a scripted implementation in tests.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

use crate::models::{ChunkRequest, ChunkResult, FinalizeRequest, InitResponse, StatusSnapshot};

const USER_AGENT: &str = concat!("welfare-import/", env!("CARGO_PKG_VERSION"));

/// Multipart field carrying the spreadsheet
const UPLOAD_FIELD: &str = "file";

/// Bulk Import Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Base URL could not be used to build endpoint URLs
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Service returned a non-success status
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Failed to parse response JSON
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Spreadsheet bytes ready for upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Remote bulk-import protocol
#[async_trait]
pub trait BulkImportService: Send + Sync {
    /// Upload the spreadsheet and open a session
    async fn init_session(&self, upload: FileUpload) -> Result<InitResponse, ServiceError>;

    /// Persist the records in `[start_idx, start_idx + chunk_size)`
    async fn process_chunk(&self, request: &ChunkRequest) -> Result<ChunkResult, ServiceError>;

    /// Current progress of a session
    async fn session_status(&self, session_id: &str) -> Result<StatusSnapshot, ServiceError>;

    /// Close the session; the response body is ignored
    async fn finalize(&self, session_id: &str) -> Result<(), ServiceError>;
}

/// HTTP implementation of [`BulkImportService`]
#[derive(Clone)]
pub struct HttpBulkImportClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpBulkImportClient {
    /// Create a client for the service rooted at `base_url`
    ///
    /// `timeout` of `None` keeps the transport default (no per-request timeout).
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ServiceError::InvalidUrl(format!(
                "{}: expected an http(s) URL",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/import/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("import")
            .extend(segments);
        Ok(url)
    }

    /// Map a response to `T`, turning non-2xx into [`ServiceError::ApiError`]
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ApiError(status.as_u16(), error_message(&body)));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl BulkImportService for HttpBulkImportClient {
    async fn init_session(&self, upload: FileUpload) -> Result<InitResponse, ServiceError> {
        let url = self.endpoint(&["init"])?;
        let size = upload.bytes.len();

        tracing::debug!(url = %url, file = %upload.file_name, size, "Uploading import file");

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload.mime_type)
            .map_err(|e| ServiceError::ParseError(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http_client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        Self::read_json(response).await
    }

    async fn process_chunk(&self, request: &ChunkRequest) -> Result<ChunkResult, ServiceError> {
        let url = self.endpoint(&["chunk"])?;

        tracing::debug!(
            session_id = %request.session_id,
            start_idx = request.start_idx,
            chunk_size = request.chunk_size,
            "Requesting chunk"
        );

        let response = self
            .http_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        Self::read_json(response).await
    }

    async fn session_status(&self, session_id: &str) -> Result<StatusSnapshot, ServiceError> {
        let url = self.endpoint(&["status", session_id])?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        Self::read_json(response).await
    }

    async fn finalize(&self, session_id: &str) -> Result<(), ServiceError> {
        let url = self.endpoint(&["finalize"])?;
        let body = FinalizeRequest {
            session_id: session_id.to_string(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::ApiError(status.as_u16(), error_message(&text)));
        }

        Ok(())
    }
}

/// Pull a readable message out of an error body
///
/// Accepts `{"message": ..}`, `{"error": ..}`, `{"detail": ..}` or falls back
/// to the raw text.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.trim().to_string()
}
