//! Import session and chunk protocol payloads
//!
//! Wire types use the service's camelCase JSON field names. The session is
//! created by the server and never mutated client-side; only the
//! coordinator-owned [`ImportProgress`] advances.

use serde::{Deserialize, Serialize};

/// Server-side import session, as reported by `POST /import/init`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSession {
    /// Opaque session token
    pub session_id: String,
    /// Rows found in the spreadsheet
    pub total_records: u64,
    /// Rows that passed validation; only these are processed
    pub valid_records: u64,
    /// Rows that failed validation
    pub invalid_records: u64,
    /// One human-readable message per rejected row
    pub invalid_rows: Vec<String>,
}

/// Raw `POST /import/init` response
///
/// Every field is optional on the wire so a malformed or error response can
/// still be reported with whatever message the server sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub valid_records: u64,
    #[serde(default)]
    pub invalid_records: u64,
    #[serde(default)]
    pub invalid_rows: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl InitResponse {
    /// Convert into a session, or return the reason initialization failed
    pub fn into_session(self) -> Result<ImportSession, String> {
        if self.success == Some(false) {
            return Err(self
                .message
                .unwrap_or_else(|| "Service rejected the import file".to_string()));
        }

        match self.session_id {
            Some(session_id) if !session_id.trim().is_empty() => Ok(ImportSession {
                session_id,
                total_records: self.total_records,
                valid_records: self.valid_records,
                invalid_records: self.invalid_records,
                invalid_rows: self.invalid_rows,
            }),
            _ => Err(self
                .message
                .unwrap_or_else(|| "Service response did not include a session id".to_string())),
        }
    }
}

/// `POST /import/chunk` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRequest {
    pub session_id: String,
    pub start_idx: u64,
    pub chunk_size: u32,
}

/// `POST /import/chunk` response
///
/// `processed` and `total` may be left out of terse responses (typically the
/// final `{"success": true, "done": true}`); a missing value means unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    pub success: bool,
    /// Records persisted so far in this session (not just this chunk)
    #[serde(default)]
    pub processed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    /// Server-computed percentage; display uses [`progress_percent`] instead
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChunkResult {
    /// Reported `processed`, or `previous` when omitted
    pub fn processed_or(&self, previous: u64) -> u64 {
        self.processed.unwrap_or(previous)
    }

    /// Reported `total`, or `previous` when omitted
    pub fn total_or(&self, previous: u64) -> u64 {
        self.total.unwrap_or(previous)
    }
}

/// `GET /import/status/{sessionId}` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    #[serde(default)]
    pub processed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusSnapshot {
    /// Percent computed with the same floor rule as the chunk loop
    pub fn percent(&self) -> Option<u8> {
        match (self.processed, self.total) {
            (Some(processed), Some(total)) => Some(progress_percent(processed, total)),
            _ => self
                .progress
                .map(|p| p.clamp(0.0, 100.0).floor() as u8),
        }
    }
}

/// `POST /import/finalize` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub session_id: String,
}

/// Progress percentage: floor(processed * 100 / total), clamped to 0..=100
///
/// Returns 0 for an empty session.
pub fn progress_percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let clamped = processed.min(total) as u128;
    (clamped * 100 / total as u128) as u8
}

/// Coordinator-owned progress counters
///
/// Written only by the chunk loop; the status poller publishes its own
/// snapshots without touching these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    /// Resume offset: `startIdx` of the next chunk request
    pub processed: u64,
    pub total: u64,
    pub percent: u8,
    /// Successful chunk responses in this session
    pub chunks_sent: u32,
}

impl ImportProgress {
    /// Fresh counters for a newly initialized session
    pub fn for_session(session: &ImportSession) -> Self {
        Self {
            processed: 0,
            total: session.valid_records,
            percent: 0,
            chunks_sent: 0,
        }
    }

    /// Record a successful chunk response
    pub fn apply_chunk(&mut self, chunk: &ChunkResult) {
        self.processed = chunk.processed_or(self.processed);
        self.total = chunk.total_or(self.total);
        self.percent = progress_percent(self.processed, self.total);
        self.chunks_sent += 1;
    }
}
