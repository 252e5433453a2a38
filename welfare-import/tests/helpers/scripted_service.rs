//! In-memory Bulk Import Service
//!
//! Simulates the server side of the chunk protocol: each chunk persists
//! `[startIdx, startIdx + chunkSize)` of the valid records, and the service
//! reports `done` once asked for a chunk starting at or past the end. Every
//! call is recorded for assertions, and individual chunk calls can be
//! scripted to fail.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use welfare_import::models::{ChunkRequest, ChunkResult, InitResponse, StatusSnapshot};
use welfare_import::services::{BulkImportService, FileUpload, ServiceError};

/// How a chunk call is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkBehavior {
    /// Persist the requested range
    Advance,
    /// `success: false`
    Fail,
    /// Transport-level failure
    NetworkError,
    /// Succeed without advancing `processed`
    Stall,
    /// Report fewer processed records than before
    Regress,
    /// `{"success": true, "done": true}` with no counters
    TerseDone,
}

#[derive(Debug, Default)]
struct Recorded {
    uploads: Vec<(String, &'static str, usize)>,
    chunk_requests: Vec<ChunkRequest>,
    status_calls: usize,
    finalize_calls: Vec<String>,
    processed: u64,
}

pub struct ScriptedService {
    init_response: InitResponse,
    init_error: Option<String>,
    default_behavior: ChunkBehavior,
    chunk_behaviors: HashMap<usize, ChunkBehavior>,
    finalize_fails: bool,
    status_fails: bool,
    recorded: Mutex<Recorded>,
}

impl ScriptedService {
    /// Service whose init reports `total` rows, `invalid_rows.len()` of them invalid
    pub fn new(total: u64, invalid_rows: Vec<String>) -> Self {
        let invalid = invalid_rows.len() as u64;
        Self {
            init_response: InitResponse {
                success: Some(true),
                session_id: Some("sess-test".to_string()),
                total_records: total,
                valid_records: total - invalid,
                invalid_records: invalid,
                invalid_rows,
                message: None,
            },
            init_error: None,
            default_behavior: ChunkBehavior::Advance,
            chunk_behaviors: HashMap::new(),
            finalize_fails: false,
            status_fails: false,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    /// Service with `valid` records and no validation failures
    pub fn with_valid(valid: u64) -> Self {
        Self::new(valid, Vec::new())
    }

    pub fn init_response(mut self, response: InitResponse) -> Self {
        self.init_response = response;
        self
    }

    pub fn init_error(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    /// Answer the `call`-th chunk request (0-based) with `behavior`
    pub fn chunk(mut self, call: usize, behavior: ChunkBehavior) -> Self {
        self.chunk_behaviors.insert(call, behavior);
        self
    }

    pub fn every_chunk(mut self, behavior: ChunkBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.finalize_fails = true;
        self
    }

    pub fn failing_status(mut self) -> Self {
        self.status_fails = true;
        self
    }

    pub fn valid_records(&self) -> u64 {
        self.init_response.valid_records
    }

    pub fn init_calls(&self) -> usize {
        self.recorded.lock().unwrap().uploads.len()
    }

    pub fn uploads(&self) -> Vec<(String, &'static str, usize)> {
        self.recorded.lock().unwrap().uploads.clone()
    }

    pub fn start_indices(&self) -> Vec<u64> {
        self.recorded
            .lock()
            .unwrap()
            .chunk_requests
            .iter()
            .map(|r| r.start_idx)
            .collect()
    }

    pub fn chunk_requests(&self) -> Vec<ChunkRequest> {
        self.recorded.lock().unwrap().chunk_requests.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.recorded.lock().unwrap().status_calls
    }

    pub fn finalize_calls(&self) -> Vec<String> {
        self.recorded.lock().unwrap().finalize_calls.clone()
    }

    pub fn network_calls(&self) -> usize {
        let recorded = self.recorded.lock().unwrap();
        recorded.uploads.len()
            + recorded.chunk_requests.len()
            + recorded.status_calls
            + recorded.finalize_calls.len()
    }
}

#[async_trait]
impl BulkImportService for ScriptedService {
    async fn init_session(&self, upload: FileUpload) -> Result<InitResponse, ServiceError> {
        self.recorded.lock().unwrap().uploads.push((
            upload.file_name,
            upload.mime_type,
            upload.bytes.len(),
        ));

        match &self.init_error {
            Some(message) => Err(ServiceError::ApiError(400, message.clone())),
            None => Ok(self.init_response.clone()),
        }
    }

    async fn process_chunk(&self, request: &ChunkRequest) -> Result<ChunkResult, ServiceError> {
        let mut recorded = self.recorded.lock().unwrap();
        let call = recorded.chunk_requests.len();
        recorded.chunk_requests.push(request.clone());

        let total = self.valid_records();
        let behavior = self
            .chunk_behaviors
            .get(&call)
            .copied()
            .unwrap_or(self.default_behavior);

        let processed = match behavior {
            ChunkBehavior::NetworkError => {
                return Err(ServiceError::NetworkError("connection reset".to_string()))
            }
            ChunkBehavior::Fail => {
                return Ok(ChunkResult {
                    success: false,
                    processed: Some(recorded.processed),
                    total: Some(total),
                    progress: 0.0,
                    done: false,
                    message: Some("Database write failed".to_string()),
                })
            }
            ChunkBehavior::TerseDone => {
                return Ok(ChunkResult {
                    success: true,
                    processed: None,
                    total: None,
                    progress: 0.0,
                    done: true,
                    message: None,
                })
            }
            ChunkBehavior::Advance => (request.start_idx + request.chunk_size as u64).min(total),
            ChunkBehavior::Stall => request.start_idx,
            ChunkBehavior::Regress => request.start_idx.saturating_sub(1),
        };

        let done = behavior == ChunkBehavior::Advance && request.start_idx >= total;
        recorded.processed = processed;

        Ok(ChunkResult {
            success: true,
            processed: Some(processed),
            total: Some(total),
            progress: if total == 0 {
                0.0
            } else {
                processed as f64 * 100.0 / total as f64
            },
            done,
            message: done.then(|| format!("{} records imported", processed)),
        })
    }

    async fn session_status(&self, _session_id: &str) -> Result<StatusSnapshot, ServiceError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.status_calls += 1;

        if self.status_fails {
            return Err(ServiceError::ApiError(503, "status unavailable".to_string()));
        }

        Ok(StatusSnapshot {
            processed: Some(recorded.processed),
            total: Some(self.valid_records()),
            progress: None,
            done: Some(recorded.processed >= self.valid_records()),
            message: None,
        })
    }

    async fn finalize(&self, session_id: &str) -> Result<(), ServiceError> {
        self.recorded
            .lock()
            .unwrap()
            .finalize_calls
            .push(session_id.to_string());

        if self.finalize_fails {
            return Err(ServiceError::ApiError(500, "finalize exploded".to_string()));
        }
        Ok(())
    }
}
