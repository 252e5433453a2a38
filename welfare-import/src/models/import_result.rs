//! Terminal import result
//!
//! Composed client-side once the final chunk reports done. Display only: the
//! server remains the source of truth for what was persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ImportProgress, ImportSession};

/// Import completion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub session_id: String,

    /// Records persisted by the chunk phase
    pub success_count: u64,

    /// Rows rejected during initialization
    pub error_count: u64,

    pub valid_records: u64,
    pub invalid_records: u64,
    pub invalid_rows: Vec<String>,

    pub message: String,

    /// Successful chunk responses over the whole session (all runs)
    pub chunks_processed: u32,

    /// false when the finalize call failed; records are persisted either way
    pub finalized: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: u64,
}

impl ImportResult {
    /// Build the terminal result from session metadata and final counters
    ///
    /// `server_message` is the last message the service sent (final chunk or
    /// final status); a summary is generated when there is none.
    pub fn compose(
        session: &ImportSession,
        progress: &ImportProgress,
        server_message: Option<String>,
        finalized: bool,
        started_at: DateTime<Utc>,
    ) -> Self {
        let finished_at = Utc::now();
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "Import completed: {} of {} records imported, {} rejected",
                    progress.processed, session.total_records, session.invalid_records
                )
            });

        Self {
            session_id: session.session_id.clone(),
            success_count: progress.processed,
            error_count: session.invalid_records,
            valid_records: session.valid_records,
            invalid_records: session.invalid_records,
            invalid_rows: session.invalid_rows.clone(),
            message,
            chunks_processed: progress.chunks_sent,
            finalized,
            started_at,
            finished_at,
            duration_seconds: (finished_at - started_at).num_seconds().max(0) as u64,
        }
    }

    /// True when every valid record was persisted and nothing was rejected
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.success_count == self.valid_records
    }
}
