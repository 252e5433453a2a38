//! Error types for welfare-import
//!
//! Four stages can fail: pre-flight validation, session initialization,
//! chunk processing and finalization. Finalization failures are reported but
//! never returned as errors (records were already persisted), so they have no
//! variant here.

use thiserror::Error;
use welfare_common::events::{ErrorCategory, ImportPhase};

use crate::models::InvalidTransition;

/// Import coordinator error
#[derive(Debug, Error)]
pub enum ImportError {
    /// Init or import requested before a file was picked
    #[error("No file selected. Choose an .xlsx or .xls file first")]
    NoFileSelected,

    /// File extension not accepted
    #[error("Unsupported file type: {file_name}. Only .xlsx and .xls files are accepted")]
    UnsupportedFileType { file_name: String },

    /// File larger than the upload ceiling
    #[error("File is too large: {size_bytes} bytes (limit {limit_bytes} bytes)")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    /// File could not be read from disk
    #[error("Cannot read file: {0}")]
    Io(#[from] std::io::Error),

    /// Service did not create a session
    #[error("Import initialization failed: {0}")]
    InitFailed(String),

    /// Processing requested without an initialized session
    #[error("No import session. Initialize the import first")]
    NoSession,

    /// Chunk call failed or returned `success: false`
    #[error("Processing stopped after {processed} records: {message}")]
    ChunkFailed { processed: u64, message: String },

    /// Chunk response broke the protocol (counters going backwards, past total)
    #[error("Protocol violation from import service: {0}")]
    ProtocolViolation(String),

    /// Service kept answering without advancing
    #[error("Import stalled at {processed} records after {attempts} chunk requests without progress")]
    Stalled { processed: u64, attempts: u32 },

    /// Operation not allowed in the current phase
    #[error("Invalid import state: {0}")]
    InvalidState(#[from] InvalidTransition),
}

impl ImportError {
    /// Stage of the import this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::NoFileSelected
            | ImportError::UnsupportedFileType { .. }
            | ImportError::FileTooLarge { .. }
            | ImportError::Io(_) => ErrorCategory::Validation,
            ImportError::InitFailed(_) => ErrorCategory::Initialization,
            ImportError::NoSession
            | ImportError::ChunkFailed { .. }
            | ImportError::ProtocolViolation(_)
            | ImportError::Stalled { .. } => ErrorCategory::Processing,
            ImportError::InvalidState(t) => match t.phase {
                ImportPhase::Idle | ImportPhase::FileSelected => ErrorCategory::Initialization,
                _ => ErrorCategory::Processing,
            },
        }
    }

    /// True for errors caught before any network call
    pub fn is_preflight(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, ImportError>;
