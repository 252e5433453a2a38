//! Import workflow type definitions
//!
//! Supporting types shared between the import coordinator and whatever
//! renders its progress.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the bulk-import state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    /// No file selected
    Idle,
    /// A spreadsheet passed the extension check
    FileSelected,
    /// Server session created, records not yet processed
    SessionReady,
    /// Chunk loop running
    Processing,
    /// All chunks processed; session released
    Completed,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::Idle => "IDLE",
            ImportPhase::FileSelected => "FILE_SELECTED",
            ImportPhase::SessionReady => "SESSION_READY",
            ImportPhase::Processing => "PROCESSING",
            ImportPhase::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

/// Which stage of the import an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Pre-flight checks (no file, bad extension, oversized file); never hits the network
    Validation,
    /// Session creation rejected or malformed
    Initialization,
    /// Chunk call failed or reported `success: false`
    Processing,
    /// Finalize failed after records were already persisted (non-fatal)
    Finalization,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}
