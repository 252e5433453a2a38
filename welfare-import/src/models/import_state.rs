//! Import workflow state machine
//!
//! IDLE → FILE_SELECTED → SESSION_READY → PROCESSING → COMPLETED
//!
//! Transitions are a pure function of (phase, event). The coordinator
//! performs side effects, then asks [`next_phase`] where it is allowed to go.
//! Failures fall back to the last stable phase: FILE_SELECTED for
//! initialization errors, SESSION_READY for processing errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use welfare_common::events::ImportPhase;

/// Inputs to the import state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseEvent {
    /// A file with an accepted extension was picked
    FileAccepted,
    /// A file was picked but failed the extension check
    FileRejected,
    /// Init returned a session id
    SessionCreated,
    /// Init failed (validation, service error, missing session id)
    InitFailed,
    /// User started (or resumed) chunk processing
    ProcessingStarted,
    /// A chunk call failed; session retained
    ProcessingFailed,
    /// Caller walked away from a running chunk loop; session retained
    ProcessingAbandoned,
    /// Final chunk reported done
    ImportFinished,
    /// User reset the flow
    Reset,
}

/// Event not allowed in the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{event:?} is not allowed while {phase}")]
pub struct InvalidTransition {
    pub phase: ImportPhase,
    pub event: PhaseEvent,
}

/// Compute the phase that follows `event` in `phase`
pub fn next_phase(phase: ImportPhase, event: PhaseEvent) -> Result<ImportPhase, InvalidTransition> {
    use ImportPhase::*;
    use PhaseEvent::*;

    let next = match (phase, event) {
        (_, Reset) => Idle,

        (Idle, FileAccepted) => FileSelected,
        (Idle, FileRejected) => Idle,

        (FileSelected, FileAccepted) => FileSelected,
        (FileSelected, FileRejected) => FileSelected,
        (FileSelected, SessionCreated) => SessionReady,
        (FileSelected, InitFailed) => FileSelected,

        // Picking another file discards the pending session
        (SessionReady, FileAccepted) => FileSelected,
        (SessionReady, FileRejected) => SessionReady,
        (SessionReady, ProcessingStarted) => Processing,

        (Processing, ProcessingFailed) => SessionReady,
        (Processing, ProcessingAbandoned) => SessionReady,
        (Processing, ImportFinished) => Completed,

        (Completed, FileAccepted) => FileSelected,
        (Completed, FileRejected) => Completed,

        _ => return Err(InvalidTransition { phase, event }),
    };

    Ok(next)
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub old_phase: ImportPhase,
    pub new_phase: ImportPhase,
    pub event: PhaseEvent,
    pub transitioned_at: DateTime<Utc>,
}

impl StateTransition {
    pub fn new(old_phase: ImportPhase, new_phase: ImportPhase, event: PhaseEvent) -> Self {
        Self {
            old_phase,
            new_phase,
            event,
            transitioned_at: Utc::now(),
        }
    }

    pub fn is_change(&self) -> bool {
        self.old_phase != self.new_phase
    }
}
