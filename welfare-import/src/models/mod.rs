//! Data models for welfare-import
//!
//! - Import session and chunk protocol payloads
//! - Import state machine (pure transitions)
//! - Selected file pre-flight validation
//! - Terminal import result

pub mod import_result;
pub mod import_session;
pub mod import_state;
pub mod selected_file;

pub use import_result::ImportResult;
pub use import_session::{
    progress_percent, ChunkRequest, ChunkResult, FinalizeRequest, ImportProgress, ImportSession,
    InitResponse, StatusSnapshot,
};
pub use import_state::{next_phase, InvalidTransition, PhaseEvent, StateTransition};
pub use selected_file::SelectedFile;
