//! Import session coordinator
//!
//! Drives the three-phase bulk-import protocol (init → chunked processing →
//! finalize) against a [`BulkImportService`] and owns the import state
//! machine. All counters live here and are written by the chunk loop only;
//! observers follow along through the [`EventBus`].
//!
//! Chunk requests are strictly sequential: the next request is sent only
//! after the previous response arrived, with a fixed pause in between.
//! A failed chunk leaves the session in place so a later
//! [`ImportCoordinator::start_processing`] call resumes from the last
//! `processed` offset instead of starting over.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use welfare_common::events::{
    ErrorCategory, EventBus, ImportPhase, NotificationLevel, WelfareEvent,
};

use crate::config::ImportSettings;
use crate::error::{CoordinatorResult, ImportError};
use crate::models::selected_file::format_bytes;
use crate::models::{
    next_phase, ChunkRequest, ImportProgress, ImportResult, ImportSession, PhaseEvent,
    SelectedFile, StateTransition,
};
use crate::services::{BulkImportService, FileUpload, StatusPoller};

/// Client-side coordinator for one import flow at a time
pub struct ImportCoordinator {
    service: Arc<dyn BulkImportService>,
    settings: ImportSettings,
    event_bus: EventBus,
    phase: ImportPhase,
    selected_file: Option<SelectedFile>,
    session: Option<ImportSession>,
    progress: ImportProgress,
    processing_started_at: Option<DateTime<Utc>>,
    last_result: Option<ImportResult>,
    last_transition: Option<StateTransition>,
}

impl ImportCoordinator {
    pub fn new(
        service: Arc<dyn BulkImportService>,
        settings: ImportSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            service,
            settings,
            event_bus,
            phase: ImportPhase::Idle,
            selected_file: None,
            session: None,
            progress: ImportProgress::default(),
            processing_started_at: None,
            last_result: None,
            last_transition: None,
        }
    }

    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn session(&self) -> Option<&ImportSession> {
        self.session.as_ref()
    }

    pub fn progress(&self) -> &ImportProgress {
        &self.progress
    }

    pub fn last_result(&self) -> Option<&ImportResult> {
        self.last_result.as_ref()
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.last_transition.as_ref()
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Pick a spreadsheet
    ///
    /// Only the extension is checked here; the size ceiling applies when
    /// initialization is requested. Picking a file while a session is ready
    /// discards that session.
    pub async fn select_file(&mut self, path: &Path) -> CoordinatorResult<&SelectedFile> {
        // Refuse early (e.g. while processing) before touching the disk
        self.ensure_allowed(PhaseEvent::FileAccepted)?;

        let inspected = match SelectedFile::inspect(path).await {
            Ok(inspected) => inspected,
            Err(e) => {
                self.transition(PhaseEvent::FileRejected)?;
                return Err(self.report(ImportError::Io(e)));
            }
        };

        let Some(file) = inspected else {
            self.transition(PhaseEvent::FileRejected)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            return Err(self.report(ImportError::UnsupportedFileType { file_name }));
        };

        self.transition(PhaseEvent::FileAccepted)?;

        if let Some(discarded) = self.session.take() {
            tracing::info!(
                session_id = %discarded.session_id,
                "New file selected, discarding pending import session"
            );
        }
        self.progress = ImportProgress::default();
        self.processing_started_at = None;

        tracing::info!(
            file = %file.path.display(),
            size = %format_bytes(file.size_bytes),
            "Import file selected"
        );
        self.event_bus.emit_lossy(WelfareEvent::ImportFileSelected {
            file_name: file.file_name.clone(),
            size_bytes: file.size_bytes,
            timestamp: Utc::now(),
        });

        Ok(&*self.selected_file.insert(file))
    }

    /// Upload the selected file and open a server session
    ///
    /// Pre-flight failures (no file, oversized file) never reach the
    /// network. Any failure keeps the coordinator in FILE_SELECTED so the
    /// user can retry.
    pub async fn initialize(&mut self) -> CoordinatorResult<&ImportSession> {
        let Some(file) = self.selected_file.clone() else {
            return Err(self.report(ImportError::NoFileSelected));
        };
        self.ensure_allowed(PhaseEvent::SessionCreated)?;

        let bytes = match self.read_within_limit(&file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.transition(PhaseEvent::InitFailed)?;
                return Err(self.report(e));
            }
        };

        tracing::info!(file = %file.file_name, "Initializing import session");

        let upload = FileUpload {
            file_name: file.file_name.clone(),
            mime_type: file.mime_type(),
            bytes,
        };
        let outcome = match self.service.init_session(upload).await {
            Ok(response) => response.into_session().map_err(ImportError::InitFailed),
            Err(e) => Err(ImportError::InitFailed(e.to_string())),
        };

        let session = match outcome {
            Ok(session) => session,
            Err(e) => {
                self.transition(PhaseEvent::InitFailed)?;
                return Err(self.report(e));
            }
        };

        self.transition(PhaseEvent::SessionCreated)?;
        self.progress = ImportProgress::for_session(&session);
        self.processing_started_at = None;

        tracing::info!(
            session_id = %session.session_id,
            total_records = session.total_records,
            valid_records = session.valid_records,
            invalid_records = session.invalid_records,
            "Import session initialized"
        );

        self.event_bus.emit_lossy(WelfareEvent::ImportSessionInitialized {
            session_id: session.session_id.clone(),
            total_records: session.total_records,
            valid_records: session.valid_records,
            invalid_records: session.invalid_records,
            invalid_rows: session.invalid_rows.clone(),
            timestamp: Utc::now(),
        });

        if session.invalid_records > 0 {
            self.notify(
                NotificationLevel::Warning,
                Some(ErrorCategory::Validation),
                format!(
                    "{} of {} rows failed validation and will be skipped",
                    session.invalid_records, session.total_records
                ),
            );
        }

        Ok(&*self.session.insert(session))
    }

    /// Run (or resume) the chunk loop until the service reports done
    ///
    /// On failure the coordinator returns to SESSION_READY with the session
    /// and counters intact; calling this again resumes from
    /// `progress().processed`.
    ///
    /// Dropping the returned future stops the status poller; call
    /// [`abandon`](Self::abandon) afterwards to leave PROCESSING.
    pub async fn start_processing(&mut self) -> CoordinatorResult<ImportResult> {
        let Some(session) = self.session.clone() else {
            return Err(self.report(ImportError::NoSession));
        };

        self.ensure_allowed(PhaseEvent::ProcessingStarted)?;
        self.transition(PhaseEvent::ProcessingStarted)?;
        let started_at = *self.processing_started_at.get_or_insert_with(Utc::now);

        tracing::info!(
            session_id = %session.session_id,
            resume_from = self.progress.processed,
            valid_records = session.valid_records,
            chunk_size = self.settings.chunk_size,
            "Processing import session"
        );

        if self.progress.processed > 0 {
            self.notify(
                NotificationLevel::Info,
                Some(ErrorCategory::Processing),
                format!(
                    "Resuming import at {} of {} records",
                    self.progress.processed, self.progress.total
                ),
            );
        }

        let poller = StatusPoller::spawn(
            Arc::clone(&self.service),
            session.session_id.clone(),
            self.settings.status_poll_interval,
            self.event_bus.clone(),
        );

        let outcome = self.run_chunk_loop(&session).await;

        if let Some(poller) = poller {
            poller.stop().await;
        }

        match outcome {
            Ok(last_message) => self.complete(session, last_message, started_at).await,
            Err(e) => {
                self.transition(PhaseEvent::ProcessingFailed)?;
                Err(self.report(e))
            }
        }
    }

    /// Select, initialize and process `path` in one call
    pub async fn import_file(&mut self, path: &Path) -> CoordinatorResult<ImportResult> {
        self.select_file(path).await?;
        self.initialize().await?;
        self.start_processing().await
    }

    /// Leave PROCESSING after the processing future was dropped
    ///
    /// Session and counters are kept so processing can be resumed. Does
    /// nothing in any other phase.
    pub fn abandon(&mut self) -> CoordinatorResult<()> {
        if self.phase != ImportPhase::Processing {
            return Ok(());
        }

        self.transition(PhaseEvent::ProcessingAbandoned)?;
        tracing::warn!(
            processed = self.progress.processed,
            total = self.progress.total,
            "Import processing interrupted"
        );
        self.notify(
            NotificationLevel::Warning,
            Some(ErrorCategory::Processing),
            format!(
                "Import interrupted after {} of {} records; start again to resume",
                self.progress.processed, self.progress.total
            ),
        );
        Ok(())
    }

    /// Return to IDLE, dropping file, session and counters
    ///
    /// Nothing is sent to the service; an abandoned session is left for the
    /// server to expire.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(session_id = %session.session_id, "Import reset, session abandoned");
        }
        self.selected_file = None;
        self.progress = ImportProgress::default();
        self.processing_started_at = None;
        self.last_result = None;

        // Reset is valid from every phase
        if let Err(e) = self.transition(PhaseEvent::Reset) {
            tracing::error!(error = %e, "Reset transition rejected");
        }
    }

    async fn run_chunk_loop(&mut self, session: &ImportSession) -> CoordinatorResult<Option<String>> {
        let mut start_idx = self.progress.processed;
        let mut stalled = 0u32;

        loop {
            let request = ChunkRequest {
                session_id: session.session_id.clone(),
                start_idx,
                chunk_size: self.settings.chunk_size,
            };

            let chunk = self
                .service
                .process_chunk(&request)
                .await
                .map_err(|e| ImportError::ChunkFailed {
                    processed: self.progress.processed,
                    message: e.to_string(),
                })?;

            if !chunk.success {
                return Err(ImportError::ChunkFailed {
                    processed: self.progress.processed,
                    message: chunk
                        .message
                        .unwrap_or_else(|| "Service reported a failed chunk".to_string()),
                });
            }

            let processed = chunk.processed_or(self.progress.processed);
            let total = chunk.total_or(self.progress.total);

            if processed < self.progress.processed {
                return Err(ImportError::ProtocolViolation(format!(
                    "processed count went backwards from {} to {}",
                    self.progress.processed, processed
                )));
            }
            if processed > total {
                return Err(ImportError::ProtocolViolation(format!(
                    "processed count {} exceeds total {}",
                    processed, total
                )));
            }

            let advanced = processed > start_idx;
            self.progress.apply_chunk(&chunk);

            tracing::debug!(
                session_id = %session.session_id,
                start_idx,
                processed,
                total,
                percent = self.progress.percent,
                done = chunk.done,
                "Chunk processed"
            );

            self.event_bus.emit_lossy(WelfareEvent::ImportChunkProcessed {
                session_id: session.session_id.clone(),
                start_idx,
                processed: self.progress.processed,
                total: self.progress.total,
                percent: self.progress.percent,
                timestamp: Utc::now(),
            });

            if chunk.done {
                return Ok(chunk.message);
            }

            if advanced {
                stalled = 0;
            } else {
                stalled += 1;
                tracing::warn!(
                    session_id = %session.session_id,
                    start_idx,
                    stalled,
                    "Chunk did not advance processed count"
                );
                if stalled >= self.settings.max_stalled_chunks {
                    return Err(ImportError::Stalled {
                        processed: self.progress.processed,
                        attempts: stalled,
                    });
                }
            }

            start_idx = processed;

            if !self.settings.inter_chunk_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_chunk_delay).await;
            }
        }
    }

    /// Final status, finalize, terminal result
    ///
    /// Finalize failures are reported as warnings only: every record was
    /// already persisted by the chunk phase.
    async fn complete(
        &mut self,
        session: ImportSession,
        last_message: Option<String>,
        started_at: DateTime<Utc>,
    ) -> CoordinatorResult<ImportResult> {
        let mut message = last_message;

        match self.service.session_status(&session.session_id).await {
            Ok(status) => {
                if message.is_none() {
                    message = status.message;
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session.session_id,
                    error = %e,
                    "Final status check failed (non-fatal)"
                );
            }
        }

        let finalized = match self.service.finalize(&session.session_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.session_id,
                    error = %e,
                    "Finalize failed after all records were processed"
                );
                self.notify(
                    NotificationLevel::Warning,
                    Some(ErrorCategory::Finalization),
                    format!("Records were imported but the session could not be finalized: {}", e),
                );
                false
            }
        };

        let result = ImportResult::compose(&session, &self.progress, message, finalized, started_at);

        self.transition(PhaseEvent::ImportFinished)?;
        self.session = None;
        self.selected_file = None;
        self.processing_started_at = None;

        tracing::info!(
            session_id = %result.session_id,
            success_count = result.success_count,
            error_count = result.error_count,
            chunks = result.chunks_processed,
            duration_seconds = result.duration_seconds,
            "Import completed"
        );

        self.event_bus.emit_lossy(WelfareEvent::ImportCompleted {
            session_id: result.session_id.clone(),
            success_count: result.success_count,
            error_count: result.error_count,
            finalized: result.finalized,
            message: result.message.clone(),
            timestamp: Utc::now(),
        });
        self.notify(NotificationLevel::Success, None, result.message.clone());

        self.last_result = Some(result.clone());
        Ok(result)
    }

    /// Read the file for upload, enforcing the size ceiling at read time
    ///
    /// The file may have changed since it was picked, so it is stat'ed again
    /// before reading and the bytes actually read are checked too.
    async fn read_within_limit(&self, file: &SelectedFile) -> CoordinatorResult<Vec<u8>> {
        let limit_bytes = self.settings.max_file_size_bytes;

        let size_bytes = tokio::fs::metadata(&file.path).await?.len();
        if size_bytes > limit_bytes {
            return Err(ImportError::FileTooLarge {
                size_bytes,
                limit_bytes,
            });
        }

        let bytes = tokio::fs::read(&file.path).await?;
        if bytes.len() as u64 > limit_bytes {
            return Err(ImportError::FileTooLarge {
                size_bytes: bytes.len() as u64,
                limit_bytes,
            });
        }

        Ok(bytes)
    }

    fn transition(&mut self, event: PhaseEvent) -> CoordinatorResult<()> {
        let new_phase = next_phase(self.phase, event)?;
        let transition = StateTransition::new(self.phase, new_phase, event);

        if transition.is_change() {
            tracing::debug!(from = %self.phase, to = %new_phase, event = ?event, "Import phase changed");
            self.event_bus.emit_lossy(WelfareEvent::ImportPhaseChanged {
                old_phase: self.phase,
                new_phase,
                timestamp: transition.transitioned_at,
            });
        }

        self.phase = new_phase;
        self.last_transition = Some(transition);
        Ok(())
    }

    /// Fail with a reported `InvalidState` if `event` is not allowed now
    fn ensure_allowed(&self, event: PhaseEvent) -> CoordinatorResult<()> {
        next_phase(self.phase, event)
            .map(|_| ())
            .map_err(|e| self.report(e.into()))
    }

    /// Log and notify an error, handing it back for returning
    fn report(&self, error: ImportError) -> ImportError {
        let category = error.category();
        if error.is_preflight() {
            tracing::warn!(error = %error, "Import request rejected");
        } else {
            tracing::error!(error = %error, category = ?category, "Import step failed");
        }
        self.notify(NotificationLevel::Error, Some(category), error.to_string());
        error
    }

    fn notify(&self, level: NotificationLevel, category: Option<ErrorCategory>, message: String) {
        self.event_bus
            .emit_lossy(WelfareEvent::notification(level, category, message));
    }
}
