//! Background status poller
//!
//! While the chunk loop runs, a separate task asks the service for the
//! session status every `interval` and publishes the answer as an
//! `ImportStatusRefreshed` event. It is a read-only refresh: it never writes
//! the coordinator's counters, which belong to the chunk loop alone.
//!
//! The task stops when [`StatusPoller::stop`] is awaited or when the poller
//! is dropped (e.g. the processing future was abandoned).

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use welfare_common::events::{EventBus, WelfareEvent};

use crate::services::BulkImportService;

/// Handle to a running status poll task
pub struct StatusPoller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _guard: DropGuard,
}

impl StatusPoller {
    /// Start polling `session_id`
    ///
    /// The first poll happens one full interval after spawning. Returns
    /// `None` when `interval` is zero (polling disabled).
    pub fn spawn(
        service: Arc<dyn BulkImportService>,
        session_id: String,
        interval: Duration,
        event_bus: EventBus,
    ) -> Option<Self> {
        if interval.is_zero() {
            tracing::debug!(session_id = %session_id, "Status polling disabled");
            return None;
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(
                session_id = %session_id,
                interval_ms = interval.as_millis() as u64,
                "Status poller started"
            );

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    result = service.session_status(&session_id) => result,
                };

                match result {
                    Ok(snapshot) => {
                        tracing::trace!(
                            session_id = %session_id,
                            processed = ?snapshot.processed,
                            "Status poll"
                        );
                        event_bus.emit_lossy(WelfareEvent::ImportStatusRefreshed {
                            session_id: session_id.clone(),
                            processed: snapshot.processed,
                            total: snapshot.total,
                            percent: snapshot.percent(),
                            timestamp: chrono::Utc::now(),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            "Status poll failed (continuing)"
                        );
                    }
                }
            }

            tracing::debug!(session_id = %session_id, "Status poller stopped");
        });

        Some(Self {
            _guard: cancel.clone().drop_guard(),
            cancel,
            handle,
        })
    }

    /// Cancel the task and wait for it to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Status poller panicked");
            }
        }
    }
}
