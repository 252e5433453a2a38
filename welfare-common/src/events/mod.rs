//! Event types for the welfare event system
//!
//! Provides shared event definitions and the EventBus used to publish import
//! progress to any number of read-only observers (CLI renderer, tests).

mod import_types;

pub use import_types::{ErrorCategory, ImportPhase, NotificationLevel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Welfare event types
///
/// Events are broadcast via EventBus and serialize to tagged JSON, so they can
/// be forwarded to a UI unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WelfareEvent {
    /// Import state machine moved to a new phase
    ImportPhaseChanged {
        old_phase: ImportPhase,
        new_phase: ImportPhase,
        timestamp: DateTime<Utc>,
    },

    /// A spreadsheet passed the extension check
    ImportFileSelected {
        file_name: String,
        size_bytes: u64,
        timestamp: DateTime<Utc>,
    },

    /// Server accepted the upload and partitioned rows into valid/invalid
    ImportSessionInitialized {
        session_id: String,
        total_records: u64,
        valid_records: u64,
        invalid_records: u64,
        /// Human-readable messages for each rejected row
        invalid_rows: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// One chunk request completed successfully
    ///
    /// Emitted only by the chunk loop; these counters are authoritative.
    ImportChunkProcessed {
        session_id: String,
        start_idx: u64,
        processed: u64,
        total: u64,
        /// floor(processed * 100 / total)
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// Status poll result (best-effort, display only)
    ImportStatusRefreshed {
        session_id: String,
        processed: Option<u64>,
        total: Option<u64>,
        percent: Option<u8>,
        timestamp: DateTime<Utc>,
    },

    /// Final chunk reported done and the terminal result was composed
    ImportCompleted {
        session_id: String,
        success_count: u64,
        error_count: u64,
        /// false when the finalize call failed
        finalized: bool,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Transient user-facing notification (toast)
    Notification {
        level: NotificationLevel,
        category: Option<ErrorCategory>,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WelfareEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &str {
        match self {
            WelfareEvent::ImportPhaseChanged { .. } => "ImportPhaseChanged",
            WelfareEvent::ImportFileSelected { .. } => "ImportFileSelected",
            WelfareEvent::ImportSessionInitialized { .. } => "ImportSessionInitialized",
            WelfareEvent::ImportChunkProcessed { .. } => "ImportChunkProcessed",
            WelfareEvent::ImportStatusRefreshed { .. } => "ImportStatusRefreshed",
            WelfareEvent::ImportCompleted { .. } => "ImportCompleted",
            WelfareEvent::Notification { .. } => "Notification",
        }
    }

    /// Build a notification stamped with the current time
    pub fn notification(
        level: NotificationLevel,
        category: Option<ErrorCategory>,
        message: impl Into<String>,
    ) -> Self {
        WelfareEvent::Notification {
            level,
            category,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast bus for WelfareEvent
///
/// Cloning is cheap; all clones publish into the same channel.
///
/// # Examples
///
/// ```
/// use welfare_common::events::{EventBus, NotificationLevel, WelfareEvent};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(WelfareEvent::notification(NotificationLevel::Info, None, "hello"));
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WelfareEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WelfareEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WelfareEvent,
    ) -> Result<usize, broadcast::error::SendError<WelfareEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: WelfareEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
