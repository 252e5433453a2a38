//! Terminal progress rendering
//!
//! Subscribes to the [`EventBus`] and prints one line per import event to
//! stdout. Logs go to stderr, so the two streams can be redirected apart.

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use welfare_common::events::{EventBus, NotificationLevel, WelfareEvent};

/// Human-readable line for an event, `None` for events not shown
pub fn render_event(event: &WelfareEvent) -> Option<String> {
    match event {
        WelfareEvent::ImportPhaseChanged { .. } => None,
        WelfareEvent::ImportFileSelected {
            file_name,
            size_bytes,
            ..
        } => Some(format!(
            "Selected {} ({})",
            file_name,
            crate::models::selected_file::format_bytes(*size_bytes)
        )),
        WelfareEvent::ImportSessionInitialized {
            session_id,
            total_records,
            valid_records,
            invalid_records,
            invalid_rows,
            ..
        } => {
            let mut text = format!(
                "Session {}: {} records, {} valid, {} invalid",
                session_id, total_records, valid_records, invalid_records
            );
            for row in invalid_rows {
                text.push_str("\n  ! ");
                text.push_str(row);
            }
            Some(text)
        }
        WelfareEvent::ImportChunkProcessed {
            processed,
            total,
            percent,
            ..
        } => Some(format!(
            "[{}] {:>3}%  {}/{}",
            progress_bar(*percent, 30),
            percent,
            processed,
            total
        )),
        WelfareEvent::ImportStatusRefreshed {
            processed: Some(processed),
            total: Some(total),
            ..
        } => Some(format!("  service reports {}/{}", processed, total)),
        WelfareEvent::ImportStatusRefreshed { .. } => None,
        WelfareEvent::ImportCompleted {
            success_count,
            error_count,
            finalized,
            message,
            ..
        } => {
            let mut text = format!(
                "Done: {} imported, {} rejected. {}",
                success_count, error_count, message
            );
            if !finalized {
                text.push_str(" (session not finalized)");
            }
            Some(text)
        }
        WelfareEvent::Notification { level, message, .. } => {
            let prefix = match level {
                NotificationLevel::Info => "info",
                NotificationLevel::Success => return None,
                NotificationLevel::Warning => "warning",
                NotificationLevel::Error => "error",
            };
            Some(format!("{}: {}", prefix, message))
        }
    }
}

/// `percent` as a fixed-width bar of `width` cells
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

/// Print events until `cancel` fires or the bus closes
///
/// Events already queued when `cancel` fires are still printed.
pub fn spawn_renderer(event_bus: &EventBus, cancel: CancellationToken) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Ok(event) => print_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Progress display fell behind");
                    }
                    Err(RecvError::Closed) => return,
                },
            }
        }

        loop {
            match rx.try_recv() {
                Ok(event) => print_event(&event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &WelfareEvent) {
    if let Some(line) = render_event(event) {
        println!("{}", line);
    }
}
