//! Save events - structured notifications emitted during one save
//!
//! The replicator receives an `EventSink` at construction instead of
//! writing to a process-wide logger.

use std::time::Duration;

/// Lifecycle state of one save call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Call received
    Idle,
    /// Source chunks are being relayed to destinations
    Splitting,
    /// Source finished, waiting for every branch to report
    AwaitingTasks,
    /// Outcome fixed (terminal)
    Aggregated,
}

impl SaveState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Splitting => "splitting",
            Self::AwaitingTasks => "awaiting_tasks",
            Self::Aggregated => "aggregated",
        }
    }
}

/// Event emitted by the replicator
#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    /// The save moved to a new state
    StateChanged { upload: String, state: SaveState },

    /// A destination stopped accepting chunks before the end of data
    DestinationDetached {
        upload: String,
        destination: String,
        bytes_delivered: u64,
    },

    /// Reading the source failed; remaining destinations were aborted
    SourceFailed { upload: String, message: String },

    /// A destination task reported its outcome
    DestinationFinished {
        upload: String,
        destination: String,
        bytes: u64,
        error: Option<String>,
    },

    /// All branches reported
    SaveCompleted {
        upload: String,
        bytes: u64,
        failures: usize,
        peak_buffered_bytes: usize,
        elapsed: Duration,
    },
}

impl SaveEvent {
    /// Upload name the event belongs to
    pub fn upload(&self) -> &str {
        match self {
            Self::StateChanged { upload, .. }
            | Self::DestinationDetached { upload, .. }
            | Self::SourceFailed { upload, .. }
            | Self::DestinationFinished { upload, .. }
            | Self::SaveCompleted { upload, .. } => upload,
        }
    }
}

/// Receiver of save events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SaveEvent);
}

/// Event sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &SaveEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_name_is_reachable_from_every_event() {
        let event = SaveEvent::DestinationDetached {
            upload: "book.epub".into(),
            destination: "c".into(),
            bytes_delivered: 5,
        };
        assert_eq!(event.upload(), "book.epub");
        assert_eq!(SaveState::AwaitingTasks.as_str(), "awaiting_tasks");
    }
}
