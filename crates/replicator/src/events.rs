//! Event sinks shipped with the replicator

use std::sync::{Arc, Mutex};

use contracts::{EventSink, SaveEvent};
use tracing::{debug, info, warn};

/// Forwards save events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &SaveEvent) {
        match event {
            SaveEvent::StateChanged { upload, state } => {
                debug!(upload = %upload, state = state.as_str(), "Save state changed");
            }
            SaveEvent::DestinationDetached {
                upload,
                destination,
                bytes_delivered,
            } => {
                warn!(
                    upload = %upload,
                    destination = %destination,
                    bytes_delivered,
                    "Destination detached"
                );
            }
            SaveEvent::SourceFailed { upload, message } => {
                warn!(upload = %upload, error = %message, "Source read failed");
            }
            SaveEvent::DestinationFinished {
                upload,
                destination,
                bytes,
                error: None,
            } => {
                debug!(upload = %upload, destination = %destination, bytes, "Destination finished");
            }
            SaveEvent::DestinationFinished {
                upload,
                destination,
                error: Some(error),
                ..
            } => {
                warn!(upload = %upload, destination = %destination, error = %error, "Destination failed");
            }
            SaveEvent::SaveCompleted {
                upload,
                bytes,
                failures,
                peak_buffered_bytes,
                elapsed,
            } => {
                info!(
                    upload = %upload,
                    bytes,
                    failures,
                    peak_buffered_bytes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Save completed"
                );
            }
        }
    }
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SaveEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far
    pub fn events(&self) -> Vec<SaveEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &SaveEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Delivers each event to several sinks in order
#[derive(Default, Clone)]
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for CompositeEventSink {
    fn emit(&self, event: &SaveEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
