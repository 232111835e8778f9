//! Fan-out coordinator - one task per destination plus one drain task
//!
//! Every task reports exactly once through its `JoinHandle`; the outcome is
//! only built after all of them have been awaited.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncRead;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, instrument};

use contracts::{ContractError, Destination, EventSink, SaveEvent, SaveState};

use crate::error::{AggregateError, BranchFailure};
use crate::metrics::{MetricsSnapshot, SaveMetrics};
use crate::splitter::{BranchProgress, DrainReport, Splitter, SplitterConfig};

/// Per-destination result of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationReport {
    pub destination: String,
    pub bytes: u64,
}

/// Result of a save where every branch succeeded
#[derive(Debug, Clone)]
pub struct SaveReport {
    /// Upload name
    pub name: String,
    /// Bytes read from the source
    pub bytes: u64,
    /// Destinations in construction order
    pub destinations: Vec<DestinationReport>,
    /// Wall time of the save
    pub elapsed: Duration,
    /// Splitter counters
    pub metrics: MetricsSnapshot,
}

struct Branch {
    destination: String,
    progress: BranchProgress,
    handle: JoinHandle<Result<u64, ContractError>>,
}

/// Replicate `source` to every destination and aggregate the outcome
#[instrument(
    name = "fan_out",
    skip(destinations, source, config, events),
    fields(destinations = destinations.len())
)]
pub(crate) async fn fan_out<D, R>(
    destinations: &[Arc<D>],
    name: &str,
    source: R,
    config: SplitterConfig,
    events: &Arc<dyn EventSink>,
) -> Result<SaveReport, AggregateError>
where
    D: Destination + Send + Sync + 'static,
    R: AsyncRead + Send + Unpin + 'static,
{
    let started = Instant::now();
    let metrics = Arc::new(SaveMetrics::new());
    let mut splitter = Splitter::new(name, config, Arc::clone(&metrics), Arc::clone(events));

    let branches: Vec<Branch> = destinations
        .iter()
        .map(|destination| {
            let (stream, progress) = splitter.branch(destination.name());
            let task_destination = Arc::clone(destination);
            let upload = name.to_owned();
            let handle =
                tokio::spawn(async move { task_destination.save(&upload, stream).await });
            Branch {
                destination: destination.name().to_owned(),
                progress,
                handle,
            }
        })
        .collect();

    let drain = tokio::spawn(splitter.run(source));
    emit_state(events, name, SaveState::Splitting);

    let drain = drain.await;
    emit_state(events, name, SaveState::AwaitingTasks);

    let mut failures = Vec::new();
    let drain = match drain {
        Ok(report) => {
            if let Some(ref e) = report.error {
                failures.push(BranchFailure::source_read(e.to_string()));
            }
            Some(report)
        }
        Err(e) => {
            failures.push(BranchFailure::source_read(join_message("drain", e)));
            None
        }
    };

    let mut reports = Vec::with_capacity(branches.len());
    for branch in branches {
        let outcome = branch.handle.await;
        match settle(&branch.destination, &branch.progress, drain.as_ref(), outcome) {
            Ok(bytes) => {
                events.emit(&SaveEvent::DestinationFinished {
                    upload: name.to_owned(),
                    destination: branch.destination.clone(),
                    bytes,
                    error: None,
                });
                reports.push(DestinationReport {
                    destination: branch.destination,
                    bytes,
                });
            }
            Err(failure) => {
                events.emit(&SaveEvent::DestinationFinished {
                    upload: name.to_owned(),
                    destination: branch.destination.clone(),
                    bytes: branch.progress.bytes(),
                    error: Some(failure.message().to_owned()),
                });
                failures.push(failure);
            }
        }
    }

    let snapshot = metrics.snapshot();
    let elapsed = started.elapsed();
    emit_state(events, name, SaveState::Aggregated);
    events.emit(&SaveEvent::SaveCompleted {
        upload: name.to_owned(),
        bytes: snapshot.bytes_read,
        failures: failures.len(),
        peak_buffered_bytes: snapshot.peak_queued_bytes,
        elapsed,
    });
    debug!(upload = %name, failures = failures.len(), "All branches reported");

    match AggregateError::from_failures(name, failures) {
        Some(aggregate) => Err(aggregate),
        None => Ok(SaveReport {
            name: name.to_owned(),
            bytes: snapshot.bytes_read,
            destinations: reports,
            elapsed,
            metrics: snapshot,
        }),
    }
}

/// Turn one destination task outcome into bytes stored or a tagged failure
fn settle(
    destination: &str,
    progress: &BranchProgress,
    drain: Option<&DrainReport>,
    outcome: Result<Result<u64, ContractError>, JoinError>,
) -> Result<u64, BranchFailure> {
    let bytes = match outcome {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return Err(BranchFailure::destination_write(destination, e.to_string())),
        Err(e) => {
            return Err(BranchFailure::destination_write(
                destination,
                join_message("destination", e),
            ))
        }
    };

    // A destination may only succeed if it saw the whole, intact source.
    match drain {
        Some(report) if report.is_complete() && progress.bytes() == report.bytes_read => {
            Ok(bytes)
        }
        Some(report) if report.is_complete() => Err(BranchFailure::destination_write(
            destination,
            format!(
                "stopped reading before end of stream ({} of {} bytes)",
                progress.bytes(),
                report.bytes_read
            ),
        )),
        Some(report) if report.error.is_none() => Err(BranchFailure::destination_write(
            destination,
            "stopped reading before end of stream",
        )),
        _ => Err(BranchFailure::destination_write(
            destination,
            "upload aborted before end of stream",
        )),
    }
}

fn join_message(task: &str, e: JoinError) -> String {
    if !e.is_panic() {
        return format!("{task} task cancelled");
    }
    let payload = e.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause");
    format!("{task} task panicked: {detail}")
}

fn emit_state(events: &Arc<dyn EventSink>, upload: &str, state: SaveState) {
    events.emit(&SaveEvent::StateChanged {
        upload: upload.to_owned(),
        state,
    });
}
