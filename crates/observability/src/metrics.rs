//! Upload metrics
//!
//! Prometheus counters fed from save events, plus an in-memory aggregator
//! for end-of-run summaries.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{EventSink, SaveEvent, SaveState};
use metrics::{counter, gauge, histogram};

/// Count a save that has started
pub fn record_save_started() {
    counter!("upload_relay_saves_started_total").increment(1);
}

/// Record the outcome of a save
pub fn record_save_finished(duration: Duration, bytes: u64, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("upload_relay_saves_total", "status" => status).increment(1);
    counter!("upload_relay_bytes_read_total").increment(bytes);
    histogram!("upload_relay_save_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Count a failed branch (`"source"` or a destination name)
pub fn record_branch_failure(branch: &str) {
    counter!(
        "upload_relay_branch_failures_total",
        "branch" => branch.to_string()
    )
    .increment(1);
}

/// Count bytes stored by a destination
pub fn record_destination_bytes(destination: &str, bytes: u64) {
    counter!(
        "upload_relay_destination_bytes_total",
        "destination" => destination.to_string()
    )
    .increment(bytes);
}

/// Peak bytes queued across all branches during the last save
pub fn record_peak_buffered(bytes: usize) {
    gauge!("upload_relay_peak_buffered_bytes").set(bytes as f64);
}

/// Event sink translating save events into Prometheus metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsEventSink;

impl EventSink for MetricsEventSink {
    fn emit(&self, event: &SaveEvent) {
        match event {
            SaveEvent::StateChanged {
                state: SaveState::Idle,
                ..
            } => {
                record_save_started();
            }
            SaveEvent::SourceFailed { .. } => record_branch_failure("source"),
            SaveEvent::DestinationDetached { destination, .. } => {
                counter!(
                    "upload_relay_destinations_detached_total",
                    "destination" => destination.clone()
                )
                .increment(1);
            }
            SaveEvent::DestinationFinished {
                destination,
                bytes,
                error,
                ..
            } => match error {
                None => record_destination_bytes(destination, *bytes),
                Some(_) => record_branch_failure(destination),
            },
            SaveEvent::SaveCompleted {
                bytes,
                failures,
                peak_buffered_bytes,
                elapsed,
                ..
            } => {
                record_save_finished(*elapsed, *bytes, *failures == 0);
                record_peak_buffered(*peak_buffered_bytes);
            }
            SaveEvent::StateChanged { .. } => {}
        }
    }
}

/// Upload statistics aggregator
///
/// Aggregates save outcomes in memory for a summary at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct UploadStatsAggregator {
    /// Saves attempted
    pub total_saves: u64,

    /// Saves with at least one failed branch
    pub failed_saves: u64,

    /// Bytes read from sources
    pub total_bytes: u64,

    /// Source read failures
    pub source_failures: u64,

    /// Save duration in milliseconds
    pub duration_stats: RunningStats,

    /// Failures per destination
    pub destination_failures: HashMap<String, u64>,
}

impl UploadStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a save that succeeded on every branch
    pub fn record_success(&mut self, bytes: u64, elapsed: Duration) {
        self.total_saves += 1;
        self.total_bytes += bytes;
        self.duration_stats.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// Record a failed save
    pub fn record_failure<'a>(
        &mut self,
        source_failed: bool,
        failed_destinations: impl IntoIterator<Item = &'a str>,
        elapsed: Duration,
    ) {
        self.total_saves += 1;
        self.failed_saves += 1;
        if source_failed {
            self.source_failures += 1;
        }
        for destination in failed_destinations {
            *self
                .destination_failures
                .entry(destination.to_string())
                .or_insert(0) += 1;
        }
        self.duration_stats.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// Build a summary
    pub fn summary(&self) -> UploadSummary {
        UploadSummary {
            total_saves: self.total_saves,
            failed_saves: self.failed_saves,
            total_bytes: self.total_bytes,
            source_failures: self.source_failures,
            failure_rate: if self.total_saves > 0 {
                self.failed_saves as f64 / self.total_saves as f64 * 100.0
            } else {
                0.0
            },
            duration_ms: StatsSummary::from(&self.duration_stats),
            destination_failures: self.destination_failures.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary of a run
#[derive(Debug, Clone, Default)]
pub struct UploadSummary {
    pub total_saves: u64,
    pub failed_saves: u64,
    pub total_bytes: u64,
    pub source_failures: u64,
    pub failure_rate: f64,
    pub duration_ms: StatsSummary,
    pub destination_failures: HashMap<String, u64>,
}

impl std::fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Upload Summary ===")?;
        writeln!(f, "Uploads: {}", self.total_saves)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.failed_saves, self.failure_rate
        )?;
        writeln!(f, "Bytes read: {}", self.total_bytes)?;
        writeln!(f, "Source failures: {}", self.source_failures)?;
        writeln!(f, "Duration (ms): {}", self.duration_ms)?;

        if !self.destination_failures.is_empty() {
            let mut failures: Vec<_> = self.destination_failures.iter().collect();
            failures.sort();
            writeln!(f, "Destination failures:")?;
            for (destination, count) in failures {
                writeln!(f, "  {}: {}", destination, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
