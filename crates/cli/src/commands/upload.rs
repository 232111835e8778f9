//! `upload` command implementation.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::EventSink;
use observability::{MetricsEventSink, UploadStatsAggregator};
use replicator::{
    create_replicator, CompositeEventSink, ConfiguredDestination, Replicator, ReplicatorError,
    SaveReport, TracingEventSink,
};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::{info, warn};

use crate::cli::UploadArgs;
use crate::error::{self, CliError};

/// Execute the `upload` command
pub async fn run_upload(args: &UploadArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }
    if args.name.is_some() && args.files.len() > 1 {
        return Err(CliError::invalid_arguments("--name requires exactly one file").into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let events: Arc<dyn EventSink> = Arc::new(
        CompositeEventSink::default()
            .with(Arc::new(TracingEventSink))
            .with(Arc::new(MetricsEventSink)),
    );
    let replicator = create_replicator(&blueprint.destinations, &blueprint.upload, events)
        .context("Failed to create destinations")?;

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let mut stats = UploadStatsAggregator::new();
    let mut failed = 0usize;

    for path in &args.files {
        let started = Instant::now();
        let outcome = match upload_name(args.name.as_deref(), path) {
            Ok(name) => {
                upload_file(
                    &replicator,
                    path,
                    &name,
                    blueprint.upload.max_file_size,
                    timeout,
                )
                .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(report) => {
                stats.record_success(report.bytes, report.elapsed);
                println!(
                    "✓ {} -> {} ({} bytes, {} destinations)",
                    path.display(),
                    report.name,
                    report.bytes,
                    report.destinations.len()
                );
            }
            Err(e) => {
                failed += 1;
                match &e {
                    CliError::StoreFailed {
                        source_failed,
                        destinations,
                        ..
                    } => stats.record_failure(
                        *source_failed,
                        destinations.iter().map(String::as_str),
                        started.elapsed(),
                    ),
                    _ => stats.record_failure(false, std::iter::empty(), started.elapsed()),
                }
                println!("✗ {}: {}", path.display(), e);
            }
        }
    }

    println!("\n{}", stats.summary());

    if failed > 0 {
        anyhow::bail!("{} of {} uploads failed", failed, args.files.len());
    }
    Ok(())
}

/// Stored name: the override, or the file name
fn upload_name(name: Option<&str>, path: &Path) -> error::Result<String> {
    if let Some(name) = name {
        return Ok(name.to_string());
    }
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::invalid_arguments(format!("cannot derive a name from {}", path.display()))
        })
}

/// Stream one file through the replicator
async fn upload_file(
    replicator: &Replicator<ConfiguredDestination>,
    path: &Path,
    name: &str,
    max_file_size: u64,
    timeout: Option<Duration>,
) -> error::Result<SaveReport> {
    let file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    if size > max_file_size {
        return Err(CliError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_file_size,
        });
    }

    let limited = LimitedReader::new(file, max_file_size);
    let bytes_read = limited.counter();
    let result = save_with_timeout(replicator, name, limited, timeout).await?;

    result.map_err(|e| {
        let size = bytes_read.load(Ordering::Acquire);
        if size > max_file_size {
            warn!(upload = %name, size, limit = max_file_size, "Upload exceeded size limit");
            CliError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: max_file_size,
            }
        } else {
            store_failed(name, e)
        }
    })
}

async fn save_with_timeout<R>(
    replicator: &Replicator<ConfiguredDestination>,
    name: &str,
    source: R,
    timeout: Option<Duration>,
) -> error::Result<std::result::Result<SaveReport, ReplicatorError>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let save = replicator.save(name, source);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, save)
            .await
            .map_err(|_| CliError::Timeout {
                name: name.to_string(),
                secs: limit.as_secs(),
            }),
        None => Ok(save.await),
    }
}

/// Fails the read once more than `limit` bytes have come through.
///
/// Enforces the size limit on bytes actually read, for sources whose
/// metadata length is missing or stale (pipes, growing files).
struct LimitedReader<R> {
    inner: R,
    limit: u64,
    read: Arc<AtomicU64>,
}

impl<R> LimitedReader<R> {
    fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bytes read so far
    fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.read)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for LimitedReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = (buf.filled().len() - before) as u64;
                let total = self.read.fetch_add(n, Ordering::AcqRel) + n;
                if total > self.limit {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("upload exceeds limit of {} bytes", self.limit),
                    )));
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

/// Log per-branch details and collapse them into a generic failure
fn store_failed(name: &str, error: ReplicatorError) -> CliError {
    match error.as_aggregate() {
        Some(aggregate) => {
            for failure in aggregate.failures() {
                warn!(
                    upload = %name,
                    branch = failure.destination().unwrap_or("source"),
                    error = %failure.message(),
                    "Upload branch failed"
                );
            }
            CliError::StoreFailed {
                name: name.to_string(),
                source_failed: aggregate.source_failure().is_some(),
                destinations: aggregate
                    .failed_destinations()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            }
        }
        None => {
            warn!(upload = %name, error = %error, "Upload failed");
            CliError::StoreFailed {
                name: name.to_string(),
                source_failed: false,
                destinations: Vec::new(),
            }
        }
    }
}
