//! Splitter - duplicates one source stream into bounded per-destination queues
//!
//! Each chunk read from the source is a single reference-counted `Bytes`
//! handed to every active branch before the next read. A full queue blocks
//! the read loop, so the slowest destination sets the pace and memory stays
//! bounded by `chunk_size * (queue_capacity + 1) * branches`.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::io::{InspectReader, StreamReader};
use tracing::{debug, instrument};

use contracts::{ByteStream, EventSink, SaveEvent, UploadSettings};

use crate::error::ReplicatorError;
use crate::metrics::SaveMetrics;

/// Item carried by a branch queue; `Err` marks an aborted upload
type Chunk = Result<Bytes, io::Error>;

/// Chunking and queueing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Maximum bytes per chunk read from the source
    pub chunk_size: usize,
    /// Chunks buffered per destination
    pub queue_capacity: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            queue_capacity: 4,
        }
    }
}

impl SplitterConfig {
    /// Reject zero-sized queues and zero or oversized chunks
    pub fn validate(&self) -> Result<(), ReplicatorError> {
        if self.chunk_size == 0 {
            return Err(ReplicatorError::configuration("chunk_size must be > 0"));
        }
        if self.chunk_size > UploadSettings::MAX_CHUNK_SIZE {
            return Err(ReplicatorError::configuration(format!(
                "chunk_size must be <= {} bytes",
                UploadSettings::MAX_CHUNK_SIZE
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ReplicatorError::configuration("queue_capacity must be > 0"));
        }
        Ok(())
    }

    /// Upper bound of queued bytes for `branches` destinations
    pub fn buffer_bound(&self, branches: usize) -> usize {
        self.chunk_size
            .saturating_mul(self.queue_capacity.saturating_add(1))
            .saturating_mul(branches)
    }
}

/// Bytes a destination has actually read from its stream
#[derive(Debug, Clone, Default)]
pub struct BranchProgress(Arc<AtomicU64>);

impl BranchProgress {
    pub fn bytes(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Outcome of draining the source
#[derive(Debug)]
pub struct DrainReport {
    /// Bytes read from the source
    pub bytes_read: u64,
    /// Source read failure
    pub error: Option<io::Error>,
    /// Reading stopped because no branch was left to feed
    pub aborted: bool,
    /// Per branch, whether it stopped accepting chunks early
    pub detached: Vec<bool>,
}

impl DrainReport {
    /// The source was read to its end without error
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.aborted
    }
}

/// Receiving end of a branch queue.
///
/// On drop, chunks still waiting in the queue are released from the
/// queued-bytes count.
struct BranchQueue {
    rx: mpsc::Receiver<Chunk>,
    metrics: Arc<SaveMetrics>,
}

impl Drop for BranchQueue {
    fn drop(&mut self) {
        self.rx.close();
        while let Ok(chunk) = self.rx.try_recv() {
            if let Ok(bytes) = chunk {
                self.metrics.sub_queued(bytes.len());
            }
        }
    }
}

struct BranchSender {
    destination: String,
    tx: Option<mpsc::Sender<Chunk>>,
    delivered: u64,
}

/// Fans one source out to N branch streams
pub struct Splitter {
    upload: String,
    config: SplitterConfig,
    branches: Vec<BranchSender>,
    metrics: Arc<SaveMetrics>,
    events: Arc<dyn EventSink>,
}

impl Splitter {
    pub fn new(
        upload: impl Into<String>,
        config: SplitterConfig,
        metrics: Arc<SaveMetrics>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            upload: upload.into(),
            config,
            branches: Vec::new(),
            metrics,
            events,
        }
    }

    /// Register a branch and return the stream its destination reads
    pub fn branch(&mut self, destination: impl Into<String>) -> (ByteStream, BranchProgress) {
        let (tx, rx) = mpsc::channel::<Chunk>(self.config.queue_capacity);
        self.branches.push(BranchSender {
            destination: destination.into(),
            tx: Some(tx),
            delivered: 0,
        });

        let queue = BranchQueue {
            rx,
            metrics: Arc::clone(&self.metrics),
        };
        let metrics = Arc::clone(&self.metrics);
        let chunks = futures::stream::unfold(queue, |mut queue| async move {
            queue.rx.recv().await.map(|chunk| (chunk, queue))
        })
        .inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                metrics.sub_queued(bytes.len());
            }
        });

        let progress = BranchProgress::default();
        let counter = Arc::clone(&progress.0);
        let reader = InspectReader::new(StreamReader::new(chunks), move |read: &[u8]| {
            counter.fetch_add(read.len() as u64, Ordering::AcqRel);
        });

        (Box::pin(reader), progress)
    }

    /// Branches still accepting chunks
    pub fn active_branches(&self) -> usize {
        self.branches.iter().filter(|b| b.tx.is_some()).count()
    }

    /// Relay the whole source to every branch, then close all branches.
    ///
    /// The source is dropped before returning.
    #[instrument(
        name = "splitter_run",
        skip(self, source),
        fields(upload = %self.upload, branches = self.branches.len())
    )]
    pub async fn run<R: AsyncRead + Unpin>(mut self, mut source: R) -> DrainReport {
        let chunk_size = self.config.chunk_size;
        let mut buf = BytesMut::with_capacity(chunk_size);
        let mut aborted = false;

        let error = loop {
            if self.active_branches() == 0 {
                debug!(upload = %self.upload, "No active branches left, aborting source");
                aborted = true;
                break None;
            }

            buf.reserve(chunk_size);
            let read = source.read_buf(&mut (&mut buf).limit(chunk_size)).await;
            match read {
                Ok(0) => break None,
                Ok(n) => {
                    self.metrics.record_chunk(n);
                    let chunk = buf.split().freeze();
                    self.broadcast(chunk).await;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => break Some(e),
            }
        };

        let detached = self
            .branches
            .iter()
            .map(|branch| branch.tx.is_none())
            .collect();

        if let Some(ref e) = error {
            self.events.emit(&SaveEvent::SourceFailed {
                upload: self.upload.clone(),
                message: e.to_string(),
            });
            self.abort(e).await;
        }

        drop(source);

        // Dropping the senders signals end of data to the remaining branches.
        self.branches.clear();

        DrainReport {
            bytes_read: self.metrics.bytes_read(),
            error,
            aborted,
            detached,
        }
    }

    async fn broadcast(&mut self, chunk: Bytes) {
        let len = chunk.len();
        for branch in &mut self.branches {
            let Some(tx) = branch.tx.as_ref() else {
                continue;
            };

            self.metrics.add_queued(len);
            if tx.send(Ok(chunk.clone())).await.is_err() {
                self.metrics.sub_queued(len);
                self.metrics.inc_detached_count();
                branch.tx = None;
                self.events.emit(&SaveEvent::DestinationDetached {
                    upload: self.upload.clone(),
                    destination: branch.destination.clone(),
                    bytes_delivered: branch.delivered,
                });
            } else {
                branch.delivered += len as u64;
            }
        }
    }

    /// Deliver an abort marker to every branch still attached
    async fn abort(&mut self, cause: &io::Error) {
        for branch in &mut self.branches {
            if let Some(tx) = branch.tx.take() {
                let marker = io::Error::new(cause.kind(), format!("upload aborted: {cause}"));
                // A closed receiver already ended its branch.
                let _ = tx.send(Err(marker)).await;
            }
        }
    }
}
