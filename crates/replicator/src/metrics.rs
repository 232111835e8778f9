//! Save metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single save, shared by the splitter and branch readers
#[derive(Debug, Default)]
pub struct SaveMetrics {
    /// Bytes currently sitting in destination queues
    queued_bytes: AtomicUsize,
    /// High-water mark of `queued_bytes`
    peak_queued_bytes: AtomicUsize,
    /// Total bytes read from the source
    bytes_read: AtomicU64,
    /// Total chunks read from the source
    chunks_read: AtomicU64,
    /// Destinations that stopped accepting chunks early
    detached_count: AtomicU64,
}

impl SaveMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get bytes currently queued
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes.load(Ordering::Relaxed)
    }

    /// Get peak queued bytes
    pub fn peak_queued_bytes(&self) -> usize {
        self.peak_queued_bytes.load(Ordering::Relaxed)
    }

    /// Account for a chunk entering a destination queue
    pub fn add_queued(&self, len: usize) {
        let now = self.queued_bytes.fetch_add(len, Ordering::AcqRel) + len;
        self.peak_queued_bytes.fetch_max(now, Ordering::AcqRel);
    }

    /// Account for a chunk leaving a destination queue
    pub fn sub_queued(&self, len: usize) {
        self.queued_bytes.fetch_sub(len, Ordering::AcqRel);
    }

    /// Get total bytes read from the source
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Get total chunks read from the source
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read.load(Ordering::Relaxed)
    }

    /// Record one chunk read from the source
    pub fn record_chunk(&self, len: usize) {
        self.chunks_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Get detached destination count
    pub fn detached_count(&self) -> u64 {
        self.detached_count.load(Ordering::Relaxed)
    }

    /// Increment detached destination count
    pub fn inc_detached_count(&self) {
        self.detached_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queued_bytes: self.queued_bytes(),
            peak_queued_bytes: self.peak_queued_bytes(),
            bytes_read: self.bytes_read(),
            chunks_read: self.chunks_read(),
            detached_count: self.detached_count(),
        }
    }
}

/// Snapshot of save metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queued_bytes: usize,
    pub peak_queued_bytes: usize,
    pub bytes_read: u64,
    pub chunks_read: u64,
    pub detached_count: u64,
}
