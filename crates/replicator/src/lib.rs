//! # Replicator
//!
//! Multi-destination upload replication.
//!
//! Responsibilities:
//! - Split one upload stream into bounded per-destination queues
//! - Run one task per destination, isolated from sibling failures
//! - Aggregate every branch outcome into a single result

pub mod coordinator;
pub mod destinations;
pub mod error;
pub mod events;
pub mod factory;
pub mod metrics;
pub mod replicator;
pub mod splitter;

pub use contracts::{ByteStream, Destination, EventSink, SaveEvent, SaveState};
pub use coordinator::{DestinationReport, SaveReport};
pub use destinations::{FileDestination, FileDestinationConfig, LogDestination};
pub use error::{AggregateError, BranchFailure, ReplicatorError};
pub use events::{CompositeEventSink, RecordingEventSink, TracingEventSink};
pub use factory::{create_destination, create_replicator, ConfiguredDestination};
pub use metrics::{MetricsSnapshot, SaveMetrics};
pub use replicator::{Replicator, ReplicatorBuilder};
pub use splitter::{BranchProgress, DrainReport, Splitter, SplitterConfig};
