//! Replicator - writes one upload to every configured destination

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{info, instrument};

use contracts::{Destination, EventSink, SaveEvent, SaveState};

use crate::coordinator::{fan_out, SaveReport};
use crate::error::ReplicatorError;
use crate::events::TracingEventSink;
use crate::splitter::SplitterConfig;

/// Builder for creating a Replicator
pub struct ReplicatorBuilder<D> {
    destinations: Vec<D>,
    config: SplitterConfig,
    events: Arc<dyn EventSink>,
}

impl<D> ReplicatorBuilder<D>
where
    D: Destination + Send + Sync + 'static,
{
    /// Create a new ReplicatorBuilder
    pub fn new(destinations: Vec<D>) -> Self {
        Self {
            destinations,
            config: SplitterConfig::default(),
            events: Arc::new(TracingEventSink),
        }
    }

    /// Chunk size and per-destination queue capacity
    pub fn splitter_config(mut self, config: SplitterConfig) -> Self {
        self.config = config;
        self
    }

    /// Sink receiving save events
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Validate and build the replicator
    pub fn build(self) -> Result<Replicator<D>, ReplicatorError> {
        if self.destinations.is_empty() {
            return Err(ReplicatorError::configuration("no destinations provided"));
        }
        self.config.validate()?;

        Ok(Replicator {
            destinations: self.destinations.into_iter().map(Arc::new).collect(),
            config: self.config,
            events: self.events,
        })
    }
}

/// Replicates uploads to a fixed, ordered list of destinations
pub struct Replicator<D> {
    destinations: Vec<Arc<D>>,
    config: SplitterConfig,
    events: Arc<dyn EventSink>,
}

impl<D> Replicator<D>
where
    D: Destination + Send + Sync + 'static,
{
    /// Create a replicator with default chunking
    ///
    /// # Errors
    /// `ReplicatorError::Configuration` if `destinations` is empty
    pub fn new(destinations: Vec<D>, events: Arc<dyn EventSink>) -> Result<Self, ReplicatorError> {
        ReplicatorBuilder::new(destinations).events(events).build()
    }

    /// Start building a replicator
    pub fn builder(destinations: Vec<D>) -> ReplicatorBuilder<D> {
        ReplicatorBuilder::new(destinations)
    }

    /// Destination names in replication order
    pub fn destination_names(&self) -> Vec<&str> {
        self.destinations.iter().map(|d| d.name()).collect()
    }

    /// Number of destinations
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    /// Always false: construction rejects an empty list
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Chunking in use
    pub fn splitter_config(&self) -> SplitterConfig {
        self.config
    }

    /// Write `source` to every destination under `name`.
    ///
    /// Each destination gets exactly one save call. Returns once every
    /// destination and the source drain have finished. `source` is dropped
    /// exactly once on every path.
    ///
    /// # Errors
    /// `ReplicatorError::Aggregate` listing every failed branch
    #[instrument(
        name = "replicator_save",
        skip(self, source),
        fields(destinations = self.destinations.len())
    )]
    pub async fn save<R>(&self, name: &str, source: R) -> Result<SaveReport, ReplicatorError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.events.emit(&SaveEvent::StateChanged {
            upload: name.to_owned(),
            state: SaveState::Idle,
        });

        let report = fan_out(&self.destinations, name, source, self.config, &self.events).await?;

        info!(
            upload = %name,
            bytes = report.bytes,
            destinations = report.destinations.len(),
            "Upload replicated"
        );
        Ok(report)
    }
}
