//! Build replicators from configuration

use std::sync::Arc;

use tracing::{info, instrument};

use contracts::{
    ByteStream, ContractError, Destination, DestinationConfig, DestinationType, EventSink,
    UploadSettings,
};

use crate::destinations::{FileDestination, LogDestination};
use crate::error::ReplicatorError;
use crate::replicator::Replicator;
use crate::splitter::SplitterConfig;

/// Destination built from a `DestinationConfig`
#[derive(Debug)]
pub enum ConfiguredDestination {
    File(FileDestination),
    Log(LogDestination),
}

impl Destination for ConfiguredDestination {
    fn name(&self) -> &str {
        match self {
            Self::File(destination) => destination.name(),
            Self::Log(destination) => destination.name(),
        }
    }

    async fn save(&self, name: &str, stream: ByteStream) -> Result<u64, ContractError> {
        match self {
            Self::File(destination) => destination.save(name, stream).await,
            Self::Log(destination) => destination.save(name, stream).await,
        }
    }
}

impl From<&UploadSettings> for SplitterConfig {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            queue_capacity: settings.queue_capacity,
        }
    }
}

/// Create a destination from configuration
#[instrument(
    name = "replicator_create_destination",
    skip(config),
    fields(destination = %config.name, destination_type = ?config.destination_type)
)]
pub fn create_destination(
    config: &DestinationConfig,
) -> Result<ConfiguredDestination, ReplicatorError> {
    match config.destination_type {
        DestinationType::Log => Ok(ConfiguredDestination::Log(LogDestination::new(&config.name))),
        DestinationType::File => FileDestination::from_params(&config.name, &config.params)
            .map(ConfiguredDestination::File)
            .map_err(|e| match e {
                ContractError::DestinationCreation { message, .. } => {
                    ReplicatorError::destination_creation(&config.name, message)
                }
                other => ReplicatorError::destination_creation(&config.name, other.to_string()),
            }),
    }
}

/// Convenience function to create a replicator from destination configs
#[instrument(name = "replicator_create", skip_all, fields(destinations = configs.len()))]
pub fn create_replicator(
    configs: &[DestinationConfig],
    settings: &UploadSettings,
    events: Arc<dyn EventSink>,
) -> Result<Replicator<ConfiguredDestination>, ReplicatorError> {
    let destinations = configs
        .iter()
        .map(create_destination)
        .collect::<Result<Vec<_>, _>>()?;

    let replicator = Replicator::builder(destinations)
        .splitter_config(SplitterConfig::from(settings))
        .events(events)
        .build()?;

    info!(
        destinations = ?replicator.destination_names(),
        chunk_size = settings.chunk_size,
        queue_capacity = settings.queue_capacity,
        "Replicator created"
    );
    Ok(replicator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::NoopEventSink;
    use std::collections::HashMap;

    fn log_config(name: &str) -> DestinationConfig {
        DestinationConfig {
            name: name.to_string(),
            destination_type: DestinationType::Log,
            params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_create_replicator_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let configs = vec![
            DestinationConfig {
                name: "disk".to_string(),
                destination_type: DestinationType::File,
                params: HashMap::from([("dir".to_string(), dir.path().display().to_string())]),
            },
            log_config("audit"),
        ];

        let replicator =
            create_replicator(&configs, &UploadSettings::default(), Arc::new(NoopEventSink))
                .unwrap();
        assert_eq!(replicator.destination_names(), vec!["disk", "audit"]);

        let report = replicator.save("note.txt", &b"hi there"[..]).await.unwrap();
        assert_eq!(report.bytes, 8);
        assert_eq!(std::fs::read(dir.path().join("note.txt")).unwrap(), b"hi there");
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let result = create_replicator(&[], &UploadSettings::default(), Arc::new(NoopEventSink));
        assert!(matches!(result, Err(ReplicatorError::Configuration { .. })));
    }

    #[test]
    fn test_bad_directory_fails_creation() {
        let config = DestinationConfig {
            name: "disk".to_string(),
            destination_type: DestinationType::File,
            params: HashMap::from([("dir".to_string(), "/definitely/not/here".to_string())]),
        };
        let err = create_destination(&config).unwrap_err();
        assert!(matches!(err, ReplicatorError::DestinationCreation { ref name, .. } if name == "disk"));
    }

    #[test]
    fn test_settings_map_to_splitter_config() {
        let settings = UploadSettings {
            chunk_size: 10,
            queue_capacity: 3,
            max_file_size: 1,
        };
        assert_eq!(
            SplitterConfig::from(&settings),
            SplitterConfig {
                chunk_size: 10,
                queue_capacity: 3
            }
        );
    }
}
