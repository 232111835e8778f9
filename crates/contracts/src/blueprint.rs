//! RelayBlueprint - Config Loader output
//!
//! Describes the full relay configuration: upload tuning and destination routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Upload settings
    #[serde(default)]
    pub upload: UploadSettings,

    /// Destination routing, in replication order
    pub destinations: Vec<DestinationConfig>,
}

/// Upload tuning: chunking, queueing and size limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Bytes read from the source per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunks buffered per destination before the source read blocks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl UploadSettings {
    /// Largest accepted `chunk_size` (64 MiB)
    pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            queue_capacity: default_queue_capacity(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_queue_capacity() -> usize {
    4
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

/// Destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Destination name
    pub name: String,

    /// Destination type
    pub destination_type: DestinationType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl DestinationConfig {
    /// Look up a non-empty parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Destination type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    /// Local filesystem directory
    File,
    /// Drain and log only
    Log,
}

impl DestinationType {
    /// Parameters this type cannot work without
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            Self::File => &["dir"],
            Self::Log => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_settings_defaults() {
        let settings = UploadSettings::default();
        assert_eq!(settings.chunk_size, 65536);
        assert_eq!(settings.queue_capacity, 4);
        assert_eq!(settings.max_file_size, 50 * 1024 * 1024);
    }

    #[test]
    fn blueprint_deserializes_with_defaults() {
        let json = r#"{
            "destinations": [
                { "name": "disk", "destination_type": "file", "params": { "dir": "/tmp" } },
                { "name": "audit", "destination_type": "log" }
            ]
        }"#;
        let blueprint: RelayBlueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.version, ConfigVersion::V1);
        assert_eq!(blueprint.upload, UploadSettings::default());
        assert_eq!(blueprint.destinations.len(), 2);
        assert_eq!(blueprint.destinations[0].param("dir"), Some("/tmp"));
        assert_eq!(blueprint.destinations[1].destination_type, DestinationType::Log);
    }

    #[test]
    fn empty_param_is_absent() {
        let config = DestinationConfig {
            name: "disk".into(),
            destination_type: DestinationType::File,
            params: HashMap::from([("dir".to_string(), String::new())]),
        };
        assert_eq!(config.param("dir"), None);
    }
}
