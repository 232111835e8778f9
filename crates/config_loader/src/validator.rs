//! Configuration validation
//!
//! Rules:
//! - at least one destination
//! - destination names non-empty and unique
//! - required destination params present
//! - chunk_size, queue_capacity, max_file_size > 0
//! - chunk_size <= UploadSettings::MAX_CHUNK_SIZE

use std::collections::HashSet;

use contracts::{ContractError, RelayBlueprint, UploadSettings};

/// Validate a RelayBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_upload_settings(blueprint)?;
    validate_destination_count(blueprint)?;
    validate_destination_names(blueprint)?;
    validate_destination_params(blueprint)?;
    Ok(())
}

fn validate_upload_settings(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let upload = &blueprint.upload;
    if upload.chunk_size == 0 {
        return Err(ContractError::config_validation(
            "upload.chunk_size",
            "chunk_size must be > 0",
        ));
    }
    if upload.chunk_size > UploadSettings::MAX_CHUNK_SIZE {
        return Err(ContractError::config_validation(
            "upload.chunk_size",
            format!(
                "chunk_size must be <= {} bytes",
                UploadSettings::MAX_CHUNK_SIZE
            ),
        ));
    }
    if upload.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "upload.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    if upload.max_file_size == 0 {
        return Err(ContractError::config_validation(
            "upload.max_file_size",
            "max_file_size must be > 0",
        ));
    }
    Ok(())
}

fn validate_destination_count(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    if blueprint.destinations.is_empty() {
        return Err(ContractError::config_validation(
            "destinations",
            "at least one destination is required",
        ));
    }
    Ok(())
}

fn validate_destination_names(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, destination) in blueprint.destinations.iter().enumerate() {
        if destination.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{}].name", idx),
                "destination name cannot be empty",
            ));
        }
        if !seen.insert(&destination.name) {
            return Err(ContractError::config_validation(
                format!("destinations[name={}]", destination.name),
                "duplicate destination name",
            ));
        }
    }
    Ok(())
}

fn validate_destination_params(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    for destination in &blueprint.destinations {
        for key in destination.destination_type.required_params() {
            if destination.param(key).is_none() {
                return Err(ContractError::config_validation(
                    format!("destinations[{}].params.{}", destination.name, key),
                    format!(
                        "'{}' is required for {:?} destinations",
                        key, destination.destination_type
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConfigVersion, DestinationConfig, DestinationType};
    use std::collections::HashMap;

    fn minimal_blueprint() -> RelayBlueprint {
        RelayBlueprint {
            version: ConfigVersion::V1,
            upload: UploadSettings::default(),
            destinations: vec![
                DestinationConfig {
                    name: "disk".into(),
                    destination_type: DestinationType::File,
                    params: HashMap::from([("dir".to_string(), "./uploads".to_string())]),
                },
                DestinationConfig {
                    name: "audit".into(),
                    destination_type: DestinationType::Log,
                    params: HashMap::new(),
                },
            ],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_no_destinations() {
        let mut bp = minimal_blueprint();
        bp.destinations.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one destination"), "got: {err}");
    }

    #[test]
    fn test_duplicate_destination_name() {
        let mut bp = minimal_blueprint();
        bp.destinations.push(bp.destinations[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate destination name"), "got: {err}");
    }

    #[test]
    fn test_empty_destination_name() {
        let mut bp = minimal_blueprint();
        bp.destinations[1].name = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_file_destination_requires_dir() {
        let mut bp = minimal_blueprint();
        bp.destinations[0].params.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("'dir' is required"), "got: {err}");
    }

    #[test]
    fn test_zero_chunk_size() {
        let mut bp = minimal_blueprint();
        bp.upload.chunk_size = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("chunk_size must be > 0"), "got: {err}");
    }

    #[test]
    fn test_oversized_chunk_size() {
        let mut bp = minimal_blueprint();
        bp.upload.chunk_size = UploadSettings::MAX_CHUNK_SIZE + 1;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("chunk_size must be <="), "got: {err}");

        bp.upload.chunk_size = UploadSettings::MAX_CHUNK_SIZE;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_queue_capacity() {
        let mut bp = minimal_blueprint();
        bp.upload.queue_capacity = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("queue_capacity must be > 0"), "got: {err}");
    }
}
