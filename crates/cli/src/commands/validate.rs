//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DestinationType, RelayBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    destination_count: usize,
    chunk_size: usize,
    queue_capacity: usize,
    max_file_size: u64,
    buffer_bound: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let upload = &blueprint.upload;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    destination_count: blueprint.destinations.len(),
                    chunk_size: upload.chunk_size,
                    queue_capacity: upload.queue_capacity,
                    max_file_size: upload.max_file_size,
                    buffer_bound: upload.chunk_size
                        * (upload.queue_capacity + 1)
                        * blueprint.destinations.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RelayBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.destinations.len() == 1 {
        warnings.push("Only one destination configured - uploads are not replicated".to_string());
    }

    if blueprint
        .destinations
        .iter()
        .all(|d| d.destination_type == DestinationType::Log)
    {
        warnings.push("No file destinations configured - uploads are not stored".to_string());
    }

    for destination in &blueprint.destinations {
        if destination.destination_type == DestinationType::Log && !destination.params.is_empty() {
            warnings.push(format!(
                "Destination '{}' is a log destination, its params are ignored",
                destination.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Destinations: {}", summary.destination_count);
            println!("  Chunk size: {} bytes", summary.chunk_size);
            println!("  Queue capacity: {} chunks", summary.queue_capacity);
            println!("  Max file size: {} bytes", summary.max_file_size);
            println!("  Buffer bound: {} bytes", summary.buffer_bound);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: PathBuf::from("/no/such/relay.toml"),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_single_log_destination_warns() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("relay.toml");
        std::fs::write(
            &config,
            r#"
[[destinations]]
name = "audit"
destination_type = "log"
"#,
        )
        .unwrap();

        let result = validate_config(&ValidateArgs { config, json: true });
        assert!(result.valid);
        assert_eq!(result.warnings.map(|w| w.len()), Some(2));
        assert_eq!(result.summary.map(|s| s.buffer_bound), Some(64 * 1024 * 5));
    }
}
