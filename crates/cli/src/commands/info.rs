//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::RelayBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    upload: UploadInfo,
    destinations: Vec<DestinationInfo>,
}

#[derive(Serialize)]
struct UploadInfo {
    chunk_size: usize,
    queue_capacity: usize,
    max_file_size: u64,
}

#[derive(Serialize)]
struct DestinationInfo {
    name: String,
    destination_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) -> ConfigInfo {
    let destinations = blueprint
        .destinations
        .iter()
        .map(|d| DestinationInfo {
            name: d.name.clone(),
            destination_type: format!("{:?}", d.destination_type),
            params: if args.destinations {
                d.params.clone().into_iter().collect()
            } else {
                BTreeMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        upload: UploadInfo {
            chunk_size: blueprint.upload.chunk_size,
            queue_capacity: blueprint.upload.queue_capacity,
            max_file_size: blueprint.upload.max_file_size,
        },
        destinations,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Upload Relay Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Upload");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Chunk size: {} bytes", info.upload.chunk_size);
    println!("   ├─ Queue capacity: {} chunks", info.upload.queue_capacity);
    println!("   └─ Max file size: {} bytes", info.upload.max_file_size);

    println!("\n📤 Destinations ({})", info.destinations.len());
    for (i, destination) in info.destinations.iter().enumerate() {
        let is_last = i == info.destinations.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({})",
            prefix, destination.name, destination.destination_type
        );
        for (key, value) in &destination.params {
            println!("   {}  · {} = {}", child_prefix, key, value);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DestinationConfig, DestinationType, UploadSettings};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn blueprint() -> RelayBlueprint {
        RelayBlueprint {
            version: Default::default(),
            upload: UploadSettings::default(),
            destinations: vec![DestinationConfig {
                name: "disk".to_string(),
                destination_type: DestinationType::File,
                params: HashMap::from([("dir".to_string(), "/srv/uploads".to_string())]),
            }],
        }
    }

    fn args(destinations: bool) -> InfoArgs {
        InfoArgs {
            config: PathBuf::from("relay.toml"),
            json: true,
            destinations,
        }
    }

    #[test]
    fn test_params_hidden_by_default() {
        let info = build_config_info(&blueprint(), &args(false));
        assert_eq!(info.destinations.len(), 1);
        assert!(info.destinations[0].params.is_empty());
    }

    #[test]
    fn test_params_shown_with_flag() {
        let info = build_config_info(&blueprint(), &args(true));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["destinations"][0]["params"]["dir"], "/srv/uploads");
        assert_eq!(json["destinations"][0]["destination_type"], "File");
    }
}
