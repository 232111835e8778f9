//! Replicate Demo
//!
//! Writes one synthetic upload to two temporary directories and a log
//! destination, then deliberately breaks one directory and saves again.
//!
//! Run with: cargo run -p demos --bin replicate_demo [config.toml]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use config_loader::ConfigLoader;
use contracts::{DestinationConfig, DestinationType, RelayBlueprint, UploadSettings};
use replicator::{create_replicator, TracingEventSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let primary = tempfile::tempdir()?;
    let mirror = tempfile::tempdir()?;

    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading blueprint config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        RelayBlueprint {
            version: Default::default(),
            upload: UploadSettings {
                chunk_size: 16 * 1024,
                ..Default::default()
            },
            destinations: vec![
                file_destination("primary", primary.path()),
                file_destination("mirror", mirror.path()),
                DestinationConfig {
                    name: "audit".to_string(),
                    destination_type: DestinationType::Log,
                    params: HashMap::new(),
                },
            ],
        }
    };

    let replicator = create_replicator(
        &blueprint.destinations,
        &blueprint.upload,
        Arc::new(TracingEventSink),
    )?;

    let payload: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
    let report = replicator
        .save("demo.bin", Cursor::new(payload.clone()))
        .await?;
    tracing::info!(
        bytes = report.bytes,
        destinations = report.destinations.len(),
        peak_queued_bytes = report.metrics.peak_queued_bytes,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "First save succeeded"
    );

    // Remove the mirror directory so its branch fails on the next save.
    let mirror_path = mirror.path().to_path_buf();
    mirror.close()?;
    tracing::info!(dir = %mirror_path.display(), "Mirror directory removed");

    match replicator.save("demo.bin", Cursor::new(payload)).await {
        Ok(_) => tracing::warn!("Second save unexpectedly succeeded"),
        Err(e) => tracing::info!(error = %e, "Second save failed as expected"),
    }

    Ok(())
}

fn file_destination(name: &str, dir: &std::path::Path) -> DestinationConfig {
    DestinationConfig {
        name: name.to_string(),
        destination_type: DestinationType::File,
        params: HashMap::from([("dir".to_string(), dir.display().to_string())]),
    }
}
