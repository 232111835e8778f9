//! # Integration Tests
//!
//! Cross-crate tests: configuration to replicator to files on disk.

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        let _ = contracts::SaveState::Idle;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{EventSink, RelayBlueprint, SaveEvent, SaveState};
    use observability::{MetricsEventSink, UploadStatsAggregator};
    use replicator::{create_replicator, CompositeEventSink, RecordingEventSink, ReplicatorError};
    use sha2::{Digest, Sha256};

    fn blueprint(dirs: &[&Path], extra: &str) -> RelayBlueprint {
        let mut toml = String::from("[upload]\nchunk_size = 4096\nqueue_capacity = 2\n");
        for (i, dir) in dirs.iter().enumerate() {
            toml.push_str(&format!(
                "\n[[destinations]]\nname = \"disk{i}\"\ndestination_type = \"file\"\n\
                 [destinations.params]\ndir = \"{}\"\n",
                dir.display()
            ));
        }
        toml.push_str(extra);
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    /// Config -> factory -> replicator -> identical files in every directory
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_replicate_to_directories() {
        let dirs: Vec<_> = (0..3).map(|_| tempfile::tempdir().unwrap()).collect();
        let paths: Vec<&Path> = dirs.iter().map(|d| d.path()).collect();
        let blueprint = blueprint(
            &paths,
            "\n[[destinations]]\nname = \"audit\"\ndestination_type = \"log\"\n",
        );

        let events = Arc::new(RecordingEventSink::new());
        let sink: Arc<dyn EventSink> = Arc::new(
            CompositeEventSink::default()
                .with(events.clone())
                .with(Arc::new(MetricsEventSink)),
        );
        let replicator =
            create_replicator(&blueprint.destinations, &blueprint.upload, sink).unwrap();
        assert_eq!(
            replicator.destination_names(),
            vec!["disk0", "disk1", "disk2", "audit"]
        );

        let payload: Vec<u8> = (0..300_000u32).map(|i| (i * 31 % 256) as u8).collect();
        let report = replicator
            .save("payload.bin", std::io::Cursor::new(payload.clone()))
            .await
            .unwrap();

        assert_eq!(report.bytes, payload.len() as u64);
        assert!(report.metrics.peak_queued_bytes <= 4096 * 3 * 4);
        let expected = Sha256::digest(&payload);
        for dir in &paths {
            let written = std::fs::read(dir.join("payload.bin")).unwrap();
            assert_eq!(Sha256::digest(&written), expected);
        }

        let completed = events
            .events()
            .into_iter()
            .filter(|e| matches!(e, SaveEvent::SaveCompleted { failures: 0, .. }))
            .count();
        assert_eq!(completed, 1);
    }

    /// A directory removed after construction fails only its own branch
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_one_directory_gone() {
        let good = tempfile::tempdir().unwrap();
        let doomed = tempfile::tempdir().unwrap();
        let doomed_path = doomed.path().to_path_buf();
        let blueprint = blueprint(&[good.path(), doomed_path.as_path()], "");

        let replicator = create_replicator(
            &blueprint.destinations,
            &blueprint.upload,
            Arc::new(RecordingEventSink::new()),
        )
        .unwrap();
        drop(doomed);

        let err = replicator
            .save("note.txt", &b"still here"[..])
            .await
            .unwrap_err();
        let aggregate = err.as_aggregate().unwrap();
        assert_eq!(aggregate.failed_destinations(), vec!["disk1"]);
        assert!(aggregate.source_failure().is_none());
        assert!(err.to_string().starts_with("upload 'note.txt' failed on 1 branch"));

        assert_eq!(
            std::fs::read(good.path().join("note.txt")).unwrap(),
            b"still here"
        );

        let mut stats = UploadStatsAggregator::new();
        stats.record_failure(false, aggregate.failed_destinations(), std::time::Duration::ZERO);
        assert_eq!(stats.summary().destination_failures.get("disk1"), Some(&1));
    }

    #[test]
    fn test_e2e_missing_directory_fails_creation() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("not-created");
        let blueprint = blueprint(&[missing.as_path()], "");

        let result = create_replicator(
            &blueprint.destinations,
            &blueprint.upload,
            Arc::new(RecordingEventSink::new()),
        );
        assert!(matches!(
            result,
            Err(ReplicatorError::DestinationCreation { ref name, .. }) if name == "disk0"
        ));
    }

    #[tokio::test]
    async fn test_e2e_state_sequence_per_save() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = blueprint(&[dir.path()], "");
        let events = Arc::new(RecordingEventSink::new());
        let replicator =
            create_replicator(&blueprint.destinations, &blueprint.upload, events.clone()).unwrap();

        replicator.save("one", &b"1"[..]).await.unwrap();
        replicator.save("two", &b"2"[..]).await.unwrap();

        let states: Vec<(String, SaveState)> = events
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SaveEvent::StateChanged { upload, state } => Some((upload, state)),
                _ => None,
            })
            .collect();
        assert_eq!(states.len(), 8);
        assert_eq!(states[0], ("one".to_string(), SaveState::Idle));
        assert_eq!(states[3], ("one".to_string(), SaveState::Aggregated));
        assert_eq!(states[4], ("two".to_string(), SaveState::Idle));
    }
}
