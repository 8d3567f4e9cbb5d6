use std::collections::HashMap;
use std::path::Path;

use s3_doc_migrate::config::MigrationConfig;
use s3_doc_migrate::ingestion::MigrationOptions;
use s3_doc_migrate::pipeline::{list_source_keys, CollectionTable, FileOutcome, Migrator, QualityOutcome};
use s3_doc_migrate::storage::StorageClient;
use s3_doc_migrate::store::JsonDirStore;

const KEY: &str = "Data_JSON/Google_drive_Madeleine/2025_09_23_0.csv";

fn config_for(storage_root: &Path, store_root: &Path) -> MigrationConfig {
    let env: HashMap<&str, String> = HashMap::from([
        ("AWS_S3_BUCKET", "meteo".to_string()),
        ("STORAGE_ROOT", storage_root.display().to_string()),
        ("MONGO_URI", format!("file://{}", store_root.display())),
        ("MONGO_DATABASE", "meteo_db".to_string()),
    ]);
    MigrationConfig::from_lookup(|k| env.get(k).cloned()).unwrap()
}

fn seed_bucket(root: &Path) {
    let dir = root.join("meteo/Data_JSON/Google_drive_Madeleine");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::copy("tests/fixtures/semicolon.csv", dir.join("2025_09_23_0.csv")).unwrap();
}

#[test]
fn directory_backends_run_end_to_end() {
    let storage_root = tempfile::tempdir().unwrap();
    let store_root = tempfile::tempdir().unwrap();
    seed_bucket(storage_root.path());

    let config = config_for(storage_root.path(), store_root.path());
    let storage = StorageClient::open(&config);
    assert!(matches!(storage, StorageClient::Ready(_)));
    assert_eq!(storage.list("meteo", "Data_JSON/").unwrap(), vec![KEY.to_string()]);

    let store = JsonDirStore::new();
    let migrator = Migrator::new(
        &config,
        &storage,
        &store,
        CollectionTable::from_keys([KEY]).unwrap(),
        MigrationOptions::default(),
    );
    let summary = migrator.run(&[KEY]);

    match &summary.files[0].outcome {
        FileOutcome::Loaded { clean, load } => {
            assert_eq!(clean.removed, 1);
            assert_eq!(load.inserted, 2);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let stored = store_root.path().join("meteo_db/googledrivemadeleine.jsonl");
    let text = std::fs::read_to_string(stored).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with("{\"_id\":")));

    match &summary.quality[0].outcome {
        QualityOutcome::Compared { comparison, .. } => {
            assert_eq!(comparison.source_rows, 3);
            assert_eq!(comparison.target_rows, 2);
            assert!(comparison.columns_equal);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn second_run_appends_to_the_collection() {
    let storage_root = tempfile::tempdir().unwrap();
    let store_root = tempfile::tempdir().unwrap();
    seed_bucket(storage_root.path());

    let config = config_for(storage_root.path(), store_root.path());
    let storage = StorageClient::open(&config);
    let store = JsonDirStore::new();
    let migrator = Migrator::new(
        &config,
        &storage,
        &store,
        CollectionTable::from_keys([KEY]).unwrap(),
        MigrationOptions::default(),
    );

    migrator.load_all(&[KEY]);
    migrator.load_all(&[KEY]);

    match &migrator.check_file(KEY).outcome {
        QualityOutcome::Compared { comparison, .. } => assert_eq!(comparison.target_rows, 4),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn missing_storage_root_fails_each_file_separately() {
    let store_root = tempfile::tempdir().unwrap();
    let config = config_for(&store_root.path().join("absent"), store_root.path());
    let storage = StorageClient::open(&config);
    assert!(matches!(storage, StorageClient::Unavailable(_)));

    let store = JsonDirStore::new();
    let other = "Data_JSON/Donnees_JSON/0.csv";
    let migrator = Migrator::new(
        &config,
        &storage,
        &store,
        CollectionTable::from_keys([KEY, other]).unwrap(),
        MigrationOptions::default(),
    );

    let reports = migrator.load_all(&[KEY, other]);
    assert_eq!(reports.len(), 2);
    for report in &reports {
        let text = report.to_string();
        assert!(text.contains("client unavailable"), "{text}");
    }
}

#[test]
fn unsupported_store_uri_is_reported_as_load_failure() {
    let storage_root = tempfile::tempdir().unwrap();
    seed_bucket(storage_root.path());
    let mut config = config_for(storage_root.path(), storage_root.path());
    config.store_uri = "mongodb://localhost:27017".to_string();

    let storage = StorageClient::open(&config);
    let store = JsonDirStore::new();
    let migrator = Migrator::new(
        &config,
        &storage,
        &store,
        CollectionTable::from_keys([KEY]).unwrap(),
        MigrationOptions::default(),
    );

    match migrator.migrate_file(KEY).outcome {
        FileOutcome::LoadFailed { error, .. } => assert!(error.contains("unsupported uri scheme")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn prefix_listing_feeds_the_load_pass() {
    let storage_root = tempfile::tempdir().unwrap();
    let store_root = tempfile::tempdir().unwrap();
    seed_bucket(storage_root.path());
    let other = storage_root.path().join("meteo/Data_JSON/Station_Tab");
    std::fs::create_dir_all(&other).unwrap();
    std::fs::copy("tests/fixtures/tab.tsv", other.join("0.tsv")).unwrap();
    std::fs::write(storage_root.path().join("meteo/notes.txt"), "not a source").unwrap();

    let config = config_for(storage_root.path(), store_root.path());
    let storage = StorageClient::open(&config);
    let keys = list_source_keys(&storage, &config, "Data_JSON/").unwrap();
    assert_eq!(
        keys,
        vec![KEY.to_string(), "Data_JSON/Station_Tab/0.tsv".to_string()]
    );

    let store = JsonDirStore::new();
    let migrator = Migrator::new(
        &config,
        &storage,
        &store,
        CollectionTable::from_nameable_keys(&keys),
        MigrationOptions::default(),
    );
    let reports = migrator.load_all(&keys);
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, FileOutcome::Loaded { .. })));
    assert!(store_root.path().join("meteo_db/stationtab.jsonl").is_file());
}

#[test]
fn prefix_listing_fails_when_storage_is_unavailable() {
    let store_root = tempfile::tempdir().unwrap();
    let config = config_for(&store_root.path().join("absent"), store_root.path());
    let storage = StorageClient::open(&config);
    let err = list_source_keys(&storage, &config, "Data_JSON/").unwrap_err();
    assert!(err.to_string().contains("client unavailable"));
}
