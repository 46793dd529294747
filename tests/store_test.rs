mod helpers;

use cvsearch::store::ingest::IngestionService;
use cvsearch::store::types::NewDocument;
use cvsearch::store::Store;
use cvsearch::StoreError;
use helpers::{docs, file_bytes, open, temp_store, TableProvider};

fn provider() -> TableProvider {
    TableProvider::new([
        ("first", vec![1.0, 0.0]),
        ("second", vec![0.0, 1.0]),
        ("third", vec![1.0, 1.0]),
    ])
}

#[test]
fn fresh_store_is_uninitialized_and_empty() {
    let (_tmp, paths) = temp_store();
    let store = open(&paths);
    assert!(!store.is_initialized());
    assert!(store.is_empty());
    assert_eq!(store.dimension(), None);
    assert!(matches!(
        store.get(0),
        Err(StoreError::OutOfRange { position: 0, len: 0 })
    ));
}

#[test]
fn reopened_store_sees_committed_state() {
    let (_tmp, paths) = temp_store();
    let provider = provider();
    let mut store = open(&paths);
    let doc = NewDocument::new("first").with_field("name", Some("Jane Doe".into()));
    IngestionService::new(&provider, true)
        .ingest(&mut store, vec![doc])
        .unwrap();
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["second"]))
        .unwrap();

    let reopened = open(&paths);
    assert!(reopened.is_initialized());
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.dimension(), Some(2));
    assert_eq!(reopened.get(0).unwrap().name(), Some("Jane Doe"));
    assert_eq!(reopened.get(1).unwrap().text, "second");
    assert_eq!(reopened.records(), store.records());
}

#[test]
fn missing_metadata_with_populated_index_is_misaligned() {
    let (_tmp, paths) = temp_store();
    let provider = provider();
    let mut store = open(&paths);
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["first", "second"]))
        .unwrap();
    std::fs::remove_file(&paths.metadata).unwrap();

    let err = Store::open(paths.clone()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::MisalignedStores {
            index_count: 2,
            metadata_count: 0
        }
    ));
}

#[test]
fn metadata_without_index_is_misaligned() {
    let (_tmp, paths) = temp_store();
    let provider = provider();
    let mut store = open(&paths);
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["first"]))
        .unwrap();
    std::fs::remove_file(&paths.index).unwrap();

    let err = Store::open(paths.clone()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::MisalignedStores {
            index_count: 0,
            metadata_count: 1
        }
    ));
}

#[test]
fn stale_metadata_from_an_older_commit_is_misaligned() {
    let (_tmp, paths) = temp_store();
    let provider = provider();
    let mut store = open(&paths);
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["first"]))
        .unwrap();
    let old_metadata = std::fs::read(&paths.metadata).unwrap();
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["second", "third"]))
        .unwrap();
    std::fs::write(&paths.metadata, old_metadata).unwrap();

    let err = Store::open(paths.clone()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::MisalignedStores {
            index_count: 3,
            metadata_count: 1
        }
    ));
}

#[test]
fn corrupt_index_surfaces_on_open() {
    let (_tmp, paths) = temp_store();
    std::fs::write(&paths.index, b"definitely not an index").unwrap();

    let err = Store::open(paths.clone()).unwrap_err();
    assert!(matches!(err, StoreError::CorruptIndex { .. }));
}

#[test]
fn corrupt_metadata_surfaces_on_open() {
    let (_tmp, paths) = temp_store();
    std::fs::write(&paths.metadata, b"{ not json").unwrap();

    let err = Store::open(paths.clone()).unwrap_err();
    assert!(matches!(err, StoreError::CorruptMetadata { .. }));
}

#[test]
fn reset_removes_both_files() {
    let (_tmp, paths) = temp_store();
    let provider = provider();
    let mut store = open(&paths);
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["first", "second"]))
        .unwrap();

    Store::reset(&paths).unwrap();
    assert_eq!(file_bytes(&paths), (None, None));

    let reopened = open(&paths);
    assert!(!reopened.is_initialized());
    assert!(reopened.is_empty());
}

#[test]
fn reset_of_empty_store_succeeds() {
    let (_tmp, paths) = temp_store();
    Store::reset(&paths).unwrap();
    Store::reset(&paths).unwrap();
    assert_eq!(file_bytes(&paths), (None, None));
}

#[test]
fn reset_recovers_a_misaligned_store() {
    let (_tmp, paths) = temp_store();
    let provider = provider();
    let mut store = open(&paths);
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["first"]))
        .unwrap();
    std::fs::remove_file(&paths.metadata).unwrap();
    assert!(Store::open(paths.clone()).is_err());

    Store::reset(&paths).unwrap();
    let mut store = open(&paths);
    let report = IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["second"]))
        .unwrap();
    assert_eq!(report.ids, 0..1);
}

#[test]
fn failed_reset_restores_both_files() {
    let (tmp, paths) = temp_store();
    let provider = provider();
    let mut store = open(&paths);
    IngestionService::new(&provider, true)
        .ingest(&mut store, docs(&["first", "second"]))
        .unwrap();
    let before = file_bytes(&paths);

    // A non-empty directory where the metadata would be moved aside blocks
    // that rename after the index has already been moved.
    let blocker = tmp.path().join("metadata.json.deleting");
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), b"x").unwrap();

    let err = Store::reset(&paths).unwrap_err();
    match err {
        StoreError::ResetFailed(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].path, paths.metadata);
        }
        other => panic!("expected ResetFailed, got {other:?}"),
    }

    assert_eq!(file_bytes(&paths), before);
    assert!(!tmp.path().join("resume_index.deleting").exists());
    assert_eq!(open(&paths).len(), 2);
}
