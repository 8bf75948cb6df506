//! Backend hydration, seeding and write-through

use crate::common::*;
use evig::Seed;
use indexmap::IndexMap;
use serde_json::json;
use std::sync::Arc;

const KEY: &str = "evig_test";

#[tokio::test]
async fn mutations_are_written_through() {
    let (collection, backend) = test_collection();
    collection
        .insert(doc(json!({"id": "1", "name": "test"})))
        .await
        .unwrap();
    assert_eq!(stored(&backend, KEY, "1"), Some(json!({"id": "1", "name": "test"})));

    collection
        .update("1", |draft| {
            draft.set("name", "updated");
        })
        .await
        .unwrap();
    assert_eq!(
        stored(&backend, KEY, "1"),
        Some(json!({"id": "1", "name": "updated"}))
    );

    collection.remove("1").await.unwrap();
    assert_eq!(stored(&backend, KEY, "1"), None);
    assert_eq!(backend.stats().batches, 3);
}

#[tokio::test]
async fn replace_all_writes_one_batch() {
    let (collection, backend) = test_collection();
    collection
        .replace_all(vec![Document::new("1"), Document::new("2"), Document::new("3")])
        .await
        .unwrap();
    let stats = backend.stats();
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.field_writes, 3);
    assert_eq!(backend.field_count(KEY), 3);
}

#[tokio::test]
async fn load_from_backend_reports_missing_key() {
    let (collection, _) = test_collection();
    assert!(!collection.load_from_backend().await.unwrap());
    assert!(collection.snapshot().is_empty());
}

#[tokio::test]
async fn load_from_backend_hydrates_without_events() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .set_field(KEY, "dummy", r#"{"id":"dummy","name":"dummy"}"#.into())
        .await
        .unwrap();

    let collection = Collection::new("test", backend.clone(), CollectionOptions::default());
    let recorder = Recorder::new();
    collection.subscribe(recorder.handler());

    assert!(collection.load_from_backend().await.unwrap());
    assert_eq!(
        collection.get("dummy").unwrap().to_value(),
        json!({"id": "dummy", "name": "dummy"})
    );
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn initialize_seeds_an_empty_backend_in_one_batch() {
    let (collection, backend) = test_collection();
    let recorder = Recorder::new();
    collection.subscribe(recorder.handler());

    collection
        .initialize(Some(Seed::List(vec![
            doc(json!({"id": "a", "v": 1})),
            doc(json!({"id": "b", "v": 2})),
        ])))
        .await
        .unwrap();

    assert_eq!(collection.snapshot().len(), 2);
    assert_eq!(backend.stats().batches, 1);
    assert_eq!(stored(&backend, KEY, "b"), Some(json!({"id": "b", "v": 2})));
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn initialize_prefers_existing_data_over_seed() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .set_field(KEY, "x", r#"{"id":"x"}"#.into())
        .await
        .unwrap();
    let collection = Collection::new("test", backend.clone(), CollectionOptions::default());

    collection
        .initialize(Some(vec![Document::new("seeded")].into()))
        .await
        .unwrap();
    assert!(collection.get("x").is_some());
    assert!(collection.get("seeded").is_none());
    assert_eq!(backend.field_count(KEY), 1);
}

#[tokio::test]
async fn initialize_with_map_seed() {
    let (collection, _) = test_collection();
    let mut seed = IndexMap::new();
    seed.insert("dummy".to_string(), doc(json!({"id": "dummy", "test": "dummy"})));
    collection.initialize(Some(seed.into())).await.unwrap();
    assert_eq!(collection.snapshot().ids().collect::<Vec<_>>(), vec!["dummy"]);
}

#[tokio::test]
async fn create_wires_and_initializes() {
    let backend = Arc::new(MemoryBackend::new());
    let first = Collection::create(
        "users",
        backend.clone(),
        CollectionOptions::default().with_prefix("app_"),
        Some(vec![Document::new("1")].into()),
    )
    .await
    .unwrap();
    assert_eq!(first.storage_key(), "app_users");
    first
        .update("1", |draft| {
            draft.set("name", "Alice");
        })
        .await
        .unwrap();

    let second = Collection::create(
        "users",
        backend.clone(),
        CollectionOptions::default().with_prefix("app_"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(second.snapshot(), first.snapshot());
}

#[tokio::test]
async fn failed_persistence_keeps_memory_ahead_until_reload() {
    let (collection, backend) = test_collection();
    collection.insert(Document::new("1")).await.unwrap();

    backend.set_fail_writes(true);
    let err = collection
        .update("1", |draft| {
            draft.set("v", 1);
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Backend(_)));
    assert_eq!(collection.get("1").unwrap().get_i64("v"), 1);

    backend.set_fail_writes(false);
    assert!(collection.load_from_backend().await.unwrap());
    assert_eq!(collection.get("1").unwrap().get("v"), None);
}

#[tokio::test]
async fn loading_rejects_documents_stored_under_another_id() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .set_field(KEY, "a", r#"{"id":"b"}"#.into())
        .await
        .unwrap();
    let collection = Collection::new("test", backend, CollectionOptions::default());
    let err = collection.load_from_backend().await.unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)));
}

#[tokio::test]
async fn empty_field_names_are_persisted() {
    let (collection, backend) = test_collection();
    collection.insert(Document::new("1")).await.unwrap();
    let recorder = Recorder::new();
    collection.subscribe(recorder.handler());

    collection
        .update("1", |draft| {
            draft.set("", 5);
        })
        .await
        .unwrap();

    assert_eq!(recorder.kinds().len(), 5);
    assert_eq!(
        recorder.backend_ops(),
        vec![vec![BackendOp::Patch {
            field: "1".into(),
            patch: Some(AddressablePatch::new(PatchOp::Add, "", Some(json!(5)))),
        }]]
    );
    assert_eq!(stored(&backend, KEY, "1"), Some(json!({"id": "1", "": 5})));
    assert_eq!(collection.get("1").unwrap().get(""), Some(&json!(5)));
}
