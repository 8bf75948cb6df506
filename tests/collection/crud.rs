//! Insert / update / upsert / remove / replace_all semantics

use crate::common::*;
use indexmap::IndexMap;
use serde_json::json;

#[tokio::test]
async fn inserts_a_new_document() {
    let (collection, _) = test_collection();
    let d = doc(json!({"id": "1", "name": "test"}));
    collection.insert(d.clone()).await.unwrap();
    assert_eq!(*collection.get("1").unwrap(), d);
}

#[tokio::test]
async fn inserting_an_existing_id_fails_and_changes_nothing() {
    let (collection, _) = test_collection();
    let d = doc(json!({"id": "dummy", "name": "test"}));
    collection.insert(d.clone()).await.unwrap();
    let before = collection.snapshot();

    let err = collection
        .insert(doc(json!({"id": "dummy", "name": "other"})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateId { .. }));
    assert_eq!(
        err.to_string(),
        "Document with id \"dummy\" already exists on test"
    );
    assert_eq!(*collection.get("dummy").unwrap(), d);
    assert_eq!(collection.snapshot(), before);
}

#[tokio::test]
async fn updates_an_existing_document() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "dummy", "name": "test"})))
        .await
        .unwrap();
    collection
        .update("dummy", |draft| {
            draft.set("name", "updated");
        })
        .await
        .unwrap();
    assert_eq!(
        collection.get("dummy").unwrap().to_value(),
        json!({"id": "dummy", "name": "updated"})
    );
}

#[tokio::test]
async fn updating_a_missing_document_fails() {
    let (collection, _) = test_collection();
    let err = collection.update("dummy", |_| {}).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(err.to_string(), "Document with id \"dummy\" does not exist on test");
    assert!(collection.snapshot().is_empty());
}

#[tokio::test]
async fn upserts_a_new_document() {
    let (collection, _) = test_collection();
    collection
        .upsert("1", |draft| {
            draft.set("name", "test");
        })
        .await
        .unwrap();
    assert_eq!(
        collection.get("1").unwrap().to_value(),
        json!({"id": "1", "name": "test"})
    );
}

#[tokio::test]
async fn upserts_an_existing_document() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "dummy", "name": "test"})))
        .await
        .unwrap();
    collection
        .upsert("dummy", |draft| {
            draft.set("name", "updated");
        })
        .await
        .unwrap();
    assert_eq!(
        collection.get("dummy").unwrap().to_value(),
        json!({"id": "dummy", "name": "updated"})
    );
}

#[tokio::test]
async fn removes_an_existing_document() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "1", "name": "test"})))
        .await
        .unwrap();
    collection.remove("1").await.unwrap();
    assert!(collection.get("1").is_none());
}

#[tokio::test]
async fn removing_a_missing_document_fails() {
    let (collection, _) = test_collection();
    let err = collection.remove("missing").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Document with id \"missing\" does not exist on test"
    );
}

#[tokio::test]
async fn replaces_all_documents_from_a_map() {
    let (collection, _) = test_collection();
    let mut data = IndexMap::new();
    data.insert("1".to_string(), doc(json!({"id": "1", "name": "test"})));
    data.insert("2".to_string(), doc(json!({"id": "2", "name": "test"})));

    collection.replace_all(data).await.unwrap();
    assert_eq!(
        collection.snapshot().to_value(),
        json!({
            "1": {"id": "1", "name": "test"},
            "2": {"id": "2", "name": "test"}
        })
    );
}

#[tokio::test]
async fn replaces_all_documents_from_a_list() {
    let (collection, _) = test_collection();
    collection
        .replace_all(vec![
            doc(json!({"id": "1", "name": "test"})),
            doc(json!({"id": "2", "name": "test"})),
        ])
        .await
        .unwrap();
    assert_eq!(collection.snapshot().ids().collect::<Vec<_>>(), vec!["1", "2"]);
}

#[tokio::test]
async fn replace_all_emits_minimal_patches() {
    let (collection, _) = test_collection();
    collection
        .replace_all(vec![
            doc(json!({"id": "1", "n": {"a": 1, "b": 2}})),
            doc(json!({"id": "2", "v": 1})),
            doc(json!({"id": "3"})),
        ])
        .await
        .unwrap();

    let recorder = Recorder::new();
    collection.subscribe(recorder.handler());
    collection
        .replace_all(vec![
            doc(json!({"id": "1", "n": {"a": 1, "b": 3}})),
            doc(json!({"id": "2", "v": 1})),
            doc(json!({"id": "4"})),
        ])
        .await
        .unwrap();

    assert_eq!(
        recorder.structural(),
        vec![vec![
            Patch::replace(path(&["1", "n", "b"]), json!(3)),
            Patch::add(path(&["4"]), json!({"id": "4"})),
            Patch::remove(path(&["3"])),
        ]]
    );
}

#[tokio::test]
async fn replace_all_rejects_mismatched_map_keys() {
    let (collection, _) = test_collection();
    let mut data = IndexMap::new();
    data.insert("x".to_string(), doc(json!({"id": "1"})));
    let err = collection.replace_all(data).await.unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)));
    assert!(collection.snapshot().is_empty());
}

#[tokio::test]
async fn update_cannot_change_the_id() {
    let (collection, _) = test_collection();
    collection.insert(Document::new("1")).await.unwrap();
    let err = collection
        .update("1", |draft| {
            draft.set("id", "2");
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)));
    assert_eq!(collection.get("1").unwrap().id(), Some("1"));
}

#[tokio::test]
async fn old_snapshots_stay_unchanged() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "1", "v": 1})))
        .await
        .unwrap();
    let before = collection.snapshot();
    collection
        .update("1", |draft| {
            draft.set("v", 2);
        })
        .await
        .unwrap();
    assert_eq!(before.get("1").unwrap().get_i64("v"), 1);
    assert_eq!(collection.get("1").unwrap().get_i64("v"), 2);
}
