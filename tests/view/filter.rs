//! Filtered views and documents crossing the filter boundary

use crate::common::*;
use serde_json::json;

fn not_secret() -> ViewOptions {
    ViewOptions::new().with_filter(|d| d.get("secret") != Some(&json!(true)))
}

#[tokio::test]
async fn filtered_out_documents_never_appear() {
    let (collection, _) = test_collection();
    let view = View::new(&collection, not_secret());
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    collection
        .insert(doc(json!({"id": "1", "test": "one", "secret": true})))
        .await
        .unwrap();
    assert!(recorder.events().is_empty());

    collection
        .insert(doc(json!({"id": "2", "test": "two", "secret": false})))
        .await
        .unwrap();

    assert!(view.snapshot().get("1").is_none());
    assert!(view.get("1").is_none());
    assert_eq!(
        view.get("2").unwrap().to_value(),
        json!({"id": "2", "test": "two", "secret": false})
    );
    assert_eq!(
        recorder.expanded(),
        vec![vec![
            Patch::add(path(&["2"]), json!({})),
            Patch::add(path(&["2", "id"]), json!("2")),
            Patch::add(path(&["2", "test"]), json!("two")),
            Patch::add(path(&["2", "secret"]), json!(false)),
        ]]
    );
}

#[tokio::test]
async fn hidden_document_updates_emit_nothing() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "1", "secret": true, "v": 1})))
        .await
        .unwrap();
    let view = View::new(&collection, not_secret());
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    collection
        .update("1", |draft| {
            draft.set("v", 2);
        })
        .await
        .unwrap();
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn document_entering_the_filter_is_added_in_full() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "1", "secret": true, "n": {"a": 1}})))
        .await
        .unwrap();
    let view = View::new(&collection, not_secret());
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    collection
        .update("1", |draft| {
            draft.set("secret", false);
        })
        .await
        .unwrap();

    assert_eq!(
        recorder.expanded(),
        vec![vec![
            Patch::add(path(&["1"]), json!({})),
            Patch::add(path(&["1", "id"]), json!("1")),
            Patch::add(path(&["1", "secret"]), json!(false)),
            Patch::add(path(&["1", "n"]), json!({})),
            Patch::add(path(&["1", "n", "a"]), json!(1)),
        ]]
    );
}

#[tokio::test]
async fn document_leaving_the_filter_is_removed() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "1", "secret": false})))
        .await
        .unwrap();
    let view = View::new(&collection, not_secret());
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    collection
        .update("1", |draft| {
            draft.set("secret", true);
        })
        .await
        .unwrap();
    assert_eq!(recorder.expanded(), vec![vec![Patch::remove(path(&["1"]))]]);
    assert!(view.get("1").is_none());
}

#[tokio::test]
async fn filter_combines_with_field_pruning() {
    let (collection, _) = test_collection();
    let view = View::new(&collection, not_secret().exclude(["hidden"]));
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    collection
        .insert(doc(json!({"id": "1", "hidden": 1, "shown": 2})))
        .await
        .unwrap();
    collection
        .update("1", |draft| {
            draft.set("hidden", 5);
        })
        .await
        .unwrap();

    assert_eq!(
        recorder.expanded(),
        vec![vec![
            Patch::add(path(&["1"]), json!({})),
            Patch::add(path(&["1", "id"]), json!("1")),
            Patch::add(path(&["1", "shown"]), json!(2)),
        ]]
    );
    assert_eq!(
        view.get("1").unwrap().to_value(),
        json!({"id": "1", "shown": 2})
    );
}

#[tokio::test]
async fn replace_all_through_a_filtered_view() {
    let (collection, _) = test_collection();
    collection
        .replace_all(vec![
            doc(json!({"id": "1", "secret": false})),
            doc(json!({"id": "2", "secret": false})),
        ])
        .await
        .unwrap();
    let view = View::new(&collection, not_secret());
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    collection
        .replace_all(vec![
            doc(json!({"id": "2", "secret": true})),
            doc(json!({"id": "3", "secret": false})),
        ])
        .await
        .unwrap();

    assert_eq!(
        recorder.expanded(),
        vec![vec![
            Patch::add(path(&["3"]), json!({})),
            Patch::add(path(&["3", "id"]), json!("3")),
            Patch::add(path(&["3", "secret"]), json!(false)),
            Patch::remove(path(&["1"])),
            Patch::remove(path(&["2"])),
        ]]
    );
    assert_eq!(view.snapshot().ids().collect::<Vec<_>>(), vec!["3"]);
}
