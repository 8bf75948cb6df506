//! Queue ordering across concurrently submitted mutations

use crate::common::*;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn runs_concurrent_updates_in_submission_order() {
    let (collection, _) = test_collection();
    collection
        .insert(doc(json!({"id": "dummy", "name": "test", "foo": 0, "bar": 0, "baz": 0})))
        .await
        .unwrap();

    let (a, b, c) = tokio::join!(
        collection.update("dummy", |draft| {
            draft.set("foo", 1);
        }),
        collection.update("dummy", |draft| {
            let foo = draft.get_i64("foo");
            draft.set("bar", foo + 1);
        }),
        collection.update("dummy", |draft| {
            let bar = draft.get_i64("bar");
            draft.set("baz", bar + 1);
        }),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(
        collection.get("dummy").unwrap().to_value(),
        json!({"id": "dummy", "name": "test", "foo": 1, "bar": 2, "baz": 3})
    );
}

#[tokio::test]
async fn listeners_observe_batches_in_submission_order() {
    let (collection, _) = test_collection();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    collection.subscribe(move |event| {
        if let PatchEvent::StructuralPatches(batch) = event {
            for patch in &batch.patches {
                s.lock().push(patch.doc_id().unwrap_or_default().to_string());
            }
        }
    });

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let collection = collection.clone();
            tokio::spawn(async move { collection.insert(Document::new(i.to_string())).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let seen = seen.lock().clone();
    let ids: Vec<String> = collection.snapshot().ids().map(str::to_string).collect();
    assert_eq!(seen, ids);
    assert_eq!(seen.len(), 20);
}

#[tokio::test]
async fn a_failing_mutation_does_not_block_later_ones() {
    let (collection, _) = test_collection();
    let (first, second, third) = tokio::join!(
        collection.insert(Document::new("1")),
        collection.insert(Document::new("1")),
        collection.insert(Document::new("2")),
    );
    first.unwrap();
    assert!(matches!(second, Err(Error::DuplicateId { .. })));
    third.unwrap();
    assert_eq!(collection.snapshot().len(), 2);
}

#[tokio::test]
async fn a_panicking_recipe_is_reported_as_unknown_failure() {
    let (collection, _) = test_collection();
    collection.insert(Document::new("1")).await.unwrap();

    let err = collection
        .update("1", |_| panic!("recipe blew up"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTaskFailure));

    collection
        .update("1", |draft| {
            draft.set("ok", true);
        })
        .await
        .unwrap();
    assert_eq!(collection.get("1").unwrap().get("ok"), Some(&json!(true)));
    assert_eq!(collection.pending(), 0);
}
