//! View construction, configuration and teardown

use crate::common::*;
use evig::{EvigConfig, PatchSource};
use serde_json::json;

#[tokio::test]
async fn create_binds_to_an_initialized_collection() {
    let backend = std::sync::Arc::new(MemoryBackend::new());
    let collection = Collection::create(
        "test_create_view",
        backend,
        CollectionOptions::default(),
        Some(vec![doc(json!({"id": "dummy", "test": "dummy"}))].into()),
    )
    .await
    .unwrap();

    let view = View::create(&collection, ViewOptions::new());
    assert_eq!(view.collection().name(), "test_create_view");
    assert_eq!(view.snapshot().len(), 1);
}

#[tokio::test]
async fn destroy_detaches_from_the_collection() {
    let (collection, _) = test_collection();
    let view = View::new(&collection, ViewOptions::new());
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    view.destroy();
    collection.insert(Document::new("1")).await.unwrap();
    assert!(recorder.events().is_empty());
    assert_eq!(collection.listener_count(), 0);
}

#[tokio::test]
async fn dropped_views_release_their_listener() {
    let (collection, _) = test_collection();
    for _ in 0..10 {
        let view = View::new(&collection, ViewOptions::new());
        let copy = view.clone();
        drop(view);
        assert_eq!(collection.listener_count(), 1);
        drop(copy);
    }
    assert_eq!(collection.listener_count(), 0);
    collection.insert(Document::new("1")).await.unwrap();
}

#[tokio::test]
async fn collection_destroy_is_forwarded() {
    let (collection, _) = test_collection();
    let view = View::new(&collection, ViewOptions::new());
    let recorder = Recorder::new();
    view.subscribe(recorder.handler());

    collection.destroy();
    assert_eq!(recorder.kinds(), vec!["destroy"]);
}

#[tokio::test]
async fn options_from_config() {
    let config = EvigConfig::from_toml_str(
        r#"
[views.public]
excluded_fields = ["secret"]
"#,
    )
    .unwrap();
    let (collection, _) = test_collection();
    let view = View::new(&collection, config.view_options("public").unwrap());
    assert_eq!(view.excluded_fields().collect::<Vec<_>>(), vec!["secret"]);

    collection
        .insert(doc(json!({"id": "1", "secret": 1, "name": "n"})))
        .await
        .unwrap();
    let source: &dyn PatchSource = &view;
    assert_eq!(
        source.get_document("1").unwrap().to_value(),
        json!({"id": "1", "name": "n"})
    );
}

#[tokio::test]
async fn several_views_share_one_collection() {
    let (collection, _) = test_collection();
    let names = View::new(&collection, ViewOptions::new().include(["name"]));
    let everything = View::new(&collection, ViewOptions::new());
    assert_eq!(collection.listener_count(), 2);

    collection
        .insert(doc(json!({"id": "1", "name": "n", "age": 3})))
        .await
        .unwrap();
    assert_eq!(names.get("1").unwrap().len(), 2);
    assert_eq!(everything.get("1").unwrap().len(), 3);
}
