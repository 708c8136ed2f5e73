mod common;

use common::{seed, Event, RecordingOutput};
use datum_core::{get_doc, DocError, MemoryStore};
use serde_json::json;

#[tokio::test]
async fn test_get_reports_found_document() {
    let store = MemoryStore::new();
    let hello = seed(
        &store,
        json!({"_id": "hello", "data": {"foo": 1}, "meta": {"humanId": "a44quickId"}}),
    )
    .await;
    let output = RecordingOutput::new();

    let doc = get_doc(&store, "a44", &output).await.unwrap();

    assert_eq!(doc, hello);
    assert_eq!(output.events(), vec![Event::Exists("hello".to_string())]);
}

#[tokio::test]
async fn test_get_reports_nothing_when_lookup_fails() {
    let store = MemoryStore::new();
    seed(&store, json!({"_id": "abc"})).await;
    seed(&store, json!({"_id": "abd"})).await;
    let output = RecordingOutput::new();

    assert!(matches!(
        get_doc(&store, "ab", &output).await,
        Err(DocError::Ambiguous { .. })
    ));
    assert!(matches!(
        get_doc(&store, "zz", &output).await,
        Err(DocError::NotFound(_))
    ));
    assert!(output.events().is_empty());
}
