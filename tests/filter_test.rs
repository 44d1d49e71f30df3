use connector_kit::{
    filter_data, ConnectorError, DataFilter, Entry, FilterOptions, MemoryStore,
};
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn entries(values: Vec<Value>) -> Vec<Entry> {
    values
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
}

fn store_with(doctype: &str, stored: Vec<Value>) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(doctype, entries(stored)).unwrap();
    store
}

#[tokio::test]
async fn test_default_key_scenario() {
    init_tracing();
    let store = store_with("io.bills", vec![json!({"id": 1, "name": "x"})]);

    let batch = entries(vec![json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b"})]);
    let result = filter_data(&store, batch, "io.bills", FilterOptions::new())
        .await
        .unwrap();

    assert_eq!(result, entries(vec![json!({"id": 2, "name": "b"})]));
}

#[tokio::test]
async fn test_composite_keys_need_every_field() {
    init_tracing();
    let store = store_with("io.bills", vec![json!({"a": 1, "b": "x"})]);

    let batch = entries(vec![
        json!({"a": 1, "b": "y"}),
        json!({"a": 1, "b": "x", "extra": true}),
        json!({"a": 2, "b": "x"}),
    ]);
    let options = FilterOptions::new().with_keys(["a", "b"]);
    let result = filter_data(&store, batch, "io.bills", options).await.unwrap();

    assert_eq!(
        result,
        entries(vec![json!({"a": 1, "b": "y"}), json!({"a": 2, "b": "x"})])
    );
}

#[tokio::test]
async fn test_output_keeps_input_order() {
    init_tracing();
    let store = store_with("io.bills", vec![json!({"id": 3}), json!({"id": 5})]);

    let batch = entries((1..=6).map(|id| json!({ "id": id })).collect());
    let result = filter_data(&store, batch, "io.bills", FilterOptions::new())
        .await
        .unwrap();

    let ids: Vec<i64> = result.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 4, 6]);
}

#[tokio::test]
async fn test_filtering_is_idempotent() {
    init_tracing();
    let store = store_with("io.bills", vec![json!({"id": "b"})]);
    let filter = DataFilter::new(&store);

    let batch = entries(vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})]);
    let once = filter
        .filter(batch, "io.bills", FilterOptions::new())
        .await
        .unwrap();
    let twice = filter
        .filter(once.clone(), "io.bills", FilterOptions::new())
        .await
        .unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.len(), 2);
}

#[tokio::test]
async fn test_empty_store_passes_everything() {
    init_tracing();
    let store = MemoryStore::new();

    let batch = entries(vec![json!({"id": 1}), json!({"id": 1}), json!({"id": 2})]);
    let result = filter_data(&store, batch.clone(), "io.bills", FilterOptions::new())
        .await
        .unwrap();

    assert_eq!(result, batch);
}

#[tokio::test]
async fn test_other_doctypes_are_ignored() {
    init_tracing();
    let store = store_with("io.files", vec![json!({"id": 1})]);

    let batch = entries(vec![json!({"id": 1})]);
    let result = filter_data(&store, batch.clone(), "io.bills", FilterOptions::new())
        .await
        .unwrap();

    assert_eq!(result, batch);
}

#[tokio::test]
async fn test_stored_records_without_key_are_not_compared() {
    init_tracing();
    // The default selector only fetches records whose key fields are set.
    let store = store_with("io.bills", vec![json!({"name": "orphan"}), json!({"id": null})]);

    let batch = entries(vec![json!({"name": "no id"}), json!({"id": null})]);
    let result = filter_data(&store, batch.clone(), "io.bills", FilterOptions::new())
        .await
        .unwrap();

    assert_eq!(result, batch);
}

#[tokio::test]
async fn test_missing_doctype_makes_no_store_call() {
    init_tracing();
    let store = store_with("io.bills", vec![json!({"id": 1})]);

    let result = filter_data(
        &store,
        entries(vec![json!({"id": 1})]),
        "",
        FilterOptions::new(),
    )
    .await;

    assert!(matches!(result, Err(ConnectorError::InvalidArgument(_))));
    assert_eq!(store.index_calls(), 0);
    assert_eq!(store.query_calls(), 0);
}

#[tokio::test]
async fn test_one_index_and_one_query_per_call() {
    init_tracing();
    let store = store_with("io.bills", vec![json!({"id": 1})]);

    filter_data(
        &store,
        entries(vec![json!({"id": 1}), json!({"id": 2})]),
        "io.bills",
        FilterOptions::new(),
    )
    .await
    .unwrap();

    assert_eq!(store.index_calls(), 1);
    assert_eq!(store.query_calls(), 1);
}

#[tokio::test]
async fn test_integral_float_keys_match_integers() {
    init_tracing();
    let store = store_with("io.bills", vec![json!({"id": 1.0}), json!({"id": 2.5})]);

    let batch = entries(vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 2.5})]);
    let result = filter_data(&store, batch, "io.bills", FilterOptions::new())
        .await
        .unwrap();

    assert_eq!(result, entries(vec![json!({"id": 2})]));
}

#[tokio::test]
async fn test_delimiter_inside_values_collides() {
    init_tracing();
    // Fingerprints join key values with `####`, so a value containing it can shift the split.
    let store = store_with("io.bills", vec![json!({"a": "x####y", "b": "z"})]);

    let batch = entries(vec![json!({"a": "x", "b": "y####z"}), json!({"a": "x", "b": "z"})]);
    let options = FilterOptions::new().with_keys(["a", "b"]);
    let result = filter_data(&store, batch, "io.bills", options).await.unwrap();

    assert_eq!(result, entries(vec![json!({"a": "x", "b": "z"})]));
}
