use fieldmark_common::{Binding, FieldKind, Locator};
use fieldmark_core::LocatorStore;
use fieldmark_engine::storage::{load_bindings, save_pending};
use fieldmark_engine::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use std::collections::HashMap;
use tempfile::tempdir;

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_memory_store_get_returns_only_present_keys() {
    let kv = MemoryKeyValueStore::new();
    let mut entries = HashMap::new();
    entries.insert("jobTitleSelector".to_string(), "#title".to_string());
    kv.set(entries).await.unwrap();

    let got = kv
        .get(&keys(&["jobTitleSelector", "companyNameSelector"]))
        .await
        .unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got["jobTitleSelector"], "#title");
}

#[tokio::test]
async fn test_file_store_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let kv = FileKeyValueStore::new(dir.path().join("store.json"));
    let got = kv.get(&keys(&["jobTitleSelector"])).await.unwrap();
    assert!(got.is_empty());
}

#[tokio::test]
async fn test_file_store_merges_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");
    let kv = FileKeyValueStore::new(&path);

    let mut first = HashMap::new();
    first.insert("jobTitleSelector".to_string(), ".title".to_string());
    first.insert("jobTitleSelectorText".to_string(), "Engineer".to_string());
    kv.set(first).await.unwrap();

    let mut second = HashMap::new();
    second.insert("jobTitleSelectorText".to_string(), "Staff Engineer".to_string());
    kv.set(second).await.unwrap();

    let reopened = FileKeyValueStore::new(&path);
    let got = reopened
        .get(&keys(&["jobTitleSelector", "jobTitleSelectorText"]))
        .await
        .unwrap();
    assert_eq!(got["jobTitleSelector"], ".title");
    assert_eq!(got["jobTitleSelectorText"], "Staff Engineer");
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn test_corrupt_file_is_a_serialization_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{not json").unwrap();

    let kv = FileKeyValueStore::new(&path);
    let err = kv.get(&keys(&["jobTitleSelector"])).await.unwrap_err();
    assert!(matches!(err, fieldmark_common::StoreError::Serialization(_)));
}

#[tokio::test]
async fn test_bindings_round_trip_through_a_file() {
    let dir = tempdir().unwrap();
    let kv = FileKeyValueStore::new(dir.path().join("store.json"));

    let mut store = LocatorStore::new();
    store.commit(Binding::new(
        FieldKind::CompanyName,
        Locator::new(r#"[data-testid="company"]"#),
        "Acme Corp",
    ));
    assert_eq!(save_pending(&kv, &mut store).await.unwrap(), 3);
    assert_eq!(save_pending(&kv, &mut store).await.unwrap(), 0);

    let loaded = load_bindings(&kv).await.unwrap();
    let binding = loaded.get(FieldKind::CompanyName).unwrap();
    assert_eq!(binding.locator.as_str(), r#"[data-testid="company"]"#);
    assert_eq!(binding.last_known_text, "Acme Corp");
    assert!(loaded.get(FieldKind::JobTitle).is_none());
}
