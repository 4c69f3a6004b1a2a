//! Integration tests for the desired-state store: defaults, write-back,
//! malformed values and entry operations.

mod common;

use std::sync::Arc;

use arkpets::domain::models::{default_model, keys, WebsiteFilterMode};
use arkpets::domain::ports::{KeyValueStore, Record};
use arkpets::domain::DomainError;
use arkpets::infrastructure::storage::MemoryStore;
use arkpets::services::DesiredStateStore;
use common::model;
use serde_json::json;

fn setup() -> (Arc<MemoryStore>, DesiredStateStore) {
    let store = Arc::new(MemoryStore::new());
    let desired = DesiredStateStore::new(Arc::clone(&store) as _);
    (store, desired)
}

#[tokio::test]
async fn test_absent_characters_default_to_one_entry_and_are_written_back() {
    let (store, desired) = setup();

    let characters = desired.characters().await.unwrap();

    assert_eq!(characters.len(), 1);
    assert_eq!(characters[0].model, default_model());
    let persisted = store.get(&[keys::CHARACTERS]).await.unwrap();
    assert_eq!(persisted[keys::CHARACTERS][0]["id"], json!(characters[0].id));

    // Second read is deterministic
    assert_eq!(desired.characters().await.unwrap(), characters);
}

#[tokio::test]
async fn test_preference_defaults_are_written_back() {
    let (store, desired) = setup();

    assert!(desired.allow_interaction().await.unwrap());
    assert_eq!(desired.website_filter().await.unwrap(), WebsiteFilterMode::All);
    assert_eq!(desired.domain_list().await.unwrap(), "");

    let record = store.get_all().await.unwrap();
    assert_eq!(record[keys::ALLOW_INTERACTION], json!(true));
    assert_eq!(record[keys::WEBSITE_FILTER], json!("all"));
    assert_eq!(record[keys::DOMAIN_LIST], json!(""));
}

#[tokio::test]
async fn test_malformed_characters_are_reinitialized() {
    let mut record = Record::new();
    record.insert(keys::CHARACTERS.to_string(), json!({"not": "a list"}));
    let store = Arc::new(MemoryStore::with_record(record));
    let desired = DesiredStateStore::new(Arc::clone(&store) as _);

    let characters = desired.characters().await.unwrap();

    assert_eq!(characters.len(), 1);
    assert!(store.get(&[keys::CHARACTERS]).await.unwrap()[keys::CHARACTERS].is_array());
}

#[tokio::test]
async fn test_unknown_filter_mode_falls_back_to_all() {
    let mut record = Record::new();
    record.insert(keys::WEBSITE_FILTER.to_string(), json!("greylist"));
    let desired = DesiredStateStore::new(Arc::new(MemoryStore::with_record(record)));

    assert_eq!(desired.website_filter().await.unwrap(), WebsiteFilterMode::All);
}

#[tokio::test]
async fn test_add_assigns_increasing_unique_ids() {
    let (_, desired) = setup();

    let first = desired.add_character(model("amiya")).await.unwrap();
    let second = desired.add_character(model("amiya")).await.unwrap();

    assert!(second.id > first.id);
    let ids: Vec<_> = desired
        .characters()
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[1..], [first.id, second.id]);
}

#[tokio::test]
async fn test_update_and_delete() {
    let (_, desired) = setup();
    let added = desired.add_character(model("amiya")).await.unwrap();

    desired.update_character(added.id, model("kaltsit")).await.unwrap();
    let characters = desired.characters().await.unwrap();
    assert_eq!(characters[1].model.id, "kaltsit");

    desired.delete_character(added.id).await.unwrap();
    assert_eq!(desired.characters().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_operations_on_missing_entry_fail() {
    let (_, desired) = setup();

    assert!(matches!(
        desired.update_character(42, model("amiya")).await,
        Err(DomainError::CharacterNotFound(42))
    ));
    assert!(matches!(
        desired.delete_character(42).await,
        Err(DomainError::CharacterNotFound(42))
    ));
}

#[tokio::test]
async fn test_unchanged_update_does_not_notify() {
    let (_, desired) = setup();
    let added = desired.add_character(model("amiya")).await.unwrap();
    let mut changes = desired.subscribe();

    desired.update_character(added.id, model("amiya")).await.unwrap();

    assert!(changes.try_recv().is_err());
}

#[tokio::test]
async fn test_reset_restores_defaults_and_drops_everything_else() {
    let (store, desired) = setup();
    let before = desired.add_character(model("amiya")).await.unwrap();
    desired.set_allow_interaction(false).await.unwrap();
    desired.set_website_filter(WebsiteFilterMode::Whitelist).await.unwrap();
    desired.set_domain_list("example.com").await.unwrap();
    let mut cache = Record::new();
    cache.insert(keys::MODELS.to_string(), json!([]));
    store.set(cache).await.unwrap();

    let characters = desired.reset().await.unwrap();

    assert_eq!(characters.len(), 1);
    assert_eq!(characters[0].model, default_model());
    assert!(characters[0].id > before.id);
    assert!(desired.allow_interaction().await.unwrap());
    assert_eq!(desired.website_filter().await.unwrap(), WebsiteFilterMode::All);
    assert_eq!(desired.domain_list().await.unwrap(), "");
    assert!(store.get(&[keys::MODELS]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_filter_policy_parses_domain_list() {
    let (_, desired) = setup();
    desired.set_website_filter(WebsiteFilterMode::Blacklist).await.unwrap();
    desired
        .set_domain_list("  Example.COM \n\n news.site.org\n")
        .await
        .unwrap();

    let policy = desired.website_filter_policy().await.unwrap();

    assert_eq!(policy.mode, WebsiteFilterMode::Blacklist);
    assert_eq!(policy.patterns, vec!["example.com", "news.site.org"]);
}
