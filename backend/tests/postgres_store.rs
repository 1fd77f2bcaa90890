//! Commit semantics of the Postgres document store.
//!
//! Runs against `DATABASE_URL` and returns early when it is unset. Every test
//! writes under its own random prefix so runs never collide.

use std::sync::Arc;

use party_match::db::{
    get_db_pool, migrations::run_migrations, CommitOutcome, DatabaseConfig, DocumentStore,
    Mutation, PgDocumentStore, Precondition, WriteBatch,
};
use serde_json::json;
use uuid::Uuid;

async fn store() -> Option<PgDocumentStore> {
    let Ok(config) = DatabaseConfig::from_env() else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let pool = get_db_pool(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Some(PgDocumentStore::new(pool))
}

fn scope() -> String {
    format!("test/{}/", Uuid::new_v4())
}

fn put(key: &str, value: serde_json::Value, precondition: Precondition) -> WriteBatch {
    let mut batch = WriteBatch::default();
    batch.preconditions.insert(key.to_string(), precondition);
    batch.mutations.insert(key.to_string(), Mutation::Put(value));
    batch
}

#[tokio::test]
async fn versions_increase_and_stale_writes_conflict() {
    let Some(store) = store().await else { return };
    let key = format!("{}doc", scope());

    let outcome = store.commit(put(&key, json!(1), Precondition::Absent)).await.unwrap();
    assert_eq!(outcome, CommitOutcome::Committed);
    assert_eq!(store.get(&key).await.unwrap().unwrap().version, 1);

    let outcome = store.commit(put(&key, json!(2), Precondition::Version(1))).await.unwrap();
    assert_eq!(outcome, CommitOutcome::Committed);
    let doc = store.get(&key).await.unwrap().unwrap();
    assert_eq!((doc.value, doc.version), (json!(2), 2));

    let stale = store.commit(put(&key, json!(3), Precondition::Version(1))).await.unwrap();
    assert_eq!(stale, CommitOutcome::Conflict { key: key.clone() });
    assert_eq!(store.get(&key).await.unwrap().unwrap().value, json!(2));
}

#[tokio::test]
async fn create_over_existing_key_conflicts() {
    let Some(store) = store().await else { return };
    let key = format!("{}doc", scope());

    store.commit(put(&key, json!("first"), Precondition::Absent)).await.unwrap();
    let again = store.commit(put(&key, json!("second"), Precondition::Absent)).await.unwrap();

    assert!(matches!(again, CommitOutcome::Conflict { .. }));
    assert_eq!(store.get(&key).await.unwrap().unwrap().value, json!("first"));
}

#[tokio::test]
async fn prefix_read_detects_new_key() {
    let Some(store) = store().await else { return };
    let prefix = scope();
    let a = format!("{prefix}a");
    store.commit(put(&a, json!(1), Precondition::Absent)).await.unwrap();

    let observed = store.list(&prefix).await.unwrap();
    assert_eq!(observed.len(), 1);

    let b = format!("{prefix}b");
    store.commit(put(&b, json!(1), Precondition::Absent)).await.unwrap();

    let mut batch = put(&format!("{prefix}summary"), json!(1), Precondition::Absent);
    batch.prefix_reads.insert(prefix.clone(), observed);
    let outcome = store.commit(batch).await.unwrap();
    assert_eq!(outcome, CommitOutcome::Conflict { key: prefix.clone() });
    assert_eq!(store.list(&prefix).await.unwrap().len(), 2);
}

#[tokio::test]
async fn prefix_listing_treats_wildcards_literally() {
    let Some(store) = store().await else { return };
    let prefix = scope();
    store
        .commit(put(&format!("{prefix}a_b/1"), json!(1), Precondition::Absent))
        .await
        .unwrap();
    store
        .commit(put(&format!("{prefix}axb/1"), json!(1), Precondition::Absent))
        .await
        .unwrap();

    let listed = store.list(&format!("{prefix}a_b/")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, format!("{prefix}a_b/1"));
}

#[tokio::test]
async fn delete_removes_document() {
    let Some(store) = store().await else { return };
    let key = format!("{}doc", scope());
    store.commit(put(&key, json!(1), Precondition::Absent)).await.unwrap();

    let mut batch = WriteBatch::default();
    batch.preconditions.insert(key.clone(), Precondition::Version(1));
    batch.mutations.insert(key.clone(), Mutation::Delete);
    assert_eq!(store.commit(batch).await.unwrap(), CommitOutcome::Committed);
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creates_commit_exactly_once() {
    let Some(store) = store().await else { return };
    let store = Arc::new(store);
    let key = format!("{}doc", scope());

    let mut handles = Vec::new();
    for writer in 0..8 {
        let store = store.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store.commit(put(&key, json!(writer), Precondition::Absent)).await.unwrap()
        }));
    }

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap() == CommitOutcome::Committed {
            committed += 1;
        }
    }
    assert_eq!(committed, 1);
    assert_eq!(store.get(&key).await.unwrap().unwrap().version, 1);
}
