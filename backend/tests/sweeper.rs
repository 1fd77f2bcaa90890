//! Ledger retention sweeps.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{business, harness, party_of, swipe};
use party_match::db::{keys, CommitOutcome, DocumentStore, Mutation, WriteBatch};
use party_match::models::{LedgerEntry, SwipeAction::*};
use party_match::services::{Executor, SwipeLedger};

#[tokio::test]
async fn idle_entries_expire_and_fresh_ones_stay() {
    let h = harness();
    let party = party_of(&h.service, "a", &["b"]).await;
    h.service.record_swipe(swipe(party.id, "a", 1, Like)).await.unwrap();
    h.service.record_swipe(swipe(party.id, "a", 2, Like)).await.unwrap();

    let ledger = SwipeLedger::new(Executor::new(h.store.clone()));

    let report = ledger.sweep(Duration::days(30), Utc::now()).await.unwrap();
    assert_eq!(report.entries_scanned, 2);
    assert_eq!(report.entries_expired, 0);

    let later = Utc::now() + Duration::days(31);
    let report = ledger.sweep(Duration::days(30), later).await.unwrap();
    assert_eq!(report.entries_expired, 2);
    assert!(h.store.list(&keys::ledger_prefix(&party.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn stray_votes_of_non_members_are_pruned() {
    let h = harness();
    let party = party_of(&h.service, "a", &["b"]).await;

    let now = Utc::now();
    let mut entry = LedgerEntry::new(business(5), now);
    entry.record("a", Like, now);
    entry.record("ghost", Like, now);
    let mut batch = WriteBatch::default();
    batch.mutations.insert(
        keys::ledger_entry(&party.id, "biz-5"),
        Mutation::Put(serde_json::to_value(&entry).unwrap()),
    );
    assert_eq!(h.store.commit(batch).await.unwrap(), CommitOutcome::Committed);

    let store: Arc<dyn DocumentStore> = h.store.clone();
    let report = SwipeLedger::new(Executor::new(store))
        .sweep_party(party.id, Duration::days(30), Utc::now())
        .await
        .unwrap();
    assert_eq!(report.swipes_pruned, 1);
    assert_eq!(report.entries_expired, 0);

    let doc = h.store.get(&keys::ledger_entry(&party.id, "biz-5")).await.unwrap().unwrap();
    let kept: LedgerEntry = serde_json::from_value(doc.value).unwrap();
    assert_eq!(kept.swipes.keys().collect::<Vec<_>>(), vec!["a"]);
}

#[tokio::test]
async fn service_sweep_covers_every_party() {
    let h = harness();
    let first = party_of(&h.service, "a", &["b"]).await;
    let second = party_of(&h.service, "c", &["d"]).await;
    h.service.record_swipe(swipe(first.id, "a", 1, Dislike)).await.unwrap();
    h.service.record_swipe(swipe(second.id, "c", 1, Dislike)).await.unwrap();

    let report = h.service.sweep_ledgers(Duration::days(30)).await.unwrap();
    assert_eq!(report.entries_scanned, 2);
    assert_eq!(report.swipes_pruned, 0);
}

#[tokio::test]
async fn old_receipts_and_resolutions_expire() {
    let h = harness();
    let party = party_of(&h.service, "a", &["b"]).await;
    h.service.record_swipe(swipe(party.id, "a", 3, Like)).await.unwrap();
    let mut request = swipe(party.id, "b", 3, Like);
    request.idempotency_key = Some("req-0042".into());
    h.service.record_swipe(request).await.unwrap();

    let receipt_key = keys::receipt(&party.id, "req-0042");
    let resolution_key = keys::resolution(&party.id, "biz-3");
    assert!(h.store.get(&receipt_key).await.unwrap().is_some());
    assert!(h.store.get(&resolution_key).await.unwrap().is_some());

    let ledger = SwipeLedger::new(Executor::new(h.store.clone()));
    let report = ledger.sweep(Duration::days(30), Utc::now()).await.unwrap();
    assert_eq!(report.receipts_expired, 0);
    assert_eq!(report.resolutions_expired, 0);

    let later = Utc::now() + Duration::days(31);
    let report = ledger.sweep(Duration::days(30), later).await.unwrap();
    assert_eq!(report.receipts_expired, 1);
    assert_eq!(report.resolutions_expired, 1);
    assert!(h.store.get(&receipt_key).await.unwrap().is_none());
    assert!(h.store.get(&resolution_key).await.unwrap().is_none());

    // Matches are history and outlive the sweep.
    assert_eq!(h.service.list_matches(party.id, "a").await.unwrap().len(), 1);
}
