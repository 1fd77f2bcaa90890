#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use party_match::db::MemoryDocumentStore;
use party_match::models::{
    Business, Location, NewParty, Party, PartyId, SearchParams, SwipeAction,
};
use party_match::services::{CandidateProvider, SearchQuery, SearchResults, SwipeRequest};
use party_match::{AppError, PartyService};

/// Deterministic search results: business `biz-{i}` sits at position `i`.
pub struct CatalogProvider {
    pub total: u32,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl CatalogProvider {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CandidateProvider for CatalogProvider {
    async fn search(&self, query: &SearchQuery) -> party_match::Result<SearchResults> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ProviderUnavailable("upstream timed out".into()));
        }
        let end = (query.offset + query.limit).min(self.total);
        Ok(SearchResults {
            total: self.total,
            businesses: (query.offset..end).map(business).collect(),
        })
    }
}

pub fn business(index: u32) -> Business {
    Business {
        id: format!("biz-{index}"),
        index,
        name: format!("Restaurant {index}"),
        image_url: None,
        url: None,
        rating: Some(4.0),
        review_count: Some(100),
        price: Some("$$".into()),
        categories: vec!["restaurants".into()],
        address: None,
        coordinates: None,
        distance_meters: None,
    }
}

pub struct Harness {
    pub service: PartyService,
    pub store: Arc<MemoryDocumentStore>,
    pub provider: Arc<CatalogProvider>,
}

pub fn harness() -> Harness {
    harness_with_attempts(8)
}

pub fn harness_with_attempts(attempts: u32) -> Harness {
    let store = Arc::new(MemoryDocumentStore::new());
    let provider = Arc::new(CatalogProvider::new(500));
    let service = PartyService::new(store.clone(), provider.clone(), attempts);
    Harness {
        service,
        store,
        provider,
    }
}

pub fn new_party(name: &str) -> NewParty {
    NewParty {
        name: name.to_string(),
        location: Location {
            latitude: 40.7128,
            longitude: -74.0060,
        },
        search: SearchParams {
            radius_meters: 3000,
            max_price: 3,
            categories: BTreeSet::new(),
            open_now: true,
        },
    }
}

/// Creates a party administered by `admin` and joins `others`.
pub async fn party_of(service: &PartyService, admin: &str, others: &[&str]) -> Party {
    let party = service
        .create_party(admin, new_party("Dinner"))
        .await
        .expect("create party");
    let mut latest = party;
    for member in others {
        latest = service.join_party(latest.id, member).await.expect("join party");
    }
    latest
}

pub fn swipe(party_id: PartyId, member: &str, index: u32, action: SwipeAction) -> SwipeRequest {
    SwipeRequest {
        party_id,
        member_id: member.to_string(),
        business: business(index),
        action,
        idempotency_key: None,
    }
}
