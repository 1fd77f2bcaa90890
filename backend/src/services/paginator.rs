//! Candidate pagination over the external search.
//!
//! Each member reads the party's result stream from their own cursor. Pages
//! are fetched outside any transaction; the cursor only moves when a swipe
//! is recorded.

use std::sync::Arc;

use super::blocklist::BlockList;
use super::provider::{CandidateProvider, SearchQuery};
use crate::constants::{CANDIDATE_PAGE_SIZE, MAX_CANDIDATE_RESULTS};
use crate::error::Result;
use crate::models::{CandidatePage, Party};

#[derive(Clone)]
pub struct Paginator {
    provider: Arc<dyn CandidateProvider>,
    blocklist: Arc<dyn BlockList>,
    page_size: u32,
    max_results: u32,
}

impl Paginator {
    pub fn new(provider: Arc<dyn CandidateProvider>, blocklist: Arc<dyn BlockList>) -> Self {
        Self {
            provider,
            blocklist,
            page_size: CANDIDATE_PAGE_SIZE,
            max_results: MAX_CANDIDATE_RESULTS,
        }
    }

    /// Fetches the page starting at `offset` for `member_id`.
    ///
    /// Every returned business carries `index = offset + position` in the
    /// provider's page, so blocked businesses leave gaps in the sequence.
    /// The request is clamped so it never reaches past the result cap.
    pub async fn fetch_page(
        &self,
        party: &Party,
        member_id: &str,
        offset: u32,
    ) -> Result<CandidatePage> {
        let limit = self.page_size.min(self.max_results.saturating_sub(offset));
        if limit == 0 {
            return Ok(CandidatePage {
                total: self.max_results,
                offset,
                businesses: Vec::new(),
                next_offset_hint: offset,
            });
        }

        let query = SearchQuery {
            location: party.location,
            params: party.search.clone(),
            offset,
            limit,
        };
        let results = self.provider.search(&query).await?;
        let total = results.total.min(self.max_results);

        let mut fetched: u32 = 0;
        let mut businesses = Vec::with_capacity(results.businesses.len());
        for (position, mut business) in results.businesses.into_iter().enumerate().take(limit as usize) {
            fetched += 1;
            business.index = offset + position as u32;
            if self.blocklist.is_blocked(member_id, &business.id).await? {
                tracing::debug!(member = member_id, business = %business.id, "skipping blocked candidate");
                continue;
            }
            businesses.push(business);
        }

        Ok(CandidatePage {
            total,
            offset,
            businesses,
            next_offset_hint: offset + fetched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Business, Location, SearchParams};
    use crate::services::provider::SearchResults;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::{BTreeSet, HashSet};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingProvider {
        total: u32,
        queries: Mutex<Vec<SearchQuery>>,
        fail: bool,
    }

    #[async_trait]
    impl CandidateProvider for RecordingProvider {
        async fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail {
                return Err(AppError::ProviderUnavailable("timed out".into()));
            }
            let end = (query.offset + query.limit).min(self.total);
            let businesses = (query.offset..end)
                .map(|i| Business {
                    id: format!("biz-{i}"),
                    index: 0,
                    name: format!("Business {i}"),
                    image_url: None,
                    url: None,
                    rating: None,
                    review_count: None,
                    price: None,
                    categories: Vec::new(),
                    address: None,
                    coordinates: None,
                    distance_meters: None,
                })
                .collect();
            Ok(SearchResults { total: self.total, businesses })
        }
    }

    struct Blocked(HashSet<String>);

    #[async_trait]
    impl BlockList for Blocked {
        async fn is_blocked(&self, member_id: &str, business_id: &str) -> Result<bool> {
            Ok(member_id == "alice" && self.0.contains(business_id))
        }
    }

    fn party() -> Party {
        Party {
            id: Uuid::new_v4(),
            name: "Lunch".into(),
            admin: "alice".into(),
            members: ["alice".to_string(), "bob".to_string()].into(),
            location: Location { latitude: 37.77, longitude: -122.42 },
            search: SearchParams {
                radius_meters: 2000,
                max_price: 2,
                categories: BTreeSet::new(),
                open_now: true,
            },
            active: true,
            created_at: Utc::now(),
            last_active: Utc::now(),
        }
    }

    fn paginator(total: u32, blocked: &[&str], fail: bool) -> (Paginator, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider { total, queries: Mutex::new(Vec::new()), fail });
        let blocked = Blocked(blocked.iter().map(|s| s.to_string()).collect());
        (Paginator::new(provider.clone(), Arc::new(blocked)), provider)
    }

    #[tokio::test]
    async fn test_indices_are_absolute() {
        let (paginator, _) = paginator(100, &[], false);
        let page = paginator.fetch_page(&party(), "alice", 40).await.unwrap();
        assert_eq!(page.businesses.len(), 20);
        assert!(page.businesses.iter().all(|b| b.index >= 40));
        assert_eq!(page.businesses[2].index, 42);
        assert_eq!(page.businesses[2].id, "biz-42");
        assert_eq!(page.next_offset_hint, 60);
    }

    #[tokio::test]
    async fn test_blocked_candidates_are_filtered_for_requester_only() {
        let (paginator, _) = paginator(100, &["biz-1"], false);
        let alice = paginator.fetch_page(&party(), "alice", 0).await.unwrap();
        assert!(alice.businesses.iter().all(|b| b.id != "biz-1"));
        assert_eq!(alice.businesses.len(), 19);
        assert_eq!(alice.next_offset_hint, 20);

        let bob = paginator.fetch_page(&party(), "bob", 0).await.unwrap();
        assert_eq!(bob.businesses.len(), 20);
    }

    #[tokio::test]
    async fn test_total_is_capped_and_limit_clamped() {
        let (paginator, provider) = paginator(5000, &[], false);
        let page = paginator.fetch_page(&party(), "bob", 990).await.unwrap();
        assert_eq!(page.total, 1000);
        assert_eq!(page.businesses.len(), 10);
        assert_eq!(provider.queries.lock().unwrap()[0].limit, 10);

        let past_end = paginator.fetch_page(&party(), "bob", 1000).await.unwrap();
        assert!(past_end.businesses.is_empty());
        assert_eq!(provider.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_surfaced() {
        let (paginator, _) = paginator(100, &[], true);
        let result = paginator.fetch_page(&party(), "bob", 0).await;
        assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
    }
}
