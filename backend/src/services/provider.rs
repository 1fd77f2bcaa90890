use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::constants::DEFAULT_SEARCH_CATEGORY;
use crate::error::{AppError, Result};
use crate::models::{Business, Location, SearchParams};

/// One page request against the external business search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub location: Location,
    pub params: SearchParams,
    pub offset: u32,
    pub limit: u32,
}

/// Provider results. `index` on each business is left at zero; the
/// paginator assigns absolute positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub total: u32,
    pub businesses: Vec<Business>,
}

#[async_trait]
pub trait CandidateProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults>;
}

#[derive(Debug, Deserialize)]
struct YelpSearchResponse {
    total: u32,
    businesses: Vec<YelpBusiness>,
}

#[derive(Debug, Deserialize)]
struct YelpBusiness {
    id: String,
    name: String,
    image_url: Option<String>,
    url: Option<String>,
    rating: Option<f32>,
    review_count: Option<u32>,
    price: Option<String>,
    #[serde(default)]
    categories: Vec<YelpCategory>,
    coordinates: Option<YelpCoordinates>,
    location: Option<YelpLocation>,
    distance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YelpCategory {
    alias: String,
}

#[derive(Debug, Deserialize)]
struct YelpCoordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YelpLocation {
    #[serde(default)]
    display_address: Vec<String>,
}

impl From<YelpBusiness> for Business {
    fn from(b: YelpBusiness) -> Self {
        let coordinates = b.coordinates.and_then(|c| match (c.latitude, c.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location { latitude, longitude }),
            _ => None,
        });
        let address = b
            .location
            .map(|l| l.display_address.join(", "))
            .filter(|a| !a.is_empty());

        Business {
            id: b.id,
            index: 0,
            name: b.name,
            image_url: b.image_url.filter(|u| !u.is_empty()),
            url: b.url,
            rating: b.rating,
            review_count: b.review_count,
            price: b.price,
            categories: b.categories.into_iter().map(|c| c.alias).collect(),
            address,
            coordinates,
            distance_meters: b.distance,
        }
    }
}

/// `"1,2,3"` for a ceiling of 3.
fn price_filter(max_price: u8) -> String {
    (1..=max_price)
        .map(|tier| tier.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn category_filter(params: &SearchParams) -> String {
    if params.categories.is_empty() {
        DEFAULT_SEARCH_CATEGORY.to_string()
    } else {
        params.categories.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Yelp Fusion business search client.
#[derive(Debug, Clone)]
pub struct YelpProvider {
    client: Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl YelpProvider {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl CandidateProvider for YelpProvider {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        let params = &query.params;
        let request = self
            .client
            .get(&self.api_url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("latitude", query.location.latitude.to_string()),
                ("longitude", query.location.longitude.to_string()),
                ("radius", params.radius_meters.to_string()),
                ("price", price_filter(params.max_price)),
                ("categories", category_filter(params)),
                ("open_now", params.open_now.to_string()),
                ("offset", query.offset.to_string()),
                ("limit", query.limit.to_string()),
            ])
            .timeout(self.timeout);

        let response = request.send().await.map_err(|e| {
            tracing::warn!("Search provider request failed: {}", e);
            AppError::ProviderUnavailable(e.to_string())
        })?;

        if !response.status().is_success() {
            tracing::warn!("Search provider returned error status: {}", response.status());
            return Err(AppError::ProviderUnavailable(format!(
                "search provider returned {}",
                response.status()
            )));
        }

        let body: YelpSearchResponse = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse search provider response: {}", e);
            AppError::ProviderUnavailable(format!("invalid search response: {e}"))
        })?;

        Ok(SearchResults {
            total: body.total,
            businesses: body.businesses.into_iter().map(Business::from).collect(),
        })
    }
}
