use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::BusinessId;
use super::party::Location;

/// A candidate business as served to a member.
///
/// `index` is the absolute position in the party's result stream for the
/// current search and drives offset advancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: BusinessId,
    pub index: u32,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Location>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePage {
    /// Upstream result count, capped.
    pub total: u32,
    /// The cursor the page was fetched from.
    pub offset: u32,
    pub businesses: Vec<Business>,
    /// Index after the last business the provider returned, blocked ones included.
    pub next_offset_hint: u32,
}

/// Businesses a member never wants to see again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockedBusinesses(pub BTreeSet<BusinessId>);
