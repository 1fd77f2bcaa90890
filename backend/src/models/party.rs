use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{MemberId, PartyId};
use super::matches::Match;
use crate::constants::{MAX_PRICE_TIER, MAX_SEARCH_RADIUS_METERS};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn validate(&self) -> Result<()> {
        let lat_ok = (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "location out of range: {}, {}",
                self.latitude, self.longitude
            )))
        }
    }
}

/// The query a party swipes through. Candidate indices are scoped to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub radius_meters: u32,
    /// Highest price tier included, 1 (`$`) through 4 (`$$$$`).
    pub max_price: u8,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub open_now: bool,
}

impl SearchParams {
    pub fn validate(&self) -> Result<()> {
        if self.radius_meters == 0 || self.radius_meters > MAX_SEARCH_RADIUS_METERS {
            return Err(AppError::InvalidState(format!(
                "radius must be within 1..={MAX_SEARCH_RADIUS_METERS} meters"
            )));
        }
        if self.max_price == 0 || self.max_price > MAX_PRICE_TIER {
            return Err(AppError::InvalidState(format!(
                "price ceiling must be within 1..={MAX_PRICE_TIER}"
            )));
        }
        Ok(())
    }
}

/// Authoritative party document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: PartyId,
    pub name: String,
    pub admin: MemberId,
    pub members: BTreeSet<MemberId>,
    pub location: Location,
    pub search: SearchParams,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Party {
    pub fn is_admin(&self, member_id: &str) -> bool {
        self.admin == member_id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParty {
    pub name: String,
    pub location: Location,
    pub search: SearchParams,
}

/// Denormalized copy of `Party::members` for cheap membership checks.
///
/// Always written in the same transaction as the party document, so the key
/// set equals `Party::members` in every committed state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberSet(BTreeMap<MemberId, bool>);

impl MemberSet {
    pub fn from_members<'a>(members: impl IntoIterator<Item = &'a MemberId>) -> Self {
        Self(members.into_iter().map(|m| (m.clone(), true)).collect())
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.0.contains_key(member_id)
    }

    pub fn insert(&mut self, member_id: MemberId) -> bool {
        self.0.insert(member_id, true).is_none()
    }

    pub fn remove(&mut self, member_id: &str) -> bool {
        self.0.remove(member_id).is_some()
    }

    pub fn ids(&self) -> BTreeSet<MemberId> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, members: &BTreeSet<MemberId>) -> bool {
        self.0.len() == members.len() && members.iter().all(|m| self.0.contains_key(m))
    }
}

/// Per-member read cursors into the party's candidate stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offsets(BTreeMap<MemberId, u32>);

impl Offsets {
    pub fn get(&self, member_id: &str) -> u32 {
        self.0.get(member_id).copied().unwrap_or(0)
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.0.contains_key(member_id)
    }

    /// Insert a zero cursor if the member has none yet.
    pub fn ensure(&mut self, member_id: &str) -> bool {
        if self.0.contains_key(member_id) {
            return false;
        }
        self.0.insert(member_id.to_string(), 0);
        true
    }

    /// Move the cursor forward to `to`. Never moves it backwards.
    pub fn advance(&mut self, member_id: &str, to: u32) -> u32 {
        let cursor = self.0.entry(member_id.to_string()).or_insert(0);
        *cursor = (*cursor).max(to);
        *cursor
    }

    pub fn reset(&mut self) {
        self.0.values_mut().for_each(|c| *c = 0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveOutcome {
    /// The admin left and the party was deleted.
    pub dissolved: bool,
    /// Matches produced by re-evaluating open ledger entries.
    pub matches: Vec<Match>,
    /// Ledger entries resolved as dislike consensus by the departure.
    pub dismissed: usize,
}
