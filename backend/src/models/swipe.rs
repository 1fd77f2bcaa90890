use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::business::Business;
use super::ids::{BusinessId, MemberId};
use super::matches::Match;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwipeAction {
    Dislike,
    Like,
    SuperLike,
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dislike => "dislike",
            Self::Like => "like",
            Self::SuperLike => "super-like",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Like | Self::SuperLike)
    }
}

impl fmt::Display for SwipeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwipeAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dislike" => Ok(Self::Dislike),
            "like" => Ok(Self::Like),
            "super-like" | "superlike" => Ok(Self::SuperLike),
            other => Err(AppError::InvalidState(format!("unknown swipe action: {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Pending,
    Dislike,
    Like,
    SuperLike,
}

impl Decision {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swipe {
    pub action: SwipeAction,
    pub timestamp: DateTime<Utc>,
    /// Write order within the entry; breaks timestamp ties.
    pub seq: u64,
}

/// Open votes for one (party, business) pair.
///
/// Created by the first swipe and deleted once the pair resolves, so the next
/// swipe on the same business starts a fresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub business: Business,
    pub swipes: BTreeMap<MemberId, Swipe>,
    pub next_seq: u64,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(business: Business, now: DateTime<Utc>) -> Self {
        Self {
            business,
            swipes: BTreeMap::new(),
            next_seq: 0,
            updated_at: now,
        }
    }

    /// Upsert a member's vote. A repeated swipe replaces the earlier one.
    pub fn record(&mut self, member_id: &str, action: SwipeAction, at: DateTime<Utc>) {
        let swipe = Swipe {
            action,
            timestamp: at,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.swipes.insert(member_id.to_string(), swipe);
        self.updated_at = at;
    }

    /// Drop votes of members no longer in `keep`. Returns how many were dropped.
    pub fn retain_members(&mut self, keep: impl Fn(&str) -> bool) -> usize {
        let before = self.swipes.len();
        self.swipes.retain(|member, _| keep(member));
        before - self.swipes.len()
    }

    pub fn last_swipe_at(&self) -> DateTime<Utc> {
        self.swipes
            .values()
            .map(|s| s.timestamp)
            .max()
            .unwrap_or(self.updated_at)
    }
}

/// Result of one swipe as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeOutcome {
    pub decision: Decision,
    #[serde(rename = "match")]
    pub matched: Option<Match>,
    /// The caller's cursor after the swipe.
    pub offset: u32,
}

/// Stored under an idempotency key so a retried swipe replays its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeReceipt {
    pub member_id: MemberId,
    pub business_id: BusinessId,
    pub action: SwipeAction,
    pub outcome: SwipeOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Final votes of a resolved (party, business) pair.
///
/// Kept until the party's search space changes, so a retried swipe that
/// repeats one of these votes replays the decision instead of opening a new
/// cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub business_id: BusinessId,
    pub votes: BTreeMap<MemberId, SwipeAction>,
    pub decision: Decision,
    #[serde(rename = "match")]
    pub matched: Option<Match>,
    pub resolved_at: DateTime<Utc>,
}

impl Resolution {
    /// Whether `action` by `member_id` is one of the deciding votes.
    pub fn repeats(&self, member_id: &str, action: SwipeAction) -> bool {
        self.votes.get(member_id) == Some(&action)
    }
}
