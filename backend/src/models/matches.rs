use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business::Business;
use super::ids::{MemberId, PartyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKind {
    Like,
    SuperLike,
}

/// Immutable record of a positive consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    pub party_id: PartyId,
    #[serde(rename = "type")]
    pub kind: MatchKind,
    pub created_at: DateTime<Utc>,
    /// Members of the party when the decision was taken.
    pub members: Vec<MemberId>,
    /// Member whose swipe completed the consensus.
    pub last_to_swipe: MemberId,
    pub business: Business,
}
