//! Consensus rules for one ledger entry.
//!
//! Pure functions over a snapshot of the current member set and the swipes
//! recorded for one business. Callers apply the resulting [`Verdict`] inside
//! the transaction that took the snapshot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Decision, LedgerEntry, Match, MatchKind, MemberId, PartyId, Swipe, SwipeAction,
};

/// Classifies a business for the given members.
///
/// Every member must have swiped. All super-likes is `SuperLike`, any mix of
/// likes and super-likes is `Like`, all dislikes is `Dislike`, anything else
/// is `Pending`. Swipes from non-members are ignored. For a lone member the
/// checks overlap and the stronger class wins.
pub fn decide(members: &BTreeSet<MemberId>, swipes: &BTreeMap<MemberId, Swipe>) -> Decision {
    let mut actions = Vec::with_capacity(members.len());
    for member in members {
        match swipes.get(member) {
            Some(swipe) => actions.push(swipe.action),
            None => return Decision::Pending,
        }
    }

    if actions.iter().all(|a| *a == SwipeAction::SuperLike) {
        Decision::SuperLike
    } else if actions.iter().all(SwipeAction::is_positive) {
        Decision::Like
    } else if actions.iter().all(|a| *a == SwipeAction::Dislike) {
        Decision::Dislike
    } else {
        Decision::Pending
    }
}

/// The member whose swipe came last, by timestamp then write order.
pub fn last_to_swipe(
    members: &BTreeSet<MemberId>,
    swipes: &BTreeMap<MemberId, Swipe>,
) -> Option<MemberId> {
    swipes
        .iter()
        .filter(|(member, _)| members.contains(*member))
        .max_by_key(|(_, swipe)| (swipe.timestamp, swipe.seq))
        .map(|(member, _)| member.clone())
}

/// What to do with a ledger entry after a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Keep collecting swipes.
    Pending,
    /// Dislike consensus: drop the entry, no match.
    Dismissed,
    /// Positive consensus: drop the entry and store the match.
    Matched(Match),
}

impl Verdict {
    pub fn decision(&self) -> Decision {
        match self {
            Self::Pending => Decision::Pending,
            Self::Dismissed => Decision::Dislike,
            Self::Matched(m) => match m.kind {
                MatchKind::Like => Decision::Like,
                MatchKind::SuperLike => Decision::SuperLike,
            },
        }
    }
}

/// Decides `entry` for `members` and builds the match record on a positive
/// consensus.
pub fn evaluate(
    party_id: PartyId,
    members: &BTreeSet<MemberId>,
    entry: &LedgerEntry,
    now: DateTime<Utc>,
) -> Verdict {
    let kind = match decide(members, &entry.swipes) {
        Decision::Pending => return Verdict::Pending,
        Decision::Dislike => return Verdict::Dismissed,
        Decision::Like => MatchKind::Like,
        Decision::SuperLike => MatchKind::SuperLike,
    };

    // A positive decision implies every member swiped, so this is only empty
    // for an empty member set.
    let Some(last) = last_to_swipe(members, &entry.swipes) else {
        return Verdict::Pending;
    };

    Verdict::Matched(Match {
        id: Uuid::new_v4(),
        party_id,
        kind,
        created_at: now,
        members: members.iter().cloned().collect(),
        last_to_swipe: last,
        business: entry.business.clone(),
    })
}
