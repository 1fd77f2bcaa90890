pub mod business;
pub mod ids;
pub mod matches;
pub mod party;
pub mod swipe;

pub use business::{BlockedBusinesses, Business, CandidatePage};
pub use ids::{BusinessId, MemberId, PartyId, validate_id};
pub use matches::{Match, MatchKind};
pub use party::{LeaveOutcome, Location, MemberSet, NewParty, Offsets, Party, SearchParams};
pub use swipe::{
    Decision, LedgerEntry, Resolution, Swipe, SwipeAction, SwipeOutcome, SwipeReceipt,
};
