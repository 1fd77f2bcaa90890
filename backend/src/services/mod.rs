pub mod blocklist;
pub mod ledger;
pub mod matcher;
pub mod membership;
pub mod paginator;
pub mod party;
pub mod provider;
pub mod transaction;

pub use blocklist::{BlockList, StoreBlockList};
pub use ledger::{SweepReport, SwipeLedger, SwipeRequest};
pub use matcher::{decide, Verdict};
pub use membership::MembershipCoordinator;
pub use paginator::Paginator;
pub use party::PartyService;
pub use provider::{CandidateProvider, SearchQuery, SearchResults, YelpProvider};
pub use transaction::{Executor, Transaction};
