use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use super::blocklist::StoreBlockList;
use super::ledger::{SweepReport, SwipeLedger, SwipeRequest};
use super::membership::{MembershipCoordinator, load_party};
use super::paginator::Paginator;
use super::provider::CandidateProvider;
use super::transaction::{Executor, Transaction};
use crate::db::{keys, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::{
    CandidatePage, LeaveOutcome, Location, Match, MemberSet, NewParty, Offsets, Party, PartyId,
    SearchParams, SwipeOutcome, validate_id,
};

/// Entry point for every party operation.
#[derive(Clone)]
pub struct PartyService {
    executor: Executor,
    ledger: SwipeLedger,
    membership: MembershipCoordinator,
    paginator: Paginator,
    blocks: StoreBlockList,
}

/// Rejects callers outside the party's member set.
async fn require_member(tx: &mut Transaction, party_id: &PartyId, member_id: &str) -> Result<()> {
    let members: MemberSet = tx.require(&keys::member_set(party_id), "party").await?;
    if members.contains(member_id) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "{member_id} is not a member of party {party_id}"
        )))
    }
}

impl PartyService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn CandidateProvider>,
        tx_max_attempts: u32,
    ) -> Self {
        let executor = Executor::with_max_attempts(store, tx_max_attempts);
        let blocks = StoreBlockList::new(executor.clone());
        Self {
            ledger: SwipeLedger::new(executor.clone()),
            membership: MembershipCoordinator::new(executor.clone()),
            paginator: Paginator::new(provider, Arc::new(blocks.clone())),
            blocks,
            executor,
        }
    }

    pub async fn create_party(&self, admin_id: &str, new_party: NewParty) -> Result<Party> {
        validate_id("member", admin_id)?;
        let name = new_party.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::InvalidState("party name must not be empty".into()));
        }
        new_party.location.validate()?;
        new_party.search.validate()?;

        let now = Utc::now();
        let party = Party {
            id: Uuid::new_v4(),
            name,
            admin: admin_id.to_string(),
            members: [admin_id.to_string()].into(),
            location: new_party.location,
            search: new_party.search,
            active: true,
            created_at: now,
            last_active: now,
        };

        self.executor
            .run("create_party", |mut tx| {
                let party = party.clone();
                async move {
                    tx.create(&keys::party(&party.id), &party)?;
                    tx.create(
                        &keys::member_set(&party.id),
                        &MemberSet::from_members(&party.members),
                    )?;
                    tx.create(&keys::offsets(&party.id), &Offsets::default())?;
                    Ok((tx, party))
                }
            })
            .await?;

        info!(party = %party.id, admin = %party.admin, "party created");
        Ok(party)
    }

    pub async fn get_party(&self, party_id: PartyId, member_id: &str) -> Result<Party> {
        let member_id = member_id.to_string();
        self.executor
            .run("get_party", |mut tx| {
                let member_id = member_id.clone();
                async move {
                    let (party, members) = load_party(&mut tx, &party_id).await?;
                    if !members.contains(&member_id) {
                        return Err(AppError::Unauthorized(format!(
                            "{member_id} is not a member of party {party_id}"
                        )));
                    }
                    Ok((tx, party))
                }
            })
            .await
    }

    /// Replaces the party's search space. Indices are scoped to a query, so
    /// every member's cursor restarts at zero.
    pub async fn update_search(
        &self,
        party_id: PartyId,
        admin_id: &str,
        location: Location,
        search: SearchParams,
    ) -> Result<Party> {
        location.validate()?;
        search.validate()?;
        let admin_id = admin_id.to_string();

        let party = self
            .executor
            .run("update_search", |mut tx| {
                let admin_id = admin_id.clone();
                let search = search.clone();
                async move {
                    let (mut party, _) = load_party(&mut tx, &party_id).await?;
                    if !party.is_admin(&admin_id) {
                        return Err(AppError::Unauthorized(format!(
                            "only the admin of party {party_id} can change its search"
                        )));
                    }

                    party.location = location;
                    party.search = search;
                    party.last_active = Utc::now();
                    tx.put(&keys::party(&party_id), &party)?;

                    let offsets_key = keys::offsets(&party_id);
                    let mut offsets: Offsets = tx.get(&offsets_key).await?.unwrap_or_default();
                    offsets.reset();
                    tx.put(&offsets_key, &offsets)?;

                    // Businesses may be decided again in the new search.
                    for key in tx.list_keys(&keys::resolution_prefix(&party_id)).await? {
                        tx.delete(&key);
                    }
                    Ok((tx, party))
                }
            })
            .await?;

        info!(party = %party_id, "party search updated, offsets and resolutions reset");
        Ok(party)
    }

    pub async fn delete_party(&self, party_id: PartyId, admin_id: &str) -> Result<()> {
        self.membership.dissolve(party_id, admin_id).await
    }

    pub async fn join_party(&self, party_id: PartyId, member_id: &str) -> Result<Party> {
        self.membership.join(party_id, member_id).await
    }

    pub async fn leave_party(&self, party_id: PartyId, member_id: &str) -> Result<LeaveOutcome> {
        self.membership.leave(party_id, member_id).await
    }

    pub async fn remove_member(
        &self,
        party_id: PartyId,
        admin_id: &str,
        member_id: &str,
    ) -> Result<LeaveOutcome> {
        self.membership.remove_member(party_id, admin_id, member_id).await
    }

    pub async fn record_swipe(&self, request: SwipeRequest) -> Result<SwipeOutcome> {
        self.ledger.record_swipe(request).await
    }

    /// Serves the next page from the caller's own cursor, creating the cursor
    /// at zero on first use.
    pub async fn fetch_candidate_page(
        &self,
        party_id: PartyId,
        member_id: &str,
    ) -> Result<CandidatePage> {
        let member = member_id.to_string();
        let (party, offset) = self
            .executor
            .run("open_cursor", |mut tx| {
                let member = member.clone();
                async move {
                    require_member(&mut tx, &party_id, &member).await?;
                    let party: Party = tx.require(&keys::party(&party_id), "party").await?;

                    let offsets_key = keys::offsets(&party_id);
                    let mut offsets: Offsets = tx.get(&offsets_key).await?.unwrap_or_default();
                    if offsets.ensure(&member) {
                        tx.put(&offsets_key, &offsets)?;
                    }
                    let offset = offsets.get(&member);
                    Ok((tx, (party, offset)))
                }
            })
            .await?;

        self.paginator.fetch_page(&party, member_id, offset).await
    }

    pub async fn get_offset(&self, party_id: PartyId, member_id: &str) -> Result<u32> {
        let member = member_id.to_string();
        self.executor
            .run("get_offset", |mut tx| {
                let member = member.clone();
                async move {
                    require_member(&mut tx, &party_id, &member).await?;
                    let offsets: Offsets =
                        tx.get(&keys::offsets(&party_id)).await?.unwrap_or_default();
                    Ok((tx, offsets.get(&member)))
                }
            })
            .await
    }

    /// Matches of the party, newest first.
    pub async fn list_matches(&self, party_id: PartyId, member_id: &str) -> Result<Vec<Match>> {
        let member = member_id.to_string();
        let mut matches = self
            .executor
            .run("list_matches", |mut tx| {
                let member = member.clone();
                async move {
                    require_member(&mut tx, &party_id, &member).await?;
                    let mut matches = Vec::new();
                    for key in tx.list_keys(&keys::match_prefix(&party_id)).await? {
                        if let Some(record) = tx.get::<Match>(&key).await? {
                            matches.push(record);
                        }
                    }
                    Ok((tx, matches))
                }
            })
            .await?;

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    pub async fn set_blocked(&self, member_id: &str, business_id: &str, blocked: bool) -> Result<()> {
        self.blocks.set_blocked(member_id, business_id, blocked).await
    }

    /// Garbage-collects every party ledger.
    pub async fn sweep_ledgers(&self, retention: Duration) -> Result<SweepReport> {
        self.ledger.sweep(retention, Utc::now()).await
    }
}
