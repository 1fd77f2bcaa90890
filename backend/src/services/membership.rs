//! Party membership: join, leave, admin removal and dissolution.
//!
//! `Party::members` and the denormalized [`MemberSet`] are only ever written
//! together. A shrinking member set re-decides every open ledger entry of the
//! party in the same transaction, since a departure can complete a consensus.

use chrono::{DateTime, Utc};
use tracing::info;

use super::ledger::apply_verdict;
use super::matcher::{self, Verdict};
use super::transaction::{Executor, Transaction};
use crate::db::keys;
use crate::error::{AppError, Result};
use crate::models::{LeaveOutcome, LedgerEntry, MemberId, MemberSet, Party, PartyId, validate_id};

/// Loads the party and its member set, checking they agree.
///
/// The two reads are separate store calls, so a writer can land between
/// them. The executor re-validates the read set before surfacing the
/// mismatch, which turns that case into a retry; only a disagreement in a
/// still-current snapshot reaches the caller as `Storage`.
pub(crate) async fn load_party(tx: &mut Transaction, party_id: &PartyId) -> Result<(Party, MemberSet)> {
    let party: Party = tx.require(&keys::party(party_id), "party").await?;
    let members: MemberSet = tx.require(&keys::member_set(party_id), "party members").await?;
    if !members.matches(&party.members) {
        return Err(AppError::storage(format!(
            "member set of party {party_id} is out of sync with the party document"
        )));
    }
    Ok((party, members))
}

fn write_party(tx: &mut Transaction, party: &Party) -> Result<()> {
    tx.put(&keys::party(&party.id), party)?;
    tx.put(&keys::member_set(&party.id), &MemberSet::from_members(&party.members))
}

/// Deletes every document under the party. Match history is kept.
pub(crate) async fn dissolve_in(tx: &mut Transaction, party_id: &PartyId) -> Result<usize> {
    let children = tx.list_keys(&keys::party_children(party_id)).await?;
    for key in &children {
        tx.delete(key);
    }
    tx.delete(&keys::party(party_id));
    Ok(children.len())
}

/// Removes a non-admin member and re-decides every open ledger entry.
async fn depart_in(
    tx: &mut Transaction,
    mut party: Party,
    member_id: &str,
    now: DateTime<Utc>,
) -> Result<LeaveOutcome> {
    party.members.remove(member_id);
    party.last_active = now;
    write_party(tx, &party)?;

    let mut outcome = LeaveOutcome {
        dissolved: false,
        matches: Vec::new(),
        dismissed: 0,
    };

    for key in tx.list_keys(&keys::ledger_prefix(&party.id)).await? {
        let Some(mut entry) = tx.get::<LedgerEntry>(&key).await? else {
            continue;
        };
        let pruned = entry.retain_members(|m| party.members.contains(m));

        let verdict = matcher::evaluate(party.id, &party.members, &entry, now);
        match &verdict {
            Verdict::Pending if pruned == 0 => continue,
            Verdict::Pending => {}
            Verdict::Dismissed => outcome.dismissed += 1,
            Verdict::Matched(record) => outcome.matches.push(record.clone()),
        }
        apply_verdict(tx, &party.id, &entry, &verdict, now)?;
    }

    Ok(outcome)
}

#[derive(Clone)]
pub struct MembershipCoordinator {
    executor: Executor,
}

impl MembershipCoordinator {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    /// Adds a member. Joining twice is a no-op. Existing ledger entries are
    /// left alone: they stay pending until the newcomer swipes.
    pub async fn join(&self, party_id: PartyId, member_id: &str) -> Result<Party> {
        validate_id("member", member_id)?;
        let member_id = member_id.to_string();

        self.executor
            .run("join_party", |mut tx| {
                let member_id = member_id.clone();
                async move {
                    let (mut party, _) = load_party(&mut tx, &party_id).await?;
                    if party.members.contains(&member_id) {
                        return Ok((tx, party));
                    }
                    if !party.active {
                        return Err(AppError::InvalidState(format!(
                            "party {party_id} is not accepting members"
                        )));
                    }

                    party.members.insert(member_id);
                    party.last_active = Utc::now();
                    write_party(&mut tx, &party)?;
                    Ok((tx, party))
                }
            })
            .await
    }

    /// Removes the caller from the party. The admin leaving dissolves it.
    pub async fn leave(&self, party_id: PartyId, member_id: &str) -> Result<LeaveOutcome> {
        let member_id = member_id.to_string();
        let outcome = self
            .executor
            .run("leave_party", |mut tx| {
                let member_id = member_id.clone();
                async move {
                    let (party, _) = load_party(&mut tx, &party_id).await?;
                    if !party.members.contains(&member_id) {
                        return Err(AppError::InvalidState(format!(
                            "{member_id} is not a member of party {party_id}"
                        )));
                    }

                    if party.is_admin(&member_id) {
                        dissolve_in(&mut tx, &party_id).await?;
                        let outcome = LeaveOutcome {
                            dissolved: true,
                            matches: Vec::new(),
                            dismissed: 0,
                        };
                        return Ok((tx, outcome));
                    }

                    let outcome = depart_in(&mut tx, party, &member_id, Utc::now()).await?;
                    Ok((tx, outcome))
                }
            })
            .await?;

        log_departure(&party_id, &member_id, &outcome);
        Ok(outcome)
    }

    /// Admin-only removal of another member, with the same re-evaluation as
    /// a voluntary leave.
    pub async fn remove_member(
        &self,
        party_id: PartyId,
        admin_id: &str,
        member_id: &str,
    ) -> Result<LeaveOutcome> {
        let admin_id = admin_id.to_string();
        let member_id = member_id.to_string();
        let outcome = self
            .executor
            .run("remove_member", |mut tx| {
                let admin_id = admin_id.clone();
                let member_id = member_id.clone();
                async move {
                    let (party, _) = load_party(&mut tx, &party_id).await?;
                    if !party.is_admin(&admin_id) {
                        return Err(AppError::Unauthorized(format!(
                            "only the admin of party {party_id} can remove members"
                        )));
                    }
                    if party.is_admin(&member_id) {
                        return Err(AppError::InvalidState(
                            "the admin cannot remove themselves; leave the party instead"
                                .to_string(),
                        ));
                    }
                    if !party.members.contains(&member_id) {
                        return Err(AppError::InvalidState(format!(
                            "{member_id} is not a member of party {party_id}"
                        )));
                    }

                    let outcome = depart_in(&mut tx, party, &member_id, Utc::now()).await?;
                    Ok((tx, outcome))
                }
            })
            .await?;

        log_departure(&party_id, &member_id, &outcome);
        Ok(outcome)
    }

    /// Admin-only deletion of the whole party.
    pub async fn dissolve(&self, party_id: PartyId, admin_id: &str) -> Result<()> {
        let admin_id = admin_id.to_string();
        let removed = self
            .executor
            .run("delete_party", |mut tx| {
                let admin_id = admin_id.clone();
                async move {
                    let (party, _) = load_party(&mut tx, &party_id).await?;
                    if !party.is_admin(&admin_id) {
                        return Err(AppError::Unauthorized(format!(
                            "only the admin of party {party_id} can delete it"
                        )));
                    }
                    let removed = dissolve_in(&mut tx, &party_id).await?;
                    Ok((tx, removed))
                }
            })
            .await?;

        info!(party = %party_id, documents = removed + 1, "party deleted");
        Ok(())
    }
}

fn log_departure(party_id: &PartyId, member_id: &MemberId, outcome: &LeaveOutcome) {
    if outcome.dissolved {
        info!(party = %party_id, admin = %member_id, "admin left, party dissolved");
        return;
    }
    info!(
        party = %party_id,
        member = %member_id,
        matches = outcome.matches.len(),
        dismissed = outcome.dismissed,
        "member left party"
    );
    for record in &outcome.matches {
        info!(
            party = %party_id,
            business = %record.business.id,
            kind = ?record.kind,
            last_to_swipe = %record.last_to_swipe,
            "party matched after departure"
        );
    }
}
