//! Swipe ledger: one open vote map per (party, business).

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::matcher::{self, Verdict};
use super::transaction::{Executor, Transaction};
use crate::db::keys;
use crate::error::{AppError, Result};
use crate::models::{
    Business, LedgerEntry, MemberId, MemberSet, Offsets, PartyId, Resolution, SwipeAction,
    SwipeOutcome, SwipeReceipt, validate_id,
};

#[derive(Debug, Clone)]
pub struct SwipeRequest {
    pub party_id: PartyId,
    pub member_id: MemberId,
    pub business: Business,
    pub action: SwipeAction,
    /// Client key that makes a retried request replay its first outcome.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub entries_scanned: usize,
    pub swipes_pruned: usize,
    pub entries_expired: usize,
    pub resolutions_expired: usize,
    pub receipts_expired: usize,
}

impl SweepReport {
    fn absorb(&mut self, other: SweepReport) {
        self.entries_scanned += other.entries_scanned;
        self.swipes_pruned += other.swipes_pruned;
        self.entries_expired += other.entries_expired;
        self.resolutions_expired += other.resolutions_expired;
        self.receipts_expired += other.receipts_expired;
    }

    fn changed_anything(&self) -> bool {
        self.swipes_pruned + self.entries_expired + self.resolutions_expired + self.receipts_expired
            > 0
    }
}

/// Writes the verdict for `entry` into `tx`.
///
/// A pending entry is kept while it holds votes and dropped once it holds
/// none. A resolved entry is replaced by its [`Resolution`], plus the match
/// record on a positive consensus.
pub(crate) fn apply_verdict(
    tx: &mut Transaction,
    party_id: &PartyId,
    entry: &LedgerEntry,
    verdict: &Verdict,
    now: DateTime<Utc>,
) -> Result<()> {
    let key = keys::ledger_entry(party_id, &entry.business.id);
    if let Verdict::Pending = verdict {
        if entry.swipes.is_empty() {
            tx.delete(&key);
        } else {
            tx.put(&key, entry)?;
        }
        return Ok(());
    }

    tx.delete(&key);
    let matched = match verdict {
        Verdict::Matched(record) => {
            tx.create(&keys::match_record(party_id, &record.id), record)?;
            Some(record.clone())
        }
        _ => None,
    };
    let resolution = Resolution {
        business_id: entry.business.id.clone(),
        votes: entry
            .swipes
            .iter()
            .map(|(member, swipe)| (member.clone(), swipe.action))
            .collect(),
        decision: verdict.decision(),
        matched,
        resolved_at: now,
    };
    tx.put(&keys::resolution(party_id, &entry.business.id), &resolution)
}

#[derive(Clone)]
pub struct SwipeLedger {
    executor: Executor,
}

impl SwipeLedger {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    /// Records a swipe, advances the member's cursor past the business and
    /// resolves the entry if the party now agrees, all in one transaction.
    pub async fn record_swipe(&self, request: SwipeRequest) -> Result<SwipeOutcome> {
        validate_id("business", &request.business.id)?;
        validate_id("member", &request.member_id)?;
        if let Some(key) = &request.idempotency_key {
            validate_id("idempotency key", key)?;
        }

        let outcome = self
            .executor
            .run("record_swipe", |tx| {
                let request = request.clone();
                async move { record_in(tx, &request, Utc::now()).await }
            })
            .await?;

        if let Some(record) = &outcome.matched {
            info!(
                party = %request.party_id,
                business = %record.business.id,
                kind = ?record.kind,
                last_to_swipe = %record.last_to_swipe,
                "party matched"
            );
        }
        Ok(outcome)
    }

    /// Sweeps every party that has documents under the party prefix. Parties
    /// are swept independently, each in its own transaction.
    pub async fn sweep(&self, retention: Duration, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut parties: Vec<PartyId> = self
            .executor
            .store()
            .list(keys::PARTIES_PREFIX)
            .await?
            .into_iter()
            .filter_map(|kv| keys::parse_party(&kv.key))
            .collect();
        parties.dedup();

        let mut total = SweepReport::default();
        for party_id in parties {
            let report = self.sweep_party(party_id, retention, now).await?;
            if report.changed_anything() {
                info!(
                    party = %party_id,
                    pruned = report.swipes_pruned,
                    expired = report.entries_expired,
                    resolutions = report.resolutions_expired,
                    receipts = report.receipts_expired,
                    "swept party ledger"
                );
            }
            total.absorb(report);
        }
        Ok(total)
    }

    /// Drops swipes of departed members, then every ledger entry, resolution
    /// and receipt idle since before `now - retention`. One transaction per
    /// party.
    pub async fn sweep_party(
        &self,
        party_id: PartyId,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<SweepReport> {
        let cutoff = now - retention;
        self.executor
            .run("sweep_ledger", |mut tx| async move {
                let mut report = SweepReport::default();
                let members: MemberSet = tx
                    .get(&keys::member_set(&party_id))
                    .await?
                    .unwrap_or_default();

                for key in tx.list_keys(&keys::ledger_prefix(&party_id)).await? {
                    let Some(mut entry) = tx.get::<LedgerEntry>(&key).await? else {
                        continue;
                    };
                    report.entries_scanned += 1;

                    let pruned = entry.retain_members(|m| members.contains(m));
                    report.swipes_pruned += pruned;

                    if entry.swipes.is_empty() || entry.last_swipe_at() < cutoff {
                        tx.delete(&key);
                        report.entries_expired += 1;
                    } else if pruned > 0 {
                        tx.put(&key, &entry)?;
                    }
                }

                for key in tx.list_keys(&keys::resolution_prefix(&party_id)).await? {
                    if let Some(resolution) = tx.get::<Resolution>(&key).await? {
                        if resolution.resolved_at < cutoff {
                            tx.delete(&key);
                            report.resolutions_expired += 1;
                        }
                    }
                }

                for key in tx.list_keys(&keys::receipt_prefix(&party_id)).await? {
                    if let Some(receipt) = tx.get::<SwipeReceipt>(&key).await? {
                        if receipt.recorded_at < cutoff {
                            tx.delete(&key);
                            report.receipts_expired += 1;
                        }
                    }
                }
                Ok((tx, report))
            })
            .await
    }
}

async fn record_in(
    mut tx: Transaction,
    request: &SwipeRequest,
    now: DateTime<Utc>,
) -> Result<(Transaction, SwipeOutcome)> {
    let party_id = request.party_id;
    let member_id = request.member_id.as_str();
    let business_id = request.business.id.as_str();

    let members: MemberSet = tx
        .require(&keys::member_set(&party_id), "party")
        .await?;
    if !members.contains(member_id) {
        return Err(AppError::Unauthorized(format!(
            "{member_id} is not a member of party {party_id}"
        )));
    }

    let receipt_key = request
        .idempotency_key
        .as_deref()
        .map(|key| keys::receipt(&party_id, key));
    if let Some(receipt_key) = &receipt_key {
        if let Some(receipt) = tx.get::<SwipeReceipt>(receipt_key).await? {
            let same_request = receipt.member_id == member_id
                && receipt.business_id == business_id
                && receipt.action == request.action;
            if !same_request {
                return Err(AppError::InvalidState(
                    "idempotency key was already used for a different swipe".to_string(),
                ));
            }
            return Ok((tx, receipt.outcome));
        }
    }

    let offsets_key = keys::offsets(&party_id);
    let mut offsets: Offsets = tx.get(&offsets_key).await?.unwrap_or_default();
    let offset = offsets.advance(member_id, request.business.index.saturating_add(1));
    tx.put(&offsets_key, &offsets)?;

    let entry_key = keys::ledger_entry(&party_id, business_id);
    let open: Option<LedgerEntry> = tx.get(&entry_key).await?;

    // With no open cycle, a vote that repeats a deciding vote is a retry of
    // the swipe that resolved the business. Any other vote re-opens it.
    let mut replayed = None;
    if open.is_none() {
        let resolution_key = keys::resolution(&party_id, business_id);
        if let Some(resolution) = tx.get::<Resolution>(&resolution_key).await? {
            if resolution.repeats(member_id, request.action) {
                replayed = Some(SwipeOutcome {
                    decision: resolution.decision,
                    matched: resolution.matched,
                    offset,
                });
            } else {
                tx.delete(&resolution_key);
            }
        }
    }

    let outcome = match replayed {
        Some(outcome) => outcome,
        None => {
            let mut entry = open.unwrap_or_else(|| LedgerEntry::new(request.business.clone(), now));
            entry.retain_members(|m| members.contains(m));
            entry.record(member_id, request.action, now);

            let verdict = matcher::evaluate(party_id, &members.ids(), &entry, now);
            apply_verdict(&mut tx, &party_id, &entry, &verdict, now)?;

            SwipeOutcome {
                decision: verdict.decision(),
                matched: match verdict {
                    Verdict::Matched(record) => Some(record),
                    _ => None,
                },
                offset,
            }
        }
    };

    if let Some(receipt_key) = &receipt_key {
        let receipt = SwipeReceipt {
            member_id: member_id.to_string(),
            business_id: business_id.to_string(),
            action: request.action,
            outcome: outcome.clone(),
            recorded_at: now,
        };
        tx.create(receipt_key, &receipt)?;
    }

    Ok((tx, outcome))
}
