//! Composite document keys.
//!
//! ```text
//! parties/{party}                      Party
//! parties/{party}/members              MemberSet
//! parties/{party}/offsets              Offsets
//! parties/{party}/swipes/{business}    LedgerEntry
//! parties/{party}/requests/{key}       SwipeReceipt
//! parties/{party}/resolved/{business}  Resolution
//! matches/{party}/{match}              Match
//! blocks/{member}                      BlockedBusinesses
//! ```
//!
//! Matches live outside the party prefix so they survive dissolution.

use uuid::Uuid;

pub const PARTIES_PREFIX: &str = "parties/";

pub fn party(party_id: &Uuid) -> String {
    format!("parties/{party_id}")
}

/// Prefix of every child document of a party, excluding the party itself.
pub fn party_children(party_id: &Uuid) -> String {
    format!("parties/{party_id}/")
}

pub fn member_set(party_id: &Uuid) -> String {
    format!("parties/{party_id}/members")
}

pub fn offsets(party_id: &Uuid) -> String {
    format!("parties/{party_id}/offsets")
}

pub fn ledger_entry(party_id: &Uuid, business_id: &str) -> String {
    format!("parties/{party_id}/swipes/{business_id}")
}

pub fn ledger_prefix(party_id: &Uuid) -> String {
    format!("parties/{party_id}/swipes/")
}

pub fn receipt(party_id: &Uuid, idempotency_key: &str) -> String {
    format!("parties/{party_id}/requests/{idempotency_key}")
}

pub fn receipt_prefix(party_id: &Uuid) -> String {
    format!("parties/{party_id}/requests/")
}

pub fn resolution(party_id: &Uuid, business_id: &str) -> String {
    format!("parties/{party_id}/resolved/{business_id}")
}

pub fn resolution_prefix(party_id: &Uuid) -> String {
    format!("parties/{party_id}/resolved/")
}

pub fn match_record(party_id: &Uuid, match_id: &Uuid) -> String {
    format!("matches/{party_id}/{match_id}")
}

pub fn match_prefix(party_id: &Uuid) -> String {
    format!("matches/{party_id}/")
}

pub fn blocks(member_id: &str) -> String {
    format!("blocks/{member_id}")
}

/// Extracts the party id from any key under [`PARTIES_PREFIX`].
pub fn parse_party(key: &str) -> Option<Uuid> {
    let rest = key.strip_prefix(PARTIES_PREFIX)?;
    let party = rest.split('/').next()?;
    party.parse().ok()
}
