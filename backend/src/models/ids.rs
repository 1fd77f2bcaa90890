use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub type PartyId = Uuid;
pub type MemberId = String;
pub type BusinessId = String;

// Ids become path segments of document keys, so `/` must never appear.
static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:@-]{1,128}$").expect("static id pattern"));

/// Reject ids that cannot be used as a document key segment.
pub fn validate_id(kind: &str, value: &str) -> Result<()> {
    if ID_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!("malformed {kind} id: {value:?}")))
    }
}
