use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::identity::{IdempotencyKey, MemberIdentity};
use crate::error::Result;
use crate::models::{Business, CandidatePage, PartyId, SwipeAction, SwipeOutcome};
use crate::services::{PartyService, SwipeRequest};

#[derive(Debug, Deserialize)]
pub struct SwipeBody {
    pub business: Business,
    /// Parsed by hand so unknown actions surface as `InvalidState`.
    pub action: String,
}

pub async fn record_swipe(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    IdempotencyKey(idempotency_key): IdempotencyKey,
    Path(party_id): Path<PartyId>,
    Json(body): Json<SwipeBody>,
) -> Result<Json<SwipeOutcome>> {
    let action: SwipeAction = body.action.parse()?;
    let outcome = service
        .record_swipe(SwipeRequest {
            party_id,
            member_id: member,
            business: body.business,
            action,
            idempotency_key,
        })
        .await?;
    Ok(Json(outcome))
}

pub async fn fetch_candidates(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<CandidatePage>> {
    Ok(Json(service.fetch_candidate_page(party_id, &member).await?))
}

pub async fn block_business(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(business_id): Path<String>,
) -> Result<StatusCode> {
    service.set_blocked(&member, &business_id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unblock_business(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(business_id): Path<String>,
) -> Result<StatusCode> {
    service.set_blocked(&member, &business_id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}
