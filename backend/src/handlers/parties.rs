use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::identity::MemberIdentity;
use crate::error::Result;
use crate::models::{LeaveOutcome, Location, Match, NewParty, Party, PartyId, SearchParams};
use crate::services::PartyService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSearchRequest {
    pub location: Location,
    pub search: SearchParams,
}

#[derive(Debug, Serialize)]
pub struct OffsetResponse {
    pub offset: u32,
}

pub async fn create_party(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Json(req): Json<NewParty>,
) -> Result<(StatusCode, Json<Party>)> {
    let party = service.create_party(&member, req).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn get_party(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<Party>> {
    Ok(Json(service.get_party(party_id, &member).await?))
}

pub async fn update_search(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
    Json(req): Json<UpdateSearchRequest>,
) -> Result<Json<Party>> {
    let party = service
        .update_search(party_id, &member, req.location, req.search)
        .await?;
    Ok(Json(party))
}

pub async fn delete_party(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<StatusCode> {
    service.delete_party(party_id, &member).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_party(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<Party>> {
    Ok(Json(service.join_party(party_id, &member).await?))
}

pub async fn leave_party(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<LeaveOutcome>> {
    Ok(Json(service.leave_party(party_id, &member).await?))
}

pub async fn remove_member(
    State(service): State<PartyService>,
    MemberIdentity(admin): MemberIdentity,
    Path((party_id, member_id)): Path<(PartyId, String)>,
) -> Result<Json<LeaveOutcome>> {
    Ok(Json(service.remove_member(party_id, &admin, &member_id).await?))
}

pub async fn get_offset(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<OffsetResponse>> {
    let offset = service.get_offset(party_id, &member).await?;
    Ok(Json(OffsetResponse { offset }))
}

pub async fn list_matches(
    State(service): State<PartyService>,
    MemberIdentity(member): MemberIdentity,
    Path(party_id): Path<PartyId>,
) -> Result<Json<Vec<Match>>> {
    Ok(Json(service.list_matches(party_id, &member).await?))
}
