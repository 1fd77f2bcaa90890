pub mod identity;
pub mod parties;
pub mod swipes;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::services::PartyService;

pub use identity::{IdempotencyKey, MemberIdentity};

/// API routes without transport layers (CORS is added by the server binary).
pub fn router(service: PartyService) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/parties", post(parties::create_party))
        .route(
            "/api/parties/{party_id}",
            get(parties::get_party).delete(parties::delete_party),
        )
        .route("/api/parties/{party_id}/search", put(parties::update_search))
        .route("/api/parties/{party_id}/join", post(parties::join_party))
        .route("/api/parties/{party_id}/leave", post(parties::leave_party))
        .route(
            "/api/parties/{party_id}/members/{member_id}",
            delete(parties::remove_member),
        )
        .route("/api/parties/{party_id}/swipes", post(swipes::record_swipe))
        .route("/api/parties/{party_id}/candidates", get(swipes::fetch_candidates))
        .route("/api/parties/{party_id}/offset", get(parties::get_offset))
        .route("/api/parties/{party_id}/matches", get(parties::list_matches))
        .route(
            "/api/blocks/{business_id}",
            put(swipes::block_business).delete(swipes::unblock_business),
        )
        .with_state(service)
}

async fn health_check() -> &'static str {
    "OK"
}
