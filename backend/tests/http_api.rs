//! Router-level tests: headers, status codes and JSON shapes.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use party_match::db::MemoryDocumentStore;
use party_match::handlers;
use party_match::PartyService;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::CatalogProvider;

fn test_router() -> Router {
    let store = Arc::new(MemoryDocumentStore::new());
    let provider = Arc::new(CatalogProvider::new(500));
    handlers::router(PartyService::new(store, provider, 8))
}

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    member: Option<&str>,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(member) = member {
        builder = builder.header("x-member-id", member);
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, parsed)
}

fn party_body() -> Value {
    json!({
        "name": "Friday dinner",
        "location": { "latitude": 37.7749, "longitude": -122.4194 },
        "search": { "radiusMeters": 2000, "maxPrice": 2, "categories": ["thai"], "openNow": false }
    })
}

fn swipe_body(index: u32, action: &str) -> Value {
    json!({
        "business": { "id": format!("biz-{index}"), "index": index, "name": "Thai Place" },
        "action": action
    })
}

async fn create_party(router: &Router, admin: &str) -> String {
    let (status, party) =
        call(router, Method::POST, "/api/parties", Some(admin), &[], Some(party_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    party["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_responds() {
    let router = test_router();
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn full_party_flow_over_http() {
    let router = test_router();
    let party_id = create_party(&router, "alice").await;

    let (status, party) = call(
        &router,
        Method::POST,
        &format!("/api/parties/{party_id}/join"),
        Some("bob"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(party["members"], json!(["alice", "bob"]));

    let (status, page) = call(
        &router,
        Method::GET,
        &format!("/api/parties/{party_id}/candidates"),
        Some("bob"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["businesses"].as_array().unwrap().len(), 20);
    assert_eq!(page["nextOffsetHint"], 20);

    let swipes_uri = format!("/api/parties/{party_id}/swipes");
    let (status, first) =
        call(&router, Method::POST, &swipes_uri, Some("alice"), &[], Some(swipe_body(4, "like"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["decision"], "pending");
    assert_eq!(first["match"], Value::Null);
    assert_eq!(first["offset"], 5);

    let (status, second) = call(
        &router,
        Method::POST,
        &swipes_uri,
        Some("bob"),
        &[],
        Some(swipe_body(4, "super-like")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["decision"], "like");
    assert_eq!(second["match"]["type"], "like");
    assert_eq!(second["match"]["lastToSwipe"], "bob");

    let (status, matches) = call(
        &router,
        Method::GET,
        &format!("/api/parties/{party_id}/matches"),
        Some("alice"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(matches.as_array().unwrap().len(), 1);

    let (status, offset) = call(
        &router,
        Method::GET,
        &format!("/api/parties/{party_id}/offset"),
        Some("bob"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(offset["offset"], 5);

    let (status, left) = call(
        &router,
        Method::POST,
        &format!("/api/parties/{party_id}/leave"),
        Some("alice"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(left["dissolved"], true);

    let (status, _) = call(
        &router,
        Method::GET,
        &format!("/api/parties/{party_id}"),
        Some("bob"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_identity_is_unauthenticated() {
    let router = test_router();
    let (status, body) = call(&router, Method::POST, "/api/parties", None, &[], Some(party_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn non_member_is_forbidden() {
    let router = test_router();
    let party_id = create_party(&router, "alice").await;
    let (status, _) = call(
        &router,
        Method::GET,
        &format!("/api/parties/{party_id}/matches"),
        Some("mallory"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_action_is_bad_request() {
    let router = test_router();
    let party_id = create_party(&router, "alice").await;
    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/api/parties/{party_id}/swipes"),
        Some("alice"),
        &[],
        Some(swipe_body(1, "maybe")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("maybe"));
}

#[tokio::test]
async fn idempotency_key_replays_and_rejects_mismatch() {
    let router = test_router();
    let party_id = create_party(&router, "alice").await;
    let (_, _) = call(
        &router,
        Method::POST,
        &format!("/api/parties/{party_id}/join"),
        Some("bob"),
        &[],
        None,
    )
    .await;

    let uri = format!("/api/parties/{party_id}/swipes");
    let key = [("idempotency-key", "swipe-0001")];
    let (status, first) =
        call(&router, Method::POST, &uri, Some("alice"), &key, Some(swipe_body(2, "like"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, replay) =
        call(&router, Method::POST, &uri, Some("alice"), &key, Some(swipe_body(2, "like"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay, first);

    let (status, _) =
        call(&router, Method::POST, &uri, Some("alice"), &key, Some(swipe_body(2, "dislike"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blocking_hides_business_from_candidates() {
    let router = test_router();
    let party_id = create_party(&router, "alice").await;

    let (status, _) = call(&router, Method::PUT, "/api/blocks/biz-0", Some("alice"), &[], None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, page) = call(
        &router,
        Method::GET,
        &format!("/api/parties/{party_id}/candidates"),
        Some("alice"),
        &[],
        None,
    )
    .await;
    assert_eq!(page["businesses"][0]["id"], "biz-1");

    let (status, _) = call(&router, Method::DELETE, "/api/blocks/biz-0", Some("alice"), &[], None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_updates_search_and_removes_member() {
    let router = test_router();
    let party_id = create_party(&router, "alice").await;
    call(
        &router,
        Method::POST,
        &format!("/api/parties/{party_id}/join"),
        Some("bob"),
        &[],
        None,
    )
    .await;

    let update = json!({
        "location": { "latitude": 37.0, "longitude": -122.0 },
        "search": { "radiusMeters": 5000, "maxPrice": 4 }
    });
    let (status, _) = call(
        &router,
        Method::PUT,
        &format!("/api/parties/{party_id}/search"),
        Some("bob"),
        &[],
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, party) = call(
        &router,
        Method::PUT,
        &format!("/api/parties/{party_id}/search"),
        Some("alice"),
        &[],
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(party["search"]["radiusMeters"], 5000);

    let (status, outcome) = call(
        &router,
        Method::DELETE,
        &format!("/api/parties/{party_id}/members/bob"),
        Some("alice"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["dissolved"], false);

    let (status, _) = call(
        &router,
        Method::DELETE,
        &format!("/api/parties/{party_id}"),
        Some("alice"),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
