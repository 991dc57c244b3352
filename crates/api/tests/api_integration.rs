//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::AccountId;
use domain::{Event, Money, TicketType};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryTicketStore, TicketStore};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (
    axum::Router,
    Arc<api::routes::orders::AppState<InMemoryTicketStore>>,
) {
    let store = InMemoryTicketStore::new();
    let (state, _reaper) = api::create_default_state(store);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn seed_ticket_type(
    state: &api::routes::orders::AppState<InMemoryTicketStore>,
    price_cents: i64,
    units: u32,
) -> i64 {
    let event_id = state.store.next_event_id().await.unwrap();
    state
        .store
        .insert_event(&Event::new(event_id, AccountId::new(1), "RustFest"))
        .await
        .unwrap();

    let tt_id = state.store.next_ticket_type_id().await.unwrap();
    let mut tt = TicketType::new(
        tt_id,
        Some(event_id),
        "General Admission",
        Money::from_cents(price_cents),
        units,
    );
    tt.publish();
    state.store.insert_ticket_type(&tt).await.unwrap();
    tt_id.as_i64()
}

async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_full_order_flow_over_http() {
    let (app, state) = setup();
    let tt = seed_ticket_type(&state, 2500, 10).await;

    // start a session
    let (status, order) = post_json(
        &app,
        "/orders",
        serde_json::json!({ "account_id": 1, "user_id": 100 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_key = order["order_key"].as_str().unwrap().to_string();
    let payment_key = order["payment_key"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "started");

    // reserve two tickets
    let (status, body) = post_json(
        &app,
        &format!("/orders/{order_key}/tickets"),
        serde_json::json!({ "ticket_type_id": tt, "amount": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["quantity"], 2);

    // checkout with the registered test provider
    let (status, body) = post_json(
        &app,
        &format!("/orders/{order_key}/checkout"),
        serde_json::json!({ "provider": "testpay" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["locked"].as_bool().unwrap());
    assert_eq!(body["payment_reference"], "PAY-0001");

    // the provider confirms; tickets are minted
    let (status, body) = post_json(
        &app,
        &format!("/payments/{payment_key}/confirm"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "purchased");
    assert_eq!(body["tickets"].as_array().unwrap().len(), 2);

    // a duplicate confirmation changes nothing
    let (status, body) = post_json(
        &app,
        &format!("/payments/{payment_key}/confirm"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tickets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unavailable_amount_maps_to_conflict() {
    let (app, state) = setup();
    let tt = seed_ticket_type(&state, 1000, 2).await;

    let (_, order) = post_json(
        &app,
        "/orders",
        serde_json::json!({ "account_id": 1, "user_id": 100 }),
    )
    .await;
    let order_key = order["order_key"].as_str().unwrap();

    let (status, body) = post_json(
        &app,
        &format!("/orders/{order_key}/tickets"),
        serde_json::json!({ "ticket_type_id": tt, "amount": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("not available"));
}

#[tokio::test]
async fn test_negative_amount_maps_to_bad_request() {
    let (app, state) = setup();
    let tt = seed_ticket_type(&state, 1000, 2).await;

    let (_, order) = post_json(
        &app,
        "/orders",
        serde_json::json!({ "account_id": 1, "user_id": 100 }),
    )
    .await;
    let order_key = order["order_key"].as_str().unwrap();

    let (status, _) = post_json(
        &app,
        &format!("/orders/{order_key}/tickets"),
        serde_json::json!({ "ticket_type_id": tt, "amount": -1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_order_key_is_not_found() {
    let (app, _) = setup();
    let (status, _) = get_json(&app, "/orders/doesnotexist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ticket_type_exposes_derived_counts() {
    let (app, state) = setup();
    let tt = seed_ticket_type(&state, 1500, 10).await;

    let (_, order) = post_json(
        &app,
        "/orders",
        serde_json::json!({ "account_id": 1, "user_id": 100 }),
    )
    .await;
    let order_key = order["order_key"].as_str().unwrap();
    post_json(
        &app,
        &format!("/orders/{order_key}/tickets"),
        serde_json::json!({ "ticket_type_id": tt, "amount": 4 }),
    )
    .await;

    let (status, body) = get_json(&app, &format!("/ticket-types/{tt}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["units"], 10);
    assert_eq!(body["available"], 6);
    assert_eq!(body["purchased"], 0);
    assert_eq!(body["availability"], "available");
}

#[tokio::test]
async fn test_empty_order_checkout_is_rejected() {
    let (app, _) = setup();

    let (_, order) = post_json(
        &app,
        "/orders",
        serde_json::json!({ "account_id": 1, "user_id": 100 }),
    )
    .await;
    let order_key = order["order_key"].as_str().unwrap();

    let (status, body) = post_json(
        &app,
        &format!("/orders/{order_key}/checkout"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}
