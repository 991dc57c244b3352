//! Order session endpoints: start, reserve, checkout, payment callback.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AccountId, OrderKey, PaymentKey, UserId};
use domain::Order;
use orders::{
    CheckoutService, InMemorySubscriptionService, InMemoryTicketMailer, ReservationService,
};
use serde::{Deserialize, Serialize};
use store::TicketStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: TicketStore> {
    pub store: S,
    pub reservations: ReservationService<S, InMemorySubscriptionService>,
    pub checkout: CheckoutService<S, InMemoryTicketMailer>,
    pub subscriptions: InMemorySubscriptionService,
    pub mailer: InMemoryTicketMailer,
}

// -- Request types --

#[derive(Deserialize)]
pub struct StartOrderRequest {
    pub account_id: i64,
    pub user_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct AddTicketsRequest {
    pub ticket_type_id: i64,
    pub amount: i64,
}

#[derive(Deserialize, Default)]
pub struct CheckoutRequest {
    pub user_id: Option<i64>,
    pub provider: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct GiftRequest {
    pub user_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct PaperRequest {
    pub user_id: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_key: String,
    pub account_id: i64,
    pub user_id: Option<i64>,
    pub status: String,
    pub locked: bool,
    pub items: Vec<LineItemResponse>,
    pub tickets: Vec<TicketResponse>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub ticket_type_id: i64,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub code: String,
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct OrderStartedResponse {
    pub order_key: String,
    pub payment_key: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_key: String,
    pub locked: bool,
    pub payment_reference: Option<String>,
}

async fn order_response<S: TicketStore>(
    state: &AppState<S>,
    order: &Order,
) -> Result<OrderResponse, ApiError> {
    let items = state.store.line_items_for_order(order.id).await?;
    let tickets = state.store.tickets_for_order(order.id).await?;
    Ok(OrderResponse {
        order_key: order.order_key.to_string(),
        account_id: order.account_id.as_i64(),
        user_id: order.user_id.map(|id| id.as_i64()),
        status: order.status.to_string(),
        locked: order.locked,
        items: items
            .into_iter()
            .map(|li| LineItemResponse {
                ticket_type_id: li.ticket_type_id.as_i64(),
                quantity: li.quantity,
            })
            .collect(),
        tickets: tickets
            .into_iter()
            .map(|t| TicketResponse {
                id: t.id.as_i64(),
                code: t.code(),
                user_id: t.user_id.as_i64(),
            })
            .collect(),
    })
}

async fn resolve<S: TicketStore>(state: &AppState<S>, key: &str) -> Result<Order, ApiError> {
    state
        .store
        .find_order_by_key(&OrderKey::from(key))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no order found for key {key}")))
}

// -- Handlers --

/// POST /orders — start (or resume) an order session.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<StartOrderRequest>,
) -> Result<(StatusCode, Json<OrderStartedResponse>), ApiError> {
    let order = state
        .reservations
        .start_order(req.user_id.map(UserId::new), AccountId::new(req.account_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderStartedResponse {
            order_key: order.order_key.to_string(),
            payment_key: order.payment_key.to_string(),
            status: order.status.to_string(),
        }),
    ))
}

/// GET /orders/{key} — load an order with its line items and tickets.
#[tracing::instrument(skip(state))]
pub async fn get<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = resolve(&state, &key).await?;
    Ok(Json(order_response(&state, &order).await?))
}

/// POST /orders/{key}/tickets — set the reserved amount of a ticket type.
#[tracing::instrument(skip(state, req))]
pub async fn add_tickets<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    Json(req): Json<AddTicketsRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = resolve(&state, &key).await?;
    state
        .reservations
        .add_tickets(order.id, req.ticket_type_id.into(), req.amount)
        .await?;

    let order = resolve(&state, &key).await?;
    Ok(Json(order_response(&state, &order).await?))
}

/// POST /orders/{key}/checkout — bind a user, lock the order and
/// optionally start a payment.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let order = resolve(&state, &key).await?;
    let order = state
        .checkout
        .checkout(order.id, req.user_id.map(UserId::new))
        .await?;

    let payment_reference = match req.provider {
        Some(provider) => Some(state.checkout.begin_payment(order.id, &provider).await?),
        None => None,
    };

    Ok(Json(CheckoutResponse {
        order_key: order.order_key.to_string(),
        locked: true,
        payment_reference,
    }))
}

/// POST /orders/{key}/gift — finish the order as a gift, skipping payment.
#[tracing::instrument(skip(state, req))]
pub async fn gift<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    Json(req): Json<GiftRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    state
        .checkout
        .gift(&OrderKey::from(key.as_str()), req.user_id.map(UserId::new))
        .await?;

    let order = resolve(&state, &key).await?;
    Ok(Json(order_response(&state, &order).await?))
}

/// POST /orders/{key}/paper — finish the order as paper tickets.
#[tracing::instrument(skip(state, req))]
pub async fn paper<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    Json(req): Json<PaperRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    state
        .checkout
        .paper(&OrderKey::from(key.as_str()), UserId::new(req.user_id))
        .await?;

    let order = resolve(&state, &key).await?;
    Ok(Json(order_response(&state, &order).await?))
}

/// POST /payments/{payment_key}/confirm — payment provider callback;
/// finalizes the order idempotently.
#[tracing::instrument(skip(state))]
pub async fn confirm_payment<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(payment_key): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let key = PaymentKey::from(payment_key.as_str());
    state.checkout.confirm_payment(&key, true).await?;

    let order = state
        .store
        .find_order_by_payment_key(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no order found for key {payment_key}")))?;
    Ok(Json(order_response(&state, &order).await?))
}
