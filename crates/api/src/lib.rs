//! HTTP surface for the ticketing engine.
//!
//! Thin entrypoints over the reservation, checkout and availability
//! services, with structured logging (tracing) and Prometheus metrics.
//! The engine itself lives in the `orders`, `availability` and `store`
//! crates; nothing here carries domain rules.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use availability::{AvailabilityEngine, RecomputeQueue};
use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{
    CheckoutService, InMemoryPaymentProvider, InMemorySubscriptionService, InMemoryTicketMailer,
    ProviderRegistry, ReservationService, SessionReaper,
};
use store::TicketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: TicketStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{key}", get(routes::orders::get::<S>))
        .route("/orders/{key}/tickets", post(routes::orders::add_tickets::<S>))
        .route("/orders/{key}/checkout", post(routes::orders::checkout::<S>))
        .route("/orders/{key}/gift", post(routes::orders::gift::<S>))
        .route("/orders/{key}/paper", post(routes::orders::paper::<S>))
        .route(
            "/payments/{payment_key}/confirm",
            post(routes::orders::confirm_payment::<S>),
        )
        .route("/ticket-types/{id}", get(routes::ticket_types::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state with in-memory collaborators,
/// plus the session reaper driving the same store and recompute queue.
pub fn create_default_state<S: TicketStore + Clone + 'static>(
    store: S,
) -> (Arc<AppState<S>>, SessionReaper<S>) {
    let recompute = RecomputeQueue::spawn(AvailabilityEngine::new(store.clone()));
    let subscriptions = InMemorySubscriptionService::new();
    let mailer = InMemoryTicketMailer::new();

    let mut providers = ProviderRegistry::new();
    providers.register(Arc::new(InMemoryPaymentProvider::new()));

    let state = Arc::new(AppState {
        reservations: ReservationService::new(
            store.clone(),
            subscriptions.clone(),
            recompute.clone(),
        ),
        checkout: CheckoutService::new(
            store.clone(),
            mailer.clone(),
            providers,
            recompute.clone(),
        ),
        subscriptions,
        mailer,
        store: store.clone(),
    });

    let reaper = SessionReaper::new(store, recompute);
    (state, reaper)
}
