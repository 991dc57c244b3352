//! Ticket type availability endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::TicketTypeId;
use serde::Serialize;
use store::TicketStore;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct TicketTypeResponse {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub units: u32,
    pub active: bool,
    pub availability: String,
    /// Units still reservable, clamped at zero for display.
    pub available: i64,
    pub purchased: i64,
}

/// GET /ticket-types/{id} — public availability and derived counts.
#[tracing::instrument(skip(state))]
pub async fn get<S: TicketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<TicketTypeResponse>, ApiError> {
    let ticket_type = state
        .store
        .get_ticket_type(TicketTypeId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no ticket type with id {id}")))?;

    let counts = state.store.counts(&ticket_type).await?;

    Ok(Json(TicketTypeResponse {
        id: ticket_type.id.as_i64(),
        name: ticket_type.name.clone(),
        price_cents: ticket_type.price.cents(),
        units: ticket_type.units,
        active: ticket_type.active,
        availability: ticket_type.availability.to_string(),
        available: counts.available_clamped(),
        purchased: counts.purchased,
    }))
}
