//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orders::ReservationError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Engine-level failure.
    Reservation(ReservationError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Reservation(err) => reservation_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn reservation_error_to_response(err: ReservationError) -> (StatusCode, String) {
    let status = match &err {
        ReservationError::InvalidAmount { .. }
        | ReservationError::UnknownPaymentProvider(_) => StatusCode::BAD_REQUEST,

        ReservationError::OrderNotFound(_)
        | ReservationError::OrderKeyNotFound(_)
        | ReservationError::TicketTypeNotFound(_)
        | ReservationError::EventNotFound(_) => StatusCode::NOT_FOUND,

        ReservationError::AccountMismatch { .. } => StatusCode::FORBIDDEN,

        ReservationError::QuotaExceeded(_) => StatusCode::PAYMENT_REQUIRED,

        ReservationError::OrderLocked
        | ReservationError::InactiveTicketType(_)
        | ReservationError::AmountNotAvailable { .. }
        | ReservationError::Order(_) => StatusCode::CONFLICT,

        ReservationError::SubscriptionService(_)
        | ReservationError::PaymentProvider(_)
        | ReservationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "engine failure");
    }
    (status, err.to_string())
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        ApiError::Reservation(err)
    }
}

impl From<store::StoreError> for ApiError {
    fn from(err: store::StoreError) -> Self {
        ApiError::Reservation(ReservationError::Store(err))
    }
}
