//! Error types for the order flow.

use common::{AccountId, OrderId, TicketTypeId};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

/// Errors raised by reservation, checkout and finalize operations.
///
/// All of these are synchronous, deterministic failures surfaced to the
/// immediate caller; the operation that raised them is rolled back
/// wholesale. Background work never surfaces errors through this type,
/// it logs and moves on.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// A negative amount was requested.
    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    /// No more tickets can be added to a locked or purchased order.
    #[error("no more tickets can be added to this order")]
    OrderLocked,

    /// The ticket type does not exist.
    #[error("ticket type {0} not found")]
    TicketTypeNotFound(TicketTypeId),

    /// The ticket type is not open for sale.
    #[error("ticket type {0} is not active")]
    InactiveTicketType(TicketTypeId),

    /// The ticket type is not connected to any event.
    #[error("ticket type {0} is not connected to any event")]
    EventNotFound(TicketTypeId),

    /// Cross-tenant purchase: the order and the ticket type belong to
    /// different accounts.
    #[error("order belongs to account {order_account}, ticket type to account {event_account}")]
    AccountMismatch {
        order_account: AccountId,
        event_account: AccountId,
    },

    /// The account exhausted its paid-transaction quota and the ticket
    /// type is not free.
    #[error("account {0} has reached its maximum allowed transactions")]
    QuotaExceeded(AccountId),

    /// Not enough tickets available for the requested amount.
    #[error("requested amount not available: {requested}")]
    AmountNotAvailable { requested: i64 },

    /// The order does not exist.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// No order matches the given order or payment key.
    #[error("no order found for key {0}")]
    OrderKeyNotFound(String),

    /// No payment provider is registered under the given key.
    #[error("unknown payment provider: {0}")]
    UnknownPaymentProvider(String),

    /// The subscription collaborator failed.
    #[error("subscription service error: {0}")]
    SubscriptionService(String),

    /// The payment collaborator failed.
    #[error("payment provider error: {0}")]
    PaymentProvider(String),

    /// An order lifecycle rule was violated.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The underlying store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for order flow operations.
pub type Result<T> = std::result::Result<T, ReservationError>;
