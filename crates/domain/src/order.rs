//! Order entity and its lifecycle transitions.

use chrono::{DateTime, Utc};
use common::{AccountId, OrderId, OrderKey, PaymentKey, UserId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::meta::OrderMeta;
use crate::status::OrderStatus;

/// A buyer-facing reservation session aggregating line items.
///
/// The order is the unit of reservation: line items of any order whose
/// status still holds capacity count against their ticket types, payment
/// or not. Time never comes from the clock inside this type; callers pass
/// `now` in, which keeps the sliding-window logic deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// Account the order is purchasing from.
    pub account_id: AccountId,

    /// Buyer, if already known. Anonymous orders must bind a user at
    /// checkout before they can be locked.
    pub user_id: Option<UserId>,

    /// Opaque key identifying the order towards the buyer session.
    pub order_key: OrderKey,

    /// Opaque key identifying the order towards the payment provider.
    pub payment_key: PaymentKey,

    /// Current lifecycle state.
    pub status: OrderStatus,

    /// Start of the sliding session window, reset on every mutation.
    pub session_start: DateTime<Utc>,

    /// When the order was purchased.
    pub purchased_at: Option<DateTime<Utc>>,

    /// Once locked, line items are frozen. Never reset to false.
    pub locked: bool,

    /// Fulfillment mode and audit stamps.
    pub meta: OrderMeta,

    /// Key of the payment provider handling this order, once chosen.
    pub payment_provider: Option<String>,
}

impl Order {
    /// Starts a new order session.
    pub fn new(
        id: OrderId,
        account_id: AccountId,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            user_id,
            order_key: OrderKey::generate(),
            payment_key: PaymentKey::generate(),
            status: OrderStatus::Started,
            session_start: now,
            purchased_at: None,
            locked: false,
            meta: OrderMeta::default(),
            payment_provider: None,
        }
    }

    /// Resets the session timer, extending the sliding window.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.session_start = now;
    }

    /// Returns true if the order is locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns true if the order has been purchased.
    pub fn is_purchased(&self) -> bool {
        self.status == OrderStatus::Purchased
    }

    /// Returns true if line items may still be changed.
    pub fn can_modify_items(&self) -> bool {
        !self.locked && !self.is_purchased()
    }

    /// Binds a user if the order has none yet, then locks the order.
    pub fn checkout(&mut self, user: Option<UserId>, line_items: usize) -> Result<(), OrderError> {
        if self.user_id.is_none() {
            self.user_id = user;
        }
        self.lock(line_items)
    }

    /// Locks the order so no more tickets can be added.
    ///
    /// `line_items` is the current number of line-item rows; an empty
    /// order cannot be locked, and a user must be bound first.
    pub fn lock(&mut self, line_items: usize) -> Result<(), OrderError> {
        if line_items == 0 {
            return Err(OrderError::Empty);
        }
        if self.user_id.is_none() {
            return Err(OrderError::NoUser);
        }
        tracing::debug!(order_id = %self.id, "locking order");
        self.locked = true;
        Ok(())
    }

    /// Marks the order as purchased.
    ///
    /// Deliberately allowed from Timeout: a payment confirmation that
    /// arrives after the session expired still wins over the expiry.
    pub fn purchase(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.locked {
            return Err(OrderError::NotLocked);
        }
        self.status = OrderStatus::Purchased;
        self.purchased_at = Some(now);
        Ok(())
    }

    /// Marks the order as timed out, releasing its reservation.
    ///
    /// The release is implicit: timed-out orders simply stop counting
    /// toward capacity. Line items stay in place so a late payment can
    /// still finalize them.
    pub fn timeout(&mut self) {
        tracing::debug!(order_id = %self.id, "timing out order");
        self.status = OrderStatus::Timeout;
    }

    /// Marks the order as cancelled.
    ///
    /// Line items are not deleted; cancelled orders are excluded from the
    /// reservation counts, which restocks their ticket types.
    pub fn cancel(&mut self) {
        tracing::info!(order_id = %self.id, "cancelling order");
        self.status = OrderStatus::Cancelled;
    }
}
