//! Reservation manager: order sessions and line-item mutations.

use availability::RecomputeQueue;
use chrono::Utc;
use common::{AccountId, OrderId, TicketTypeId, UserId};
use domain::{Order, TicketOrder};
use store::TicketStore;

use crate::error::{ReservationError, Result};
use crate::services::SubscriptionService;

/// Starts order sessions and reserves quantities of ticket types.
///
/// `add_tickets` is the contended path of the whole system. It reads the
/// derived counts and writes the line item without any row lock in
/// between: two concurrent calls on the same ticket type can both pass
/// the availability check before either commits. That transient oversell
/// is an accepted trade. The checks here guard against buyer mistakes
/// and tenant boundaries, not against concurrent writers.
pub struct ReservationService<S, Q> {
    store: S,
    subscriptions: Q,
    recompute: RecomputeQueue,
}

impl<S, Q> ReservationService<S, Q>
where
    S: TicketStore,
    Q: SubscriptionService,
{
    /// Creates a new reservation service.
    pub fn new(store: S, subscriptions: Q, recompute: RecomputeQueue) -> Self {
        Self {
            store,
            subscriptions,
            recompute,
        }
    }

    /// Starts an order session for a user at an account, reusing the
    /// user's open order if one exists.
    ///
    /// Anonymous sessions (no user yet) always get a fresh order; they
    /// bind their user at checkout.
    #[tracing::instrument(skip(self))]
    pub async fn start_order(
        &self,
        user: Option<UserId>,
        account: AccountId,
    ) -> Result<Order> {
        if let Some(user) = user {
            if let Some(existing) = self.store.find_started_order(user, account).await? {
                tracing::info!(
                    order_id = %existing.id,
                    %user,
                    %account,
                    "reusing existing started order"
                );
                return Ok(existing);
            }
        }

        let id = self.store.next_order_id().await?;
        let order = Order::new(id, account, user, Utc::now());
        self.store.insert_order(&order).await?;
        tracing::debug!(order_id = %order.id, %account, "started new order");
        metrics::counter!("orders_started_total").increment(1);
        Ok(order)
    }

    /// Reserves `amount` units of a ticket type within an order.
    ///
    /// The amount is absolute, not incremental: an existing line item is
    /// set to `amount`, and `amount == 0` deletes it. Preconditions are
    /// checked in a fixed order and the first failure wins; on success the
    /// session window is extended and a recompute of the ticket type's
    /// availability is scheduled.
    #[tracing::instrument(skip(self))]
    pub async fn add_tickets(
        &self,
        order_id: OrderId,
        ticket_type_id: TicketTypeId,
        amount: i64,
    ) -> Result<()> {
        if amount < 0 {
            tracing::debug!(%order_id, amount, "rejecting invalid amount");
            return Err(ReservationError::InvalidAmount { amount });
        }
        let quantity = u32::try_from(amount)
            .map_err(|_| ReservationError::InvalidAmount { amount })?;

        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(ReservationError::OrderNotFound(order_id))?;
        if !order.can_modify_items() {
            tracing::debug!(%order_id, "rejecting mutation of locked order");
            return Err(ReservationError::OrderLocked);
        }

        let ticket_type = self
            .store
            .get_ticket_type(ticket_type_id)
            .await?
            .ok_or(ReservationError::TicketTypeNotFound(ticket_type_id))?;
        if !ticket_type.active {
            return Err(ReservationError::InactiveTicketType(ticket_type_id));
        }

        let event = match ticket_type.event_id {
            Some(event_id) => self.store.get_event(event_id).await?,
            None => None,
        }
        .ok_or(ReservationError::EventNotFound(ticket_type_id))?;
        if order.account_id != event.account_id {
            return Err(ReservationError::AccountMismatch {
                order_account: order.account_id,
                event_account: event.account_id,
            });
        }

        let has_quota = self
            .subscriptions
            .has_available_transaction_quota(order.account_id)
            .await?;
        if !has_quota && !ticket_type.is_free() {
            return Err(ReservationError::QuotaExceeded(order.account_id));
        }

        let skip_check = order.meta.fulfillment.skips_availability_check();
        match self.store.get_line_item(order.id, ticket_type.id).await? {
            None => {
                // a new line item needs at least one ticket
                if quantity == 0 {
                    return Err(ReservationError::AmountNotAvailable { requested: amount });
                }
                if !skip_check {
                    let counts = self.store.counts(&ticket_type).await?;
                    if !counts.has_available(amount) {
                        tracing::info!(
                            %order_id,
                            %ticket_type_id,
                            requested = amount,
                            available = counts.available(),
                            "not enough tickets available"
                        );
                        return Err(ReservationError::AmountNotAvailable { requested: amount });
                    }
                }
                let line_id = self.store.next_line_item_id().await?;
                let line = TicketOrder::new(line_id, order.id, ticket_type.id, quantity);
                self.store.upsert_line_item(&line).await?;
                tracing::info!(
                    %order_id,
                    %ticket_type_id,
                    quantity,
                    "created line item"
                );
            }
            Some(existing) => {
                if quantity == 0 {
                    // explicit cancellation of this product within the order
                    self.store.delete_line_item(existing.id).await?;
                    tracing::info!(%order_id, %ticket_type_id, "removed line item");
                } else {
                    let delta = amount - i64::from(existing.quantity);
                    if delta >= 0 && !skip_check {
                        let counts = self.store.counts(&ticket_type).await?;
                        if !counts.has_available(delta) {
                            tracing::info!(
                                %order_id,
                                %ticket_type_id,
                                requested = amount,
                                delta,
                                available = counts.available(),
                                "not enough tickets available for increase"
                            );
                            return Err(ReservationError::AmountNotAvailable {
                                requested: amount,
                            });
                        }
                    }
                    let mut line = existing;
                    line.quantity = quantity;
                    self.store.upsert_line_item(&line).await?;
                    tracing::info!(
                        %order_id,
                        %ticket_type_id,
                        quantity,
                        "updated line item"
                    );
                }
            }
        }

        order.touch(Utc::now());
        self.store.update_order(&order).await?;
        self.recompute.enqueue(ticket_type.id);
        metrics::counter!("reservations_total").increment(1);
        Ok(())
    }

    /// Cancels an order.
    ///
    /// Line items stay in place (exclusion from the reservation counts is
    /// what releases the capacity), but every affected ticket type gets a
    /// recompute so its public availability catches up.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(ReservationError::OrderNotFound(order_id))?;
        order.cancel();
        self.store.update_order(&order).await?;

        let line_items = self.store.line_items_for_order(order.id).await?;
        self.recompute
            .enqueue_all(line_items.iter().map(|li| li.ticket_type_id));
        Ok(order)
    }

    /// Deletes an order together with its line items and tickets.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<()> {
        let line_items = self.store.line_items_for_order(order_id).await?;
        self.store.delete_order(order_id).await?;
        self.recompute
            .enqueue_all(line_items.iter().map(|li| li.ticket_type_id));
        Ok(())
    }
}
