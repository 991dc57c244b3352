//! Checkout and finalize: locking orders, payment hand-off, ticket minting.

use std::collections::BTreeSet;

use availability::RecomputeQueue;
use chrono::Utc;
use common::{OrderId, OrderKey, PaymentKey, UserId};
use domain::{AuditStamp, Fulfillment, Money, Order, OrderError, Ticket};
use store::TicketStore;

use crate::error::{ReservationError, Result};
use crate::services::{ProviderRegistry, TicketMailer};

/// Locks orders, hands them to payment providers and materializes
/// tickets exactly once on confirmed payment.
pub struct CheckoutService<S, M> {
    store: S,
    mailer: M,
    providers: ProviderRegistry,
    recompute: RecomputeQueue,
}

impl<S, M> CheckoutService<S, M>
where
    S: TicketStore,
    M: TicketMailer,
{
    /// Creates a new checkout service.
    pub fn new(store: S, mailer: M, providers: ProviderRegistry, recompute: RecomputeQueue) -> Self {
        Self {
            store,
            mailer,
            providers,
            recompute,
        }
    }

    /// Binds a user (if the order has none yet) and locks the order.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, order_id: OrderId, user: Option<UserId>) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        let line_items = self.store.line_items_for_order(order.id).await?;
        order.checkout(user, line_items.len())?;
        self.store.update_order(&order).await?;
        tracing::info!(%order_id, "checked out order");
        Ok(order)
    }

    /// Starts a payment with the given provider for a locked order and
    /// returns the provider's checkout reference.
    #[tracing::instrument(skip(self))]
    pub async fn begin_payment(&self, order_id: OrderId, provider_key: &str) -> Result<String> {
        let mut order = self.load(order_id).await?;
        if !order.is_locked() {
            return Err(ReservationError::Order(OrderError::NotLocked));
        }
        let provider = self
            .providers
            .get(provider_key)
            .ok_or_else(|| ReservationError::UnknownPaymentProvider(provider_key.to_string()))?;

        let total = self.order_total(&order).await?;
        let reference = provider.start_checkout(&order, total).await?;

        order.payment_provider = Some(provider_key.to_string());
        self.store.update_order(&order).await?;
        tracing::info!(%order_id, provider = provider_key, "payment started");
        Ok(reference)
    }

    /// Finalizes an order identified by its payment key, the entry point
    /// for payment-provider confirmations, which may arrive more than
    /// once.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        payment_key: &PaymentKey,
        send_notification: bool,
    ) -> Result<Vec<Ticket>> {
        let order = self
            .store
            .find_order_by_payment_key(payment_key)
            .await?
            .ok_or_else(|| ReservationError::OrderKeyNotFound(payment_key.to_string()))?;
        self.finish_order(order.id, send_notification).await
    }

    /// Finishes the order as a gift: no payment, availability already
    /// skipped, tickets delivered to the recipient.
    #[tracing::instrument(skip(self))]
    pub async fn gift(&self, order_key: &OrderKey, user: Option<UserId>) -> Result<Vec<Ticket>> {
        let mut order = self.load_by_key(order_key).await?;
        order.meta.fulfillment = Fulfillment::Gifted;
        let line_items = self.store.line_items_for_order(order.id).await?;
        order.checkout(user, line_items.len())?;
        self.store.update_order(&order).await?;
        self.finish_order(order.id, true).await
    }

    /// Finishes the order as paper tickets sold at the door: no payment
    /// and no delivery.
    #[tracing::instrument(skip(self))]
    pub async fn paper(&self, order_key: &OrderKey, user: UserId) -> Result<Vec<Ticket>> {
        let mut order = self.load_by_key(order_key).await?;
        order.meta.fulfillment = Fulfillment::Paper;
        let line_items = self.store.line_items_for_order(order.id).await?;
        order.checkout(Some(user), line_items.len())?;
        self.store.update_order(&order).await?;
        self.finish_order(order.id, false).await
    }

    /// Finishes an order: marks it purchased and mints its tickets.
    ///
    /// This is the terminal integrity gate. The order must be locked;
    /// a second invocation (duplicate payment confirmation) returns the
    /// already-minted tickets untouched. The purchase flip and the ticket
    /// batch commit atomically; a failure mints nothing, stamps the
    /// order's audit trail as failed and re-raises for the caller to
    /// retry.
    #[tracing::instrument(skip(self))]
    pub async fn finish_order(
        &self,
        order_id: OrderId,
        send_notification: bool,
    ) -> Result<Vec<Ticket>> {
        let mut order = self.load(order_id).await?;
        if !order.is_locked() {
            return Err(ReservationError::Order(OrderError::NotLocked));
        }

        let existing = self.store.tickets_for_order(order.id).await?;
        if !existing.is_empty() {
            tracing::info!(%order_id, "tickets already created, nothing to do");
            return Ok(existing);
        }

        let line_items = self.store.line_items_for_order(order.id).await?;
        let owner = order.user_id.ok_or(OrderError::NoUser)?;
        let recipients: Vec<UserId> = match &order.meta.fulfillment {
            Fulfillment::MultiUser { user_ids } => {
                std::iter::once(owner).chain(user_ids.iter().copied()).collect()
            }
            _ => vec![owner],
        };

        let now = Utc::now();
        order.purchase(now)?;

        let mut tickets = Vec::new();
        for line in &line_items {
            for _ in 0..line.quantity {
                let recipient = recipients.get(tickets.len()).copied().unwrap_or(owner);
                let ticket_id = self.store.next_ticket_id().await?;
                tickets.push(Ticket::new(ticket_id, line.id, recipient, now));
            }
        }
        order.meta.tickets_created = Some(AuditStamp::ok(now));

        if let Err(err) = self.store.commit_purchase(&order, &tickets).await {
            tracing::error!(%order_id, error = %err, "failed finalizing order");
            self.stamp_failed_creation(order_id).await;
            return Err(err.into());
        }
        tracing::info!(%order_id, tickets = tickets.len(), "order finalized");
        metrics::counter!("orders_finalized_total").increment(1);

        // covers the Claimed -> Sold transition for every ticket type
        let ticket_type_ids: BTreeSet<_> =
            line_items.iter().map(|li| li.ticket_type_id).collect();
        self.recompute.enqueue_all(ticket_type_ids);

        if send_notification && !order.meta.fulfillment.suppresses_delivery() {
            self.deliver(&mut order, &tickets).await;
        }

        Ok(tickets)
    }

    /// Delivers the tickets and stamps the outcome; failures are logged,
    /// never raised.
    async fn deliver(&self, order: &mut Order, tickets: &[Ticket]) {
        let delivered = self.mailer.deliver(order, tickets).await;
        let now = Utc::now();
        order.meta.tickets_sent = Some(if delivered {
            AuditStamp::ok(now)
        } else {
            tracing::warn!(order_id = %order.id, "ticket delivery failed");
            AuditStamp::failed(now)
        });
        if let Err(err) = self.store.update_order(order).await {
            tracing::error!(order_id = %order.id, error = %err, "failed recording delivery stamp");
        }
    }

    /// Best-effort audit stamp after a failed finalize.
    async fn stamp_failed_creation(&self, order_id: OrderId) {
        match self.store.get_order(order_id).await {
            Ok(Some(mut stored)) => {
                stored.meta.tickets_created = Some(AuditStamp::failed(Utc::now()));
                if let Err(err) = self.store.update_order(&stored).await {
                    tracing::error!(%order_id, error = %err, "failed recording failure stamp");
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(%order_id, error = %err, "failed loading order for failure stamp");
            }
        }
    }

    async fn order_total(&self, order: &Order) -> Result<Money> {
        let line_items = self.store.line_items_for_order(order.id).await?;
        let mut total = Money::zero();
        for line in &line_items {
            let ticket_type = self
                .store
                .get_ticket_type(line.ticket_type_id)
                .await?
                .ok_or(ReservationError::TicketTypeNotFound(line.ticket_type_id))?;
            total = total + line.total(ticket_type.price);
        }
        Ok(total)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(ReservationError::OrderNotFound(order_id))
    }

    async fn load_by_key(&self, key: &OrderKey) -> Result<Order> {
        self.store
            .find_order_by_key(key)
            .await?
            .ok_or_else(|| ReservationError::OrderKeyNotFound(key.to_string()))
    }
}
