//! Availability recomputation.

use common::TicketTypeId;
use domain::Availability;
use store::TicketStore;

use crate::Result;

/// Recomputes the derived availability of ticket types.
///
/// Each call performs at most one state transition; callers are expected
/// to trigger a recompute per mutating event rather than rely on a single
/// call reaching a fixed point. The operation is idempotent, which is what
/// makes at-least-once delivery through the queue safe.
pub struct AvailabilityEngine<S> {
    store: S,
}

impl<S: TicketStore> AvailabilityEngine<S> {
    /// Creates a new engine over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adjusts the availability of a ticket type if necessary.
    ///
    /// Returns the (possibly unchanged) availability, or `None` if the
    /// ticket type no longer exists: a product deleted while a recompute
    /// was queued is not an error, just a logged no-op.
    #[tracing::instrument(skip(self))]
    pub async fn recompute(&self, ticket_type_id: TicketTypeId) -> Result<Option<Availability>> {
        let Some(mut ticket_type) = self.store.get_ticket_type(ticket_type_id).await? else {
            tracing::warn!(%ticket_type_id, "skipping recompute: ticket type not found");
            return Ok(None);
        };

        let counts = self.store.counts(&ticket_type).await?;
        match ticket_type
            .availability
            .next(counts.available(), counts.purchased, ticket_type.units)
        {
            Some(next) => {
                tracing::info!(
                    %ticket_type_id,
                    from = %ticket_type.availability,
                    to = %next,
                    available = counts.available(),
                    purchased = counts.purchased,
                    "availability changed"
                );
                ticket_type.availability = next;
                self.store.update_ticket_type(&ticket_type).await?;
                metrics::counter!("availability_transitions_total").increment(1);
                Ok(Some(next))
            }
            None => {
                tracing::debug!(%ticket_type_id, "no availability change necessary");
                Ok(Some(ticket_type.availability))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{AccountId, OrderId, UserId};
    use domain::{Money, Order, TicketOrder, TicketType};
    use store::InMemoryTicketStore;

    async fn seed(store: &InMemoryTicketStore, units: u32) -> TicketTypeId {
        let id = store.next_ticket_type_id().await.unwrap();
        let mut tt = TicketType::new(id, None, "GA", Money::from_cents(1000), units);
        tt.publish();
        store.insert_ticket_type(&tt).await.unwrap();
        id
    }

    async fn reserve(store: &InMemoryTicketStore, tt: TicketTypeId, quantity: u32) -> OrderId {
        let order_id = store.next_order_id().await.unwrap();
        let order = Order::new(order_id, AccountId::new(1), Some(UserId::new(1)), Utc::now());
        store.insert_order(&order).await.unwrap();

        let line_id = store.next_line_item_id().await.unwrap();
        store
            .upsert_line_item(&TicketOrder::new(line_id, order_id, tt, quantity))
            .await
            .unwrap();
        order_id
    }

    async fn purchase(store: &InMemoryTicketStore, order_id: OrderId) {
        let mut order = store.get_order(order_id).await.unwrap().unwrap();
        order.lock(1).unwrap();
        order.purchase(Utc::now()).unwrap();
        store.update_order(&order).await.unwrap();
    }

    #[tokio::test]
    async fn recompute_claims_exhausted_ticket_type() {
        let store = InMemoryTicketStore::new();
        let engine = AvailabilityEngine::new(store.clone());
        let tt = seed(&store, 10).await;
        reserve(&store, tt, 10).await;

        let result = engine.recompute(tt).await.unwrap();
        assert_eq!(result, Some(Availability::Claimed));

        let stored = store.get_ticket_type(tt).await.unwrap().unwrap();
        assert_eq!(stored.availability, Availability::Claimed);
    }

    #[tokio::test]
    async fn recompute_is_a_noop_when_nothing_changed() {
        let store = InMemoryTicketStore::new();
        let engine = AvailabilityEngine::new(store.clone());
        let tt = seed(&store, 10).await;
        reserve(&store, tt, 3).await;

        let result = engine.recompute(tt).await.unwrap();
        assert_eq!(result, Some(Availability::Available));
    }

    #[tokio::test]
    async fn sold_needs_one_recompute_per_event() {
        let store = InMemoryTicketStore::new();
        let engine = AvailabilityEngine::new(store.clone());
        let tt = seed(&store, 10).await;
        let order = reserve(&store, tt, 10).await;
        purchase(&store, order).await;

        // fully claimed and purchased in one gap: first pass claims,
        // second pass sells
        assert_eq!(
            engine.recompute(tt).await.unwrap(),
            Some(Availability::Claimed)
        );
        assert_eq!(
            engine.recompute(tt).await.unwrap(),
            Some(Availability::Sold)
        );
    }

    #[tokio::test]
    async fn cancelling_a_sold_out_order_reopens_sales() {
        let store = InMemoryTicketStore::new();
        let engine = AvailabilityEngine::new(store.clone());
        let tt = seed(&store, 10).await;
        let order = reserve(&store, tt, 10).await;
        purchase(&store, order).await;
        engine.recompute(tt).await.unwrap();
        engine.recompute(tt).await.unwrap();

        let mut cancelled = store.get_order(order).await.unwrap().unwrap();
        cancelled.cancel();
        store.update_order(&cancelled).await.unwrap();

        assert_eq!(
            engine.recompute(tt).await.unwrap(),
            Some(Availability::Available)
        );
    }

    #[tokio::test]
    async fn missing_ticket_type_is_a_silent_noop() {
        let store = InMemoryTicketStore::new();
        let engine = AvailabilityEngine::new(store);

        let result = engine.recompute(TicketTypeId::new(999)).await.unwrap();
        assert_eq!(result, None);
    }
}
