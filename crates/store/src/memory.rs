use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, EventId, OrderId, OrderKey, PaymentKey, TicketId, TicketOrderId, TicketTypeId, UserId};
use domain::{Event, Order, OrderStatus, Ticket, TicketOrder, TicketType};
use tokio::sync::RwLock;

use crate::{Result, store::TicketStore};

#[derive(Default)]
struct State {
    events: HashMap<EventId, Event>,
    ticket_types: HashMap<TicketTypeId, TicketType>,
    orders: HashMap<OrderId, Order>,
    line_items: HashMap<TicketOrderId, TicketOrder>,
    tickets: HashMap<TicketId, Ticket>,
    next_event_id: i64,
    next_ticket_type_id: i64,
    next_order_id: i64,
    next_line_item_id: i64,
    next_ticket_id: i64,
}

impl State {
    fn order_holds_capacity(&self, order_id: OrderId) -> bool {
        self.orders
            .get(&order_id)
            .map(|o| o.status.holds_capacity())
            .unwrap_or(false)
    }

    fn order_is_purchased(&self, order_id: OrderId) -> bool {
        self.orders
            .get(&order_id)
            .map(|o| o.status == OrderStatus::Purchased)
            .unwrap_or(false)
    }
}

/// In-memory ticket store implementation for tests and local runs.
///
/// Stores all rows in memory behind one lock and provides the same
/// interface and counting semantics as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryTicketStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryTicketStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of order rows.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of ticket rows.
    pub async fn ticket_count(&self) -> usize {
        self.state.read().await.tickets.len()
    }

    /// Clears all rows.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = State::default();
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn next_order_id(&self) -> Result<OrderId> {
        let mut state = self.state.write().await;
        state.next_order_id += 1;
        Ok(OrderId::new(state.next_order_id))
    }

    async fn next_line_item_id(&self) -> Result<TicketOrderId> {
        let mut state = self.state.write().await;
        state.next_line_item_id += 1;
        Ok(TicketOrderId::new(state.next_line_item_id))
    }

    async fn next_ticket_id(&self) -> Result<TicketId> {
        let mut state = self.state.write().await;
        state.next_ticket_id += 1;
        Ok(TicketId::new(state.next_ticket_id))
    }

    async fn next_ticket_type_id(&self) -> Result<TicketTypeId> {
        let mut state = self.state.write().await;
        state.next_ticket_type_id += 1;
        Ok(TicketTypeId::new(state.next_ticket_type_id))
    }

    async fn next_event_id(&self) -> Result<EventId> {
        let mut state = self.state.write().await;
        state.next_event_id += 1;
        Ok(EventId::new(state.next_event_id))
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        let mut state = self.state.write().await;
        state.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        let mut state = self.state.write().await;
        state.ticket_types.insert(ticket_type.id, ticket_type.clone());
        Ok(())
    }

    async fn update_ticket_type(&self, ticket_type: &TicketType) -> Result<()> {
        let mut state = self.state.write().await;
        state.ticket_types.insert(ticket_type.id, ticket_type.clone());
        Ok(())
    }

    async fn get_ticket_type(&self, id: TicketTypeId) -> Result<Option<TicketType>> {
        Ok(self.state.read().await.ticket_types.get(&id).cloned())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn find_order_by_key(&self, key: &OrderKey) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.values().find(|o| &o.order_key == key).cloned())
    }

    async fn find_order_by_payment_key(&self, key: &PaymentKey) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .find(|o| &o.payment_key == key)
            .cloned())
    }

    async fn find_started_order(
        &self,
        user: UserId,
        account: AccountId,
    ) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .find(|o| {
                o.user_id == Some(user)
                    && o.account_id == account
                    && o.status == OrderStatus::Started
                    && !o.locked
            })
            .cloned())
    }

    async fn stale_started_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut stale: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Started && o.session_start < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|o| o.id);
        Ok(stale)
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        let line_item_ids: Vec<_> = state
            .line_items
            .values()
            .filter(|li| li.order_id == id)
            .map(|li| li.id)
            .collect();
        state
            .tickets
            .retain(|_, t| !line_item_ids.contains(&t.ticket_order_id));
        state.line_items.retain(|_, li| li.order_id != id);
        state.orders.remove(&id);
        Ok(())
    }

    async fn get_line_item(
        &self,
        order: OrderId,
        ticket_type: TicketTypeId,
    ) -> Result<Option<TicketOrder>> {
        let state = self.state.read().await;
        Ok(state
            .line_items
            .values()
            .find(|li| li.order_id == order && li.ticket_type_id == ticket_type)
            .cloned())
    }

    async fn line_items_for_order(&self, order: OrderId) -> Result<Vec<TicketOrder>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state
            .line_items
            .values()
            .filter(|li| li.order_id == order)
            .cloned()
            .collect();
        items.sort_by_key(|li| li.id);
        Ok(items)
    }

    async fn upsert_line_item(&self, line_item: &TicketOrder) -> Result<()> {
        let mut state = self.state.write().await;
        // enforce one row per (order, ticket type), like the unique index
        let existing = state
            .line_items
            .values()
            .find(|li| {
                li.order_id == line_item.order_id
                    && li.ticket_type_id == line_item.ticket_type_id
            })
            .map(|li| li.id);
        match existing.and_then(|id| state.line_items.get_mut(&id)) {
            Some(row) => row.quantity = line_item.quantity,
            None => {
                state.line_items.insert(line_item.id, line_item.clone());
            }
        }
        Ok(())
    }

    async fn delete_line_item(&self, id: TicketOrderId) -> Result<()> {
        let mut state = self.state.write().await;
        state.line_items.remove(&id);
        Ok(())
    }

    async fn reserved_or_sold(&self, ticket_type: TicketTypeId) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .line_items
            .values()
            .filter(|li| {
                li.ticket_type_id == ticket_type && state.order_holds_capacity(li.order_id)
            })
            .map(|li| i64::from(li.quantity))
            .sum())
    }

    async fn purchased(&self, ticket_type: TicketTypeId) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .line_items
            .values()
            .filter(|li| {
                li.ticket_type_id == ticket_type && state.order_is_purchased(li.order_id)
            })
            .map(|li| i64::from(li.quantity))
            .sum())
    }

    async fn tickets_for_order(&self, order: OrderId) -> Result<Vec<Ticket>> {
        let state = self.state.read().await;
        let line_item_ids: Vec<_> = state
            .line_items
            .values()
            .filter(|li| li.order_id == order)
            .map(|li| li.id)
            .collect();
        let mut tickets: Vec<_> = state
            .tickets
            .values()
            .filter(|t| line_item_ids.contains(&t.ticket_order_id))
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.id);
        Ok(tickets)
    }

    async fn commit_purchase(&self, order: &Order, tickets: &[Ticket]) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.insert(order.id, order.clone());
        for ticket in tickets {
            state.tickets.insert(ticket.id, ticket.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Money;

    async fn seed_order(store: &InMemoryTicketStore, account: i64, user: i64) -> Order {
        let id = store.next_order_id().await.unwrap();
        let order = Order::new(
            id,
            AccountId::new(account),
            Some(UserId::new(user)),
            Utc::now(),
        );
        store.insert_order(&order).await.unwrap();
        order
    }

    async fn seed_line(
        store: &InMemoryTicketStore,
        order: &Order,
        ticket_type: TicketTypeId,
        quantity: u32,
    ) -> TicketOrder {
        let id = store.next_line_item_id().await.unwrap();
        let line = TicketOrder::new(id, order.id, ticket_type, quantity);
        store.upsert_line_item(&line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let store = InMemoryTicketStore::new();
        assert_eq!(store.next_order_id().await.unwrap(), OrderId::new(1));
        assert_eq!(store.next_order_id().await.unwrap(), OrderId::new(2));
        assert_eq!(store.next_ticket_id().await.unwrap(), TicketId::new(1));
    }

    #[tokio::test]
    async fn reserved_counts_exclude_timeout_and_cancelled() {
        let store = InMemoryTicketStore::new();
        let tt = TicketTypeId::new(1);

        let held = seed_order(&store, 1, 1).await;
        seed_line(&store, &held, tt, 3).await;

        let mut timed_out = seed_order(&store, 1, 2).await;
        seed_line(&store, &timed_out, tt, 4).await;
        timed_out.timeout();
        store.update_order(&timed_out).await.unwrap();

        let mut cancelled = seed_order(&store, 1, 3).await;
        seed_line(&store, &cancelled, tt, 5).await;
        cancelled.cancel();
        store.update_order(&cancelled).await.unwrap();

        assert_eq!(store.reserved_or_sold(tt).await.unwrap(), 3);
        assert_eq!(store.purchased(tt).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn purchased_counts_only_purchased_orders() {
        let store = InMemoryTicketStore::new();
        let tt = TicketTypeId::new(1);

        let started = seed_order(&store, 1, 1).await;
        seed_line(&store, &started, tt, 2).await;

        let mut paid = seed_order(&store, 1, 2).await;
        seed_line(&store, &paid, tt, 6).await;
        paid.lock(1).unwrap();
        paid.purchase(Utc::now()).unwrap();
        store.update_order(&paid).await.unwrap();

        assert_eq!(store.reserved_or_sold(tt).await.unwrap(), 8);
        assert_eq!(store.purchased(tt).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn counts_snapshot_derives_available() {
        let store = InMemoryTicketStore::new();
        let tt_id = store.next_ticket_type_id().await.unwrap();
        let tt = TicketType::new(tt_id, None, "GA", Money::from_cents(1000), 10);
        store.insert_ticket_type(&tt).await.unwrap();

        let order = seed_order(&store, 1, 1).await;
        seed_line(&store, &order, tt_id, 7).await;

        let counts = store.counts(&tt).await.unwrap();
        assert_eq!(counts.available(), 3);
        assert_eq!(counts.purchased, 0);
    }

    #[tokio::test]
    async fn upsert_replaces_quantity_for_same_pair() {
        let store = InMemoryTicketStore::new();
        let tt = TicketTypeId::new(1);
        let order = seed_order(&store, 1, 1).await;
        seed_line(&store, &order, tt, 2).await;

        // second upsert for the same (order, ticket type) replaces, never
        // duplicates
        let other_id = store.next_line_item_id().await.unwrap();
        store
            .upsert_line_item(&TicketOrder::new(other_id, order.id, tt, 5))
            .await
            .unwrap();

        let items = store.line_items_for_order(order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
    }

    #[tokio::test]
    async fn find_started_order_skips_locked_and_finished() {
        let store = InMemoryTicketStore::new();
        let user = UserId::new(1);
        let account = AccountId::new(1);

        let mut locked = seed_order(&store, 1, 1).await;
        locked.lock(1).unwrap();
        store.update_order(&locked).await.unwrap();
        assert!(
            store
                .find_started_order(user, account)
                .await
                .unwrap()
                .is_none()
        );

        let open = seed_order(&store, 1, 1).await;
        let found = store.find_started_order(user, account).await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(open.id));
    }

    #[tokio::test]
    async fn stale_orders_filter_by_status_and_cutoff() {
        let store = InMemoryTicketStore::new();
        let old = seed_order(&store, 1, 1).await;

        let mut fresh = seed_order(&store, 1, 2).await;
        fresh.touch(Utc::now() + chrono::Duration::hours(1));
        store.update_order(&fresh).await.unwrap();

        let stale = store.stale_started_orders(Utc::now()).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old.id);
    }

    #[tokio::test]
    async fn delete_order_cascades_to_line_items_and_tickets() {
        let store = InMemoryTicketStore::new();
        let order = seed_order(&store, 1, 1).await;
        let line = seed_line(&store, &order, TicketTypeId::new(1), 2).await;

        let ticket_id = store.next_ticket_id().await.unwrap();
        let ticket = Ticket::new(ticket_id, line.id, UserId::new(1), Utc::now());
        store.commit_purchase(&order, &[ticket]).await.unwrap();
        assert_eq!(store.ticket_count().await, 1);

        store.delete_order(order.id).await.unwrap();
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.ticket_count().await, 0);
        assert!(
            store
                .line_items_for_order(order.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn commit_purchase_stores_order_and_tickets_together() {
        let store = InMemoryTicketStore::new();
        let mut order = seed_order(&store, 1, 1).await;
        let line = seed_line(&store, &order, TicketTypeId::new(1), 2).await;

        order.lock(1).unwrap();
        order.purchase(Utc::now()).unwrap();
        let tickets = vec![
            Ticket::new(
                store.next_ticket_id().await.unwrap(),
                line.id,
                UserId::new(1),
                Utc::now(),
            ),
            Ticket::new(
                store.next_ticket_id().await.unwrap(),
                line.id,
                UserId::new(1),
                Utc::now(),
            ),
        ];
        store.commit_purchase(&order, &tickets).await.unwrap();

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert!(stored.is_purchased());
        assert_eq!(store.tickets_for_order(order.id).await.unwrap().len(), 2);
    }
}
