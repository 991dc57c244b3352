//! The `TicketStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, EventId, OrderId, OrderKey, PaymentKey, TicketId, TicketOrderId, TicketTypeId, UserId};
use domain::{Event, Order, Ticket, TicketOrder, TicketType};

use crate::Result;
use crate::counts::TicketTypeCounts;

/// Abstraction over the transactional datastore holding orders, line
/// items, ticket types and issued tickets.
///
/// Identifier allocation goes through the store (`next_*_id`) so both
/// backends hand out the same kind of monotonically increasing integers.
/// Every method is an independent committed operation; the one composite
/// call is [`commit_purchase`](TicketStore::commit_purchase), which must
/// flip the order and mint its tickets atomically, so a failed finalize
/// never leaves a partial ticket set behind.
#[async_trait]
pub trait TicketStore: Send + Sync {
    // --- identifier allocation ---

    /// Allocates the next order id.
    async fn next_order_id(&self) -> Result<OrderId>;

    /// Allocates the next line item id.
    async fn next_line_item_id(&self) -> Result<TicketOrderId>;

    /// Allocates the next ticket id.
    async fn next_ticket_id(&self) -> Result<TicketId>;

    /// Allocates the next ticket type id.
    async fn next_ticket_type_id(&self) -> Result<TicketTypeId>;

    /// Allocates the next event id.
    async fn next_event_id(&self) -> Result<EventId>;

    // --- events ---

    /// Persists a new event.
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Loads an event by id.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>>;

    // --- ticket types ---

    /// Persists a new ticket type.
    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<()>;

    /// Updates a ticket type (activation, derived availability).
    async fn update_ticket_type(&self, ticket_type: &TicketType) -> Result<()>;

    /// Loads a ticket type by id.
    async fn get_ticket_type(&self, id: TicketTypeId) -> Result<Option<TicketType>>;

    // --- orders ---

    /// Persists a new order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Updates an existing order row.
    async fn update_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Finds an order by its buyer-facing key.
    async fn find_order_by_key(&self, key: &OrderKey) -> Result<Option<Order>>;

    /// Finds an order by its payment-provider key.
    async fn find_order_by_payment_key(&self, key: &PaymentKey) -> Result<Option<Order>>;

    /// Finds the open (Started, unlocked) order of a user at an account,
    /// if any. This backs the lookup-or-create of `start_order`.
    async fn find_started_order(&self, user: UserId, account: AccountId)
    -> Result<Option<Order>>;

    /// Returns all Started orders whose session began before `cutoff`.
    async fn stale_started_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>>;

    /// Deletes an order together with its line items and tickets.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    // --- line items ---

    /// Loads the line item of an order for one ticket type.
    async fn get_line_item(
        &self,
        order: OrderId,
        ticket_type: TicketTypeId,
    ) -> Result<Option<TicketOrder>>;

    /// Returns all line items of an order.
    async fn line_items_for_order(&self, order: OrderId) -> Result<Vec<TicketOrder>>;

    /// Inserts a line item, or replaces the quantity of the existing row
    /// for the same (order, ticket type) pair.
    async fn upsert_line_item(&self, line_item: &TicketOrder) -> Result<()>;

    /// Deletes a line item (quantity set to zero).
    async fn delete_line_item(&self, id: TicketOrderId) -> Result<()>;

    // --- inventory counting ---

    /// Sum of line-item quantities over orders that hold capacity
    /// (status not in Timeout/Cancelled) for the ticket type.
    async fn reserved_or_sold(&self, ticket_type: TicketTypeId) -> Result<i64>;

    /// Sum of line-item quantities over Purchased orders for the ticket
    /// type.
    async fn purchased(&self, ticket_type: TicketTypeId) -> Result<i64>;

    /// Snapshot of both counts for a ticket type, re-derived from the
    /// current rows on every call, never cached.
    async fn counts(&self, ticket_type: &TicketType) -> Result<TicketTypeCounts> {
        Ok(TicketTypeCounts::new(
            ticket_type.units,
            self.reserved_or_sold(ticket_type.id).await?,
            self.purchased(ticket_type.id).await?,
        ))
    }

    // --- tickets ---

    /// Returns all tickets minted for an order, across its line items.
    async fn tickets_for_order(&self, order: OrderId) -> Result<Vec<Ticket>>;

    /// Atomically records a purchased order together with its freshly
    /// minted tickets. Either everything commits or nothing does.
    async fn commit_purchase(&self, order: &Order, tickets: &[Ticket]) -> Result<()>;
}
