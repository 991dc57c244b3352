//! Order line items.

use common::{OrderId, TicketOrderId, TicketTypeId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A requested quantity of one ticket type within one order.
///
/// At most one line item exists per (order, ticket type) pair; setting a
/// quantity of zero deletes the row rather than keeping it around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOrder {
    /// Unique line item identifier.
    pub id: TicketOrderId,

    /// Owning order.
    pub order_id: OrderId,

    /// Reserved ticket type.
    pub ticket_type_id: TicketTypeId,

    /// Requested quantity, always positive for a persisted row.
    pub quantity: u32,
}

impl TicketOrder {
    /// Creates a new line item.
    pub fn new(
        id: TicketOrderId,
        order_id: OrderId,
        ticket_type_id: TicketTypeId,
        quantity: u32,
    ) -> Self {
        Self {
            id,
            order_id,
            ticket_type_id,
            quantity,
        }
    }

    /// Total price of the line item at the given unit price.
    pub fn total(&self, unit_price: Money) -> Money {
        unit_price.times(self.quantity)
    }
}
