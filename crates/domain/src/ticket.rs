//! Issued tickets.

use chrono::{DateTime, Utc};
use common::{TicketId, TicketOrderId, UserId};
use serde::{Deserialize, Serialize};

/// A concrete, individually identifiable unit issued from a line item.
///
/// Tickets exist only after an order was finalized; the count per line
/// item never exceeds that line item's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket identifier.
    pub id: TicketId,

    /// Line item this ticket was issued from.
    pub ticket_order_id: TicketOrderId,

    /// Owner of the ticket. Normally the order's user, but multi-user
    /// allocations can assign individual recipients.
    pub user_id: UserId,

    /// When the ticket was minted.
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Creates a new ticket.
    pub fn new(
        id: TicketId,
        ticket_order_id: TicketOrderId,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ticket_order_id,
            user_id,
            created_at,
        }
    }

    /// Returns the unique scan code printed on the ticket.
    pub fn code(&self) -> String {
        format!("{:09X}", self.id.as_i64())
    }
}
