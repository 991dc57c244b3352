//! Ticket types, the sellable products.

use chrono::{DateTime, Utc};
use common::{EventId, TicketTypeId};
use serde::{Deserialize, Serialize};

use crate::availability::Availability;
use crate::money::Money;

/// A sellable product with a fixed unit capacity, belonging to an event.
///
/// `units` is capacity, not a live counter: how many units are left is
/// always derived from the order rows, and the `availability` field is
/// only ever written by the recompute engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    /// Unique ticket type identifier.
    pub id: TicketTypeId,

    /// Event this ticket type grants access to. A ticket type without an
    /// event cannot be reserved.
    pub event_id: Option<EventId>,

    /// Display name.
    pub name: String,

    /// Unit price in cents; zero means free.
    pub price: Money,

    /// Fixed capacity in units.
    pub units: u32,

    /// Whether the ticket type is open for sale.
    pub active: bool,

    /// Derived public availability, maintained by recomputation.
    pub availability: Availability,

    /// Optional sales window start.
    pub sales_start: Option<DateTime<Utc>>,

    /// Optional sales window end.
    pub sales_end: Option<DateTime<Utc>>,
}

impl TicketType {
    /// Creates a new, initially inactive ticket type.
    pub fn new(
        id: TicketTypeId,
        event_id: Option<EventId>,
        name: impl Into<String>,
        price: Money,
        units: u32,
    ) -> Self {
        Self {
            id,
            event_id,
            name: name.into(),
            price,
            units,
            active: false,
            availability: Availability::Available,
            sales_start: None,
            sales_end: None,
        }
    }

    /// Opens the ticket type for sale.
    pub fn publish(&mut self) {
        tracing::debug!(ticket_type_id = %self.id, "publishing ticket type");
        self.active = true;
    }

    /// Closes the ticket type for sale.
    pub fn unpublish(&mut self) {
        tracing::debug!(ticket_type_id = %self.id, "unpublishing ticket type");
        self.active = false;
    }

    /// Returns true if the ticket type is free of charge.
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ticket_type_starts_inactive_and_available() {
        let tt = TicketType::new(
            TicketTypeId::new(1),
            Some(EventId::new(2)),
            "Early Bird",
            Money::from_cents(2500),
            100,
        );
        assert!(!tt.active);
        assert_eq!(tt.availability, Availability::Available);
        assert!(!tt.is_free());
    }

    #[test]
    fn test_publish_unpublish() {
        let mut tt = TicketType::new(TicketTypeId::new(1), None, "Door", Money::zero(), 10);
        tt.publish();
        assert!(tt.active);
        tt.unpublish();
        assert!(!tt.active);
    }

    #[test]
    fn test_zero_price_is_free() {
        let tt = TicketType::new(TicketTypeId::new(1), None, "Guest list", Money::zero(), 10);
        assert!(tt.is_free());
    }
}
