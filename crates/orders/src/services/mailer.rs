//! Ticket delivery trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, Ticket};

/// Trait for the notification/mail collaborator.
///
/// Delivery is fire-and-forget from the engine's point of view: a failed
/// delivery is recorded in the order's audit stamps and retried by the
/// caller, never surfaced as an error from finalize.
#[async_trait]
pub trait TicketMailer: Send + Sync {
    /// Delivers the order's tickets to the recipient. Returns true on
    /// success.
    async fn deliver(&self, order: &Order, tickets: &[Ticket]) -> bool;
}

#[derive(Debug, Default)]
struct InMemoryMailerState {
    deliveries: Vec<(OrderId, usize)>,
    fail_on_deliver: bool,
}

/// In-memory mailer for testing; records every delivery.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketMailer {
    state: Arc<RwLock<InMemoryMailerState>>,
}

impl InMemoryTicketMailer {
    /// Creates a new in-memory mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the mailer to fail deliveries.
    pub fn set_fail_on_deliver(&self, fail: bool) {
        self.state.write().unwrap().fail_on_deliver = fail;
    }

    /// Returns the number of successful deliveries.
    pub fn delivery_count(&self) -> usize {
        self.state.read().unwrap().deliveries.len()
    }

    /// Returns true if the order had a successful delivery.
    pub fn has_delivered(&self, order_id: OrderId) -> bool {
        self.state
            .read()
            .unwrap()
            .deliveries
            .iter()
            .any(|(id, _)| *id == order_id)
    }
}

#[async_trait]
impl TicketMailer for InMemoryTicketMailer {
    async fn deliver(&self, order: &Order, tickets: &[Ticket]) -> bool {
        let mut state = self.state.write().unwrap();
        if state.fail_on_deliver {
            return false;
        }
        state.deliveries.push((order.id, tickets.len()));
        true
    }
}
