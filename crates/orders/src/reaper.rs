//! Session reaper: times out abandoned order sessions.

use std::collections::BTreeSet;

use availability::RecomputeQueue;
use chrono::{Duration, Utc};
use store::TicketStore;

use crate::error::Result;

/// Periodic sweep that expires stale Started orders.
///
/// Safe to run frequently and concurrently with itself: the sweep only
/// matches Started orders, so an order that a concurrent checkout already
/// moved on is simply skipped, and re-sweeping a timed-out order is a
/// no-op. Failures are caught and logged; a broken sweep must never
/// crash its caller.
pub struct SessionReaper<S> {
    store: S,
    recompute: RecomputeQueue,
}

impl<S: TicketStore> SessionReaper<S> {
    /// Creates a new session reaper.
    pub fn new(store: S, recompute: RecomputeQueue) -> Self {
        Self { store, recompute }
    }

    /// Times out every Started order whose session began more than
    /// `max_age` ago and schedules availability recomputes for the ticket
    /// types they held. Returns the number of orders timed out.
    #[tracing::instrument(skip(self))]
    pub async fn timeout_sessions(&self, max_age: Duration) -> u64 {
        let cutoff = Utc::now() - max_age;
        let stale = match self.store.stale_started_orders(cutoff).await {
            Ok(orders) => orders,
            Err(err) => {
                tracing::error!(error = %err, "failed fetching stale sessions");
                return 0;
            }
        };

        let mut total = 0;
        for mut order in stale {
            if !order.status.can_time_out() {
                continue;
            }
            if let Err(err) = self.timeout_one(&mut order).await {
                tracing::error!(order_id = %order.id, error = %err, "failed timing out session");
                continue;
            }
            total += 1;
        }

        if total > 0 {
            tracing::info!(timed_out = total, "session sweep complete");
        }
        metrics::counter!("sessions_timed_out_total").increment(total);
        total
    }

    async fn timeout_one(&self, order: &mut domain::Order) -> Result<()> {
        order.timeout();
        self.store.update_order(order).await?;

        // release is implicit; the recompute makes the public flag catch up
        let line_items = self.store.line_items_for_order(order.id).await?;
        let ticket_type_ids: BTreeSet<_> =
            line_items.iter().map(|li| li.ticket_type_id).collect();
        self.recompute.enqueue_all(ticket_type_ids);
        Ok(())
    }
}
