//! Background recompute queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use common::TicketTypeId;
use store::TicketStore;
use tokio::sync::mpsc;

use crate::engine::AvailabilityEngine;

/// Fire-and-forget handle for scheduling availability recomputes.
///
/// Reservation, finalize and reaper paths push ticket type ids here and
/// move on; a detached worker drains the queue and drives the engine.
/// Delivery is at-least-once: a failed recompute is retried once, then
/// logged and dropped, which is safe because recompute is idempotent and
/// the next mutating event enqueues the ticket type again.
#[derive(Clone)]
pub struct RecomputeQueue {
    tx: mpsc::UnboundedSender<TicketTypeId>,
    processed: Arc<AtomicU64>,
}

impl RecomputeQueue {
    /// Spawns the worker task and returns the queue handle.
    pub fn spawn<S>(engine: AvailabilityEngine<S>) -> Self
    where
        S: TicketStore + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<TicketTypeId>();
        let processed = Arc::new(AtomicU64::new(0));

        let counter = processed.clone();
        tokio::spawn(async move {
            while let Some(ticket_type_id) = rx.recv().await {
                if let Err(err) = engine.recompute(ticket_type_id).await {
                    tracing::warn!(
                        error = %err,
                        %ticket_type_id,
                        "availability recompute failed, retrying once"
                    );
                    if let Err(err) = engine.recompute(ticket_type_id).await {
                        tracing::error!(
                            error = %err,
                            %ticket_type_id,
                            "availability recompute failed after retry, dropping"
                        );
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                metrics::counter!("availability_recomputes_total").increment(1);
            }
            tracing::debug!("recompute queue closed, worker exiting");
        });

        Self { tx, processed }
    }

    /// Schedules a recompute for a ticket type. Never blocks and never
    /// fails the caller; an enqueue after shutdown is logged and ignored.
    pub fn enqueue(&self, ticket_type_id: TicketTypeId) {
        if self.tx.send(ticket_type_id).is_err() {
            tracing::error!(%ticket_type_id, "recompute queue is closed, dropping request");
        }
    }

    /// Schedules a recompute for every ticket type in the iterator.
    pub fn enqueue_all(&self, ticket_type_ids: impl IntoIterator<Item = TicketTypeId>) {
        for id in ticket_type_ids {
            self.enqueue(id);
        }
    }

    /// Number of queue entries the worker has finished (including failed
    /// ones), for observability and test synchronization.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }
}
