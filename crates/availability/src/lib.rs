//! Derived availability for ticket types.
//!
//! Availability is never maintained as a counter; it is recomputed from
//! the reservation counts after every mutating event. The synchronous
//! reservation path only enqueues ticket type ids on [`RecomputeQueue`]
//! and never waits for the result. The committed order rows are the
//! source of truth; the public availability flag is eventually consistent.

mod engine;
mod error;
mod queue;

pub use engine::AvailabilityEngine;
pub use error::{AvailabilityError, Result};
pub use queue::RecomputeQueue;
