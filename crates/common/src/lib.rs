//! Shared types for the ticketing engine.
//!
//! Every entity identifier is an `i64` newtype: the external contract
//! (task entrypoints, payment callbacks) passes plain integers, and the
//! newtypes keep an account id from ever being handed to a function that
//! wanted a ticket type id. Order and payment keys are opaque 32-character
//! strings handed out to buyers and payment providers.

mod keys;
mod types;

pub use keys::{OrderKey, PaymentKey};
pub use types::{AccountId, EventId, OrderId, TicketId, TicketOrderId, TicketTypeId, UserId};
