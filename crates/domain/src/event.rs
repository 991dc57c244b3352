//! Events: the minimal ownership anchor for ticket types.
//!
//! Event management is a separate concern; the engine only needs to know
//! which account an event (and therefore a ticket type) belongs to, so
//! cross-account reservations can be rejected.

use common::{AccountId, EventId};
use serde::{Deserialize, Serialize};

/// An event tickets are sold for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,

    /// Account (tenant) owning the event.
    pub account_id: AccountId,

    /// Display name.
    pub name: String,
}

impl Event {
    /// Creates a new event.
    pub fn new(id: EventId, account_id: AccountId, name: impl Into<String>) -> Self {
        Self {
            id,
            account_id,
            name: name.into(),
        }
    }
}
