//! Order lifecycle state machine.

use serde::{Deserialize, Serialize};

use crate::error::UnknownState;

/// The state of an order session.
///
/// State transitions:
/// ```text
///                 ┌──► Purchased ──► Cancelled
/// Started ────────┤        ▲
///                 │        │ (late payment confirmation)
///                 └──► Timeout
/// ```
///
/// A timed-out order can still be purchased: a payment confirmation that
/// arrives after the session expired is honored rather than dropped, at
/// the documented risk of overbooking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// The buyer session is open; line items can be added and removed.
    #[default]
    Started,

    /// Payment was confirmed; tickets have been or are being issued.
    Purchased,

    /// The session slid past its window and its reservation was released.
    Timeout,

    /// The order was cancelled by the organizer (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if line items of an order in this state count against
    /// a ticket type's capacity.
    ///
    /// Started orders hold capacity even before payment; that is the
    /// whole point of a reservation session.
    pub fn holds_capacity(&self) -> bool {
        !matches!(self, OrderStatus::Timeout | OrderStatus::Cancelled)
    }

    /// Returns true if the reaper may time out an order in this state.
    pub fn can_time_out(&self) -> bool {
        matches!(self, OrderStatus::Started)
    }

    /// Returns true if this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Returns the state name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Started => "started",
            OrderStatus::Purchased => "purchased",
            OrderStatus::Timeout => "timeout",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(OrderStatus::Started),
            "purchased" => Ok(OrderStatus::Purchased),
            "timeout" => Ok(OrderStatus::Timeout),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownState(other.to_string())),
        }
    }
}
