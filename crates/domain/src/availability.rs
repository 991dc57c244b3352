//! Derived availability state machine for ticket types.

use serde::{Deserialize, Serialize};

use crate::error::UnknownState;

/// The public availability of a ticket type.
///
/// This is never authoritative: it is derived from the reservation counts
/// and re-derived after every mutating event. State transitions:
/// ```text
/// Available ──► Claimed ──► Sold
///     ▲            │          │
///     └────────────┴──────────┘  (capacity freed again)
/// ```
///
/// There is no direct Available → Sold transition; a sell-out always
/// passes through Claimed first, so a fully-claimed-and-purchased ticket
/// type needs one recompute per event to land on Sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Units can still be reserved.
    #[default]
    Available,

    /// Every unit is reserved or sold, but not all are paid for yet.
    Claimed,

    /// Every unit is purchased.
    Sold,
}

impl Availability {
    /// Computes the single next transition, if any.
    ///
    /// `available` is `units - reserved_or_sold` and may be negative under
    /// concurrent overbooking; `purchased` counts units in purchased
    /// orders. Sold → Available is a real transition: cancelling a
    /// purchased order restocks the ticket type and re-opens sales.
    pub fn next(self, available: i64, purchased: i64, units: u32) -> Option<Availability> {
        match self {
            Availability::Available if available <= 0 => Some(Availability::Claimed),
            Availability::Claimed if purchased >= i64::from(units) => Some(Availability::Sold),
            Availability::Claimed if available > 0 => Some(Availability::Available),
            Availability::Sold if available > 0 => Some(Availability::Available),
            _ => None,
        }
    }

    /// Returns the state name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Claimed => "claimed",
            Availability::Sold => "sold",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Availability {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Availability::Available),
            "claimed" => Ok(Availability::Claimed),
            "sold" => Ok(Availability::Sold),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_claims_when_exhausted() {
        assert_eq!(
            Availability::Available.next(0, 0, 10),
            Some(Availability::Claimed)
        );
        // transient overbooking counts as exhausted
        assert_eq!(
            Availability::Available.next(-3, 0, 10),
            Some(Availability::Claimed)
        );
        assert_eq!(Availability::Available.next(1, 0, 10), None);
    }

    #[test]
    fn test_claimed_sells_out_when_fully_purchased() {
        assert_eq!(
            Availability::Claimed.next(0, 10, 10),
            Some(Availability::Sold)
        );
        assert_eq!(
            Availability::Claimed.next(0, 12, 10),
            Some(Availability::Sold)
        );
    }

    #[test]
    fn test_claimed_reopens_when_capacity_freed() {
        assert_eq!(
            Availability::Claimed.next(4, 6, 10),
            Some(Availability::Available)
        );
    }

    #[test]
    fn test_claimed_holds_while_unpaid_and_exhausted() {
        assert_eq!(Availability::Claimed.next(0, 6, 10), None);
    }

    #[test]
    fn test_sold_reopens_after_cancellation() {
        // a purchased order was cancelled, freeing capacity
        assert_eq!(
            Availability::Sold.next(2, 8, 10),
            Some(Availability::Available)
        );
        assert_eq!(Availability::Sold.next(0, 10, 10), None);
    }

    #[test]
    fn test_no_direct_available_to_sold() {
        // even fully purchased, an Available ticket type first claims;
        // a second recompute is needed to reach Sold
        let first = Availability::Available.next(0, 10, 10);
        assert_eq!(first, Some(Availability::Claimed));
        let second = first.unwrap().next(0, 10, 10);
        assert_eq!(second, Some(Availability::Sold));
    }

    #[test]
    fn test_purchased_beyond_units_still_sells() {
        // overbooked and fully paid: purchased can exceed units
        assert_eq!(
            Availability::Claimed.next(-2, 12, 10),
            Some(Availability::Sold)
        );
    }

    #[test]
    fn test_roundtrip_through_str() {
        for availability in [
            Availability::Available,
            Availability::Claimed,
            Availability::Sold,
        ] {
            assert_eq!(
                availability.as_str().parse::<Availability>().unwrap(),
                availability
            );
        }
        assert!("reserved".parse::<Availability>().is_err());
    }
}
