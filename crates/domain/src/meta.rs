//! Order fulfillment metadata.
//!
//! The original system kept a free-form key/value map per order; here the
//! flags that actually drive engine behavior are an explicit tagged
//! structure so the reservation and finalize branching stays exhaustive.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

/// How an order is fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fulfillment {
    /// Regular sale through the payment flow.
    #[default]
    Standard,

    /// Gifted by the organizer; skips payment and the availability check.
    Gifted,

    /// Sold at the door as paper tickets; skips the availability check
    /// and suppresses ticket delivery.
    Paper,

    /// Tickets are allocated to several recipients at finalize time.
    /// The order owner comes first; any tickets beyond the listed users
    /// also fall back to the owner.
    MultiUser { user_ids: Vec<UserId> },
}

impl Fulfillment {
    /// Returns true if the availability check is skipped when reserving.
    pub fn skips_availability_check(&self) -> bool {
        matches!(self, Fulfillment::Gifted | Fulfillment::Paper)
    }

    /// Returns true if ticket delivery is suppressed after finalize.
    pub fn suppresses_delivery(&self) -> bool {
        matches!(self, Fulfillment::Paper)
    }
}

/// Timestamped audit marker for a background step, kept even on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    /// When the step ran.
    pub at: DateTime<Utc>,
    /// True if the step failed; the stamp is still recorded for auditing.
    #[serde(default)]
    pub failed: bool,
}

impl AuditStamp {
    /// Stamp for a successful step.
    pub fn ok(at: DateTime<Utc>) -> Self {
        Self { at, failed: false }
    }

    /// Stamp for a failed step.
    pub fn failed(at: DateTime<Utc>) -> Self {
        Self { at, failed: true }
    }
}

/// Per-order metadata persisted alongside the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderMeta {
    /// Fulfillment mode of the order.
    #[serde(default)]
    pub fulfillment: Fulfillment,

    /// Set once tickets were minted (or minting failed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_created: Option<AuditStamp>,

    /// Set once tickets were delivered (or delivery failed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_sent: Option<AuditStamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_fulfillment_checks_availability() {
        assert!(!Fulfillment::Standard.skips_availability_check());
        assert!(!Fulfillment::MultiUser { user_ids: vec![] }.skips_availability_check());
    }

    #[test]
    fn test_gifted_and_paper_skip_availability() {
        assert!(Fulfillment::Gifted.skips_availability_check());
        assert!(Fulfillment::Paper.skips_availability_check());
    }

    #[test]
    fn test_only_paper_suppresses_delivery() {
        assert!(Fulfillment::Paper.suppresses_delivery());
        assert!(!Fulfillment::Gifted.suppresses_delivery());
        assert!(!Fulfillment::Standard.suppresses_delivery());
    }

    #[test]
    fn test_meta_serde_roundtrip() {
        let meta = OrderMeta {
            fulfillment: Fulfillment::MultiUser {
                user_ids: vec![UserId::new(1), UserId::new(2)],
            },
            tickets_created: Some(AuditStamp::ok(Utc::now())),
            tickets_sent: Some(AuditStamp::failed(Utc::now())),
        };
        let json = serde_json::to_value(&meta).unwrap();
        let back: OrderMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_empty_meta_deserializes_with_defaults() {
        let meta: OrderMeta = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.fulfillment, Fulfillment::Standard);
        assert!(meta.tickets_created.is_none());
        assert!(meta.tickets_sent.is_none());
    }
}
