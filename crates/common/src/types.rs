use serde::{Deserialize, Serialize};

/// Declares an `i64`-backed identifier newtype.
///
/// All entity ids share the same surface: construction from the raw
/// integer, access to it, `Display`, and transparent serde so the ids
/// appear as plain numbers on the wire and in JSON columns.
macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw integer identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying integer.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type! {
    /// Identifier of a selling account (tenant).
    AccountId
}

id_type! {
    /// Identifier of a buyer.
    UserId
}

id_type! {
    /// Identifier of an event a ticket type belongs to.
    EventId
}

id_type! {
    /// Identifier of a sellable ticket type.
    TicketTypeId
}

id_type! {
    /// Identifier of an order session.
    OrderId
}

id_type! {
    /// Identifier of a line item within an order.
    TicketOrderId
}

id_type! {
    /// Identifier of an issued ticket.
    TicketId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrips_raw_integer() {
        let id = TicketTypeId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(TicketTypeId::from(42), id);
    }

    #[test]
    fn id_display_is_the_integer() {
        assert_eq!(OrderId::new(7).to_string(), "7");
    }

    #[test]
    fn id_serializes_transparently() {
        let json = serde_json::to_string(&AccountId::new(12)).unwrap();
        assert_eq!(json, "12");
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccountId::new(12));
    }
}
