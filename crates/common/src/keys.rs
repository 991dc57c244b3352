use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares an opaque 32-character key newtype.
///
/// Keys are generated from a random UUID rendered as simple hex, giving
/// the same shape as the keys the original system handed to buyers and
/// payment providers: unguessable, URL-safe, fixed width.
macro_rules! key_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generates a fresh random key.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().simple().to_string())
            }

            /// Returns the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_string())
            }
        }
    };
}

key_type! {
    /// Opaque key identifying an order towards the buyer session.
    OrderKey
}

key_type! {
    /// Opaque key identifying an order towards the payment provider.
    PaymentKey
}
