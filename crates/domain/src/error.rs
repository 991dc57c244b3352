//! Domain error types.

use thiserror::Error;

/// Errors raised by order lifecycle transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// Empty orders cannot be locked.
    #[error("empty orders cannot be locked")]
    Empty,

    /// A user must be bound to the order before it can be locked.
    #[error("no user connected to the order")]
    NoUser,

    /// Only locked orders can be purchased.
    #[error("only locked orders can be purchased")]
    NotLocked,
}

/// A state string read from storage did not match any known variant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown state: {0}")]
pub struct UnknownState(pub String);
