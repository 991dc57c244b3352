//! The write side of the ticketing engine.
//!
//! Three services drive an order through its life:
//! - [`ReservationService`] starts sessions and reserves quantities of
//!   ticket types against derived availability
//! - [`CheckoutService`] locks orders, hands off to a payment provider
//!   and idempotently materializes tickets once payment is confirmed
//! - [`SessionReaper`] sweeps abandoned sessions back into the pool
//!
//! External concerns (subscription quota, ticket delivery, payment
//! providers) sit behind traits in [`services`], with in-memory
//! implementations for tests.

mod checkout;
mod error;
mod reaper;
mod reservation;
pub mod services;

pub use checkout::CheckoutService;
pub use error::{ReservationError, Result};
pub use reaper::SessionReaper;
pub use reservation::ReservationService;
pub use services::{
    InMemoryPaymentProvider, InMemorySubscriptionService, InMemoryTicketMailer, PaymentProvider,
    ProviderRegistry, SubscriptionService, TicketMailer,
};
