//! External collaborator traits and their in-memory test implementations.

mod mailer;
mod payment;
mod subscription;

pub use mailer::{InMemoryTicketMailer, TicketMailer};
pub use payment::{InMemoryPaymentProvider, PaymentProvider, ProviderRegistry};
pub use subscription::{InMemorySubscriptionService, SubscriptionService};
