//! Payment provider trait, registry and in-memory implementation.
//!
//! Providers form a closed set behind one trait, selected by the string
//! key stored on the order via a registry lookup. The engine only starts
//! checkouts; confirmations come back through the payment key on the
//! finalize path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, Order};

use crate::error::ReservationError;

/// Trait for a payment provider integration.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Registry key identifying this provider.
    fn key(&self) -> &'static str;

    /// Starts a checkout for a locked order and returns the provider
    /// reference the buyer is redirected to.
    async fn start_checkout(&self, order: &Order, total: Money)
    -> Result<String, ReservationError>;
}

/// String-keyed lookup of the registered payment providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its own key.
    pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
        self.providers.insert(provider.key(), provider);
    }

    /// Looks up a provider by key.
    pub fn get(&self, key: &str) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.get(key).cloned()
    }

    /// Returns the registered provider keys.
    pub fn keys(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    checkouts: Vec<(String, i64)>,
    next_id: u32,
    fail_on_checkout: bool,
}

/// In-memory payment provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProvider {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentProvider {
    /// Creates a new in-memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to fail on the next checkout.
    pub fn set_fail_on_checkout(&self, fail: bool) {
        self.state.write().unwrap().fail_on_checkout = fail;
    }

    /// Returns the number of started checkouts.
    pub fn checkout_count(&self) -> usize {
        self.state.read().unwrap().checkouts.len()
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    fn key(&self) -> &'static str {
        "testpay"
    }

    async fn start_checkout(
        &self,
        order: &Order,
        total: Money,
    ) -> Result<String, ReservationError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_checkout {
            return Err(ReservationError::PaymentProvider(
                "checkout declined".to_string(),
            ));
        }
        state.next_id += 1;
        let reference = format!("PAY-{:04}", state.next_id);
        state
            .checkouts
            .push((order.payment_key.to_string(), total.cents()));
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{AccountId, OrderId, UserId};

    fn test_order() -> Order {
        Order::new(
            OrderId::new(1),
            AccountId::new(1),
            Some(UserId::new(1)),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_checkout_returns_sequential_references() {
        let provider = InMemoryPaymentProvider::new();
        let order = test_order();

        let r1 = provider
            .start_checkout(&order, Money::from_cents(1000))
            .await
            .unwrap();
        let r2 = provider
            .start_checkout(&order, Money::from_cents(2000))
            .await
            .unwrap();

        assert_eq!(r1, "PAY-0001");
        assert_eq!(r2, "PAY-0002");
        assert_eq!(provider.checkout_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_on_checkout() {
        let provider = InMemoryPaymentProvider::new();
        provider.set_fail_on_checkout(true);

        let result = provider
            .start_checkout(&test_order(), Money::from_cents(1000))
            .await;
        assert!(result.is_err());
        assert_eq!(provider.checkout_count(), 0);
    }

    #[tokio::test]
    async fn test_registry_lookup_by_key() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(InMemoryPaymentProvider::new()));

        assert!(registry.get("testpay").is_some());
        assert!(registry.get("gcheckout").is_none());
        assert_eq!(registry.keys(), vec!["testpay"]);
    }
}
