//! Subscription quota trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::AccountId;

use crate::error::ReservationError;

/// Trait for the subscription/quota collaborator.
///
/// The engine only ever asks one question: may this account start another
/// paid transaction in the current billing period? Free ticket types
/// bypass the answer entirely.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Returns true if the account has paid-transaction quota left.
    async fn has_available_transaction_quota(
        &self,
        account: AccountId,
    ) -> Result<bool, ReservationError>;
}

#[derive(Debug, Default)]
struct InMemorySubscriptionState {
    exhausted: HashMap<AccountId, bool>,
    fail_on_check: bool,
}

/// In-memory subscription service for testing.
///
/// Accounts have quota by default; individual accounts can be marked
/// exhausted.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionService {
    state: Arc<RwLock<InMemorySubscriptionState>>,
}

impl InMemorySubscriptionService {
    /// Creates a new in-memory subscription service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an account's quota as exhausted (or restores it).
    pub fn set_quota_exhausted(&self, account: AccountId, exhausted: bool) {
        self.state
            .write()
            .unwrap()
            .exhausted
            .insert(account, exhausted);
    }

    /// Configures the service to fail on the next check.
    pub fn set_fail_on_check(&self, fail: bool) {
        self.state.write().unwrap().fail_on_check = fail;
    }
}

#[async_trait]
impl SubscriptionService for InMemorySubscriptionService {
    async fn has_available_transaction_quota(
        &self,
        account: AccountId,
    ) -> Result<bool, ReservationError> {
        let state = self.state.read().unwrap();
        if state.fail_on_check {
            return Err(ReservationError::SubscriptionService(
                "subscription lookup unavailable".to_string(),
            ));
        }
        Ok(!state.exhausted.get(&account).copied().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_quota_available_by_default() {
        let service = InMemorySubscriptionService::new();
        assert!(
            service
                .has_available_transaction_quota(AccountId::new(1))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_exhausted_account_has_no_quota() {
        let service = InMemorySubscriptionService::new();
        service.set_quota_exhausted(AccountId::new(1), true);

        assert!(
            !service
                .has_available_transaction_quota(AccountId::new(1))
                .await
                .unwrap()
        );
        // other accounts are unaffected
        assert!(
            service
                .has_available_transaction_quota(AccountId::new(2))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_fail_on_check() {
        let service = InMemorySubscriptionService::new();
        service.set_fail_on_check(true);

        let result = service
            .has_available_transaction_quota(AccountId::new(1))
            .await;
        assert!(result.is_err());
    }
}
