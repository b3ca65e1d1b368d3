//! Mock payment provider for testing.

use super::{PaymentError, PaymentProvider, ProviderSubscription};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock payment provider with canned subscriptions.
#[derive(Default)]
pub struct MockPaymentProvider {
    subscriptions: Mutex<Vec<ProviderSubscription>>,
    created_customers: Mutex<Vec<String>>,
    failing: bool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that fails every call, to exercise fallback paths.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_subscriptions(subscriptions: Vec<ProviderSubscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
            ..Self::default()
        }
    }

    /// Emails passed to `create_customer` so far.
    pub fn created_customers(&self) -> Vec<String> {
        self.created_customers.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(&self, email: &str, _user_id: &str) -> Result<String, PaymentError> {
        if self.failing {
            return Err(PaymentError::NetworkError(
                "mock payment provider failing".to_string(),
            ));
        }

        let mut created = self.created_customers.lock().unwrap();
        created.push(email.to_string());
        Ok(format!("cus_mock_{}", created.len()))
    }

    async fn list_subscriptions(
        &self,
        _customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, PaymentError> {
        if self.failing {
            return Err(PaymentError::NetworkError(
                "mock payment provider failing".to_string(),
            ));
        }

        Ok(self.subscriptions.lock().unwrap().clone())
    }
}
