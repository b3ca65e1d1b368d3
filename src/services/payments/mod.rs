//! Payment-provider abstraction.
//!
//! The provider is an opaque remote service supplying subscription records;
//! this module defines the slice of its surface the reconciler consumes.

pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use mock::MockPaymentProvider;
pub use stripe::StripeClient;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::NetworkError(err.to_string())
    }
}

/// A subscription as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
    pub items: SubscriptionItems,
}

/// Stripe nests line items under `items.data`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: ProviderPrice,
}

/// Price metadata the tier heuristics read.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPrice {
    pub id: String,
    /// Price per unit in minor currency units (cents).
    pub unit_amount: Option<i64>,
    pub nickname: Option<String>,
    pub product: String,
}

/// Payment provider operations the reconciler needs.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer for the email, returning the provider customer id.
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, PaymentError>;

    /// List the customer's subscriptions, any status.
    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, PaymentError>;
}
