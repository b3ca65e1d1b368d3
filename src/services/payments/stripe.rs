//! Stripe payment provider client.
//!
//! Covers the two calls reconciliation needs: customer creation and
//! subscription listing. Stripe takes form-encoded writes and returns JSON.

use super::{PaymentError, PaymentProvider, ProviderSubscription};
use crate::config::StripeConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;

/// Stripe client for interacting with the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    data: Vec<ProviderSubscription>,
}

/// Stripe API error envelope.
#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Stripe is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    fn decode_error(body: &str) -> PaymentError {
        match serde_json::from_str::<StripeErrorEnvelope>(body) {
            Ok(envelope) => PaymentError::ApiError(format!(
                "{}: {}",
                envelope.error.error_type,
                envelope.error.message.unwrap_or_default()
            )),
            Err(_) => PaymentError::ApiError(body.to_string()),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured(
                "Stripe credentials not configured".to_string(),
            ));
        }

        let url = format!("{}/customers", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&[("email", email), ("metadata[user_id]", user_id)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = %status, "Stripe customer creation failed");
            return Err(Self::decode_error(&body));
        }

        let customer: StripeCustomer = serde_json::from_str(&body)
            .map_err(|e| PaymentError::ApiError(format!("Invalid customer response: {}", e)))?;

        tracing::info!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer.id)
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::NotConfigured(
                "Stripe credentials not configured".to_string(),
            ));
        }

        let url = format!("{}/subscriptions", self.config.api_base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .query(&[("customer", customer_id), ("status", "all")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Stripe list_subscriptions response");

        if !status.is_success() {
            return Err(Self::decode_error(&body));
        }

        let list: SubscriptionList = serde_json::from_str(&body)
            .map_err(|e| PaymentError::ApiError(format!("Invalid subscription list: {}", e)))?;

        Ok(list.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config(key: &str) -> StripeConfig {
        StripeConfig {
            secret_key: Secret::new(key.to_string()),
            product_id: "prod_chatdeck".to_string(),
            api_base_url: "https://api.stripe.com/v1".to_string(),
        }
    }

    #[test]
    fn is_configured_requires_a_secret_key() {
        assert!(StripeClient::new(test_config("sk_test_123")).is_configured());
        assert!(!StripeClient::new(test_config("")).is_configured());
    }

    #[test]
    fn deserializes_subscription_list() {
        let body = r#"{
            "object": "list",
            "data": [{
                "id": "sub_123",
                "status": "active",
                "items": {
                    "data": [{
                        "price": {
                            "id": "price_pro_monthly",
                            "unit_amount": 9900,
                            "nickname": "Pro Monthly",
                            "product": "prod_chatdeck"
                        }
                    }]
                }
            }]
        }"#;

        let list: SubscriptionList = serde_json::from_str(body).unwrap();
        assert_eq!(list.data.len(), 1);
        let subscription = &list.data[0];
        assert_eq!(subscription.id, "sub_123");
        assert_eq!(subscription.status, "active");
        let price = &subscription.items.data[0].price;
        assert_eq!(price.unit_amount, Some(9900));
        assert_eq!(price.nickname.as_deref(), Some("Pro Monthly"));
        assert_eq!(price.product, "prod_chatdeck");
    }

    #[test]
    fn decodes_stripe_error_envelope() {
        let body = r#"{"error": {"type": "invalid_request_error", "message": "No such customer"}}"#;
        match StripeClient::decode_error(body) {
            PaymentError::ApiError(msg) => {
                assert!(msg.contains("invalid_request_error"));
                assert!(msg.contains("No such customer"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
