use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    pub openai: OpenAiConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    /// Stripe product id this app's subscriptions are sold under. Line
    /// items for other products are ignored during reconciliation.
    pub product_id: String,
    pub api_base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: Secret<String>,
    pub api_base_url: String,
    pub default_chat_model: String,
    pub request_timeout_secs: u64,
    /// Retries on transient network failure, not on provider errors.
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BACKEND_PORT")
            .unwrap_or_else(|_| "3010".to_string())
            .parse()?;

        let db_url =
            env::var("BACKEND_DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = env::var("BACKEND_DATABASE_NAME").unwrap_or_else(|_| "chatdeck".to_string());

        let stripe_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();
        let stripe_product = env::var("STRIPE_PRODUCT_ID").unwrap_or_default();
        let stripe_base =
            env::var("STRIPE_API_BASE_URL").unwrap_or_else(|_| "https://api.stripe.com/v1".to_string());

        let openai_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let openai_base =
            env::var("OPENAI_API_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let default_chat_model =
            env::var("OPENAI_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let request_timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .unwrap_or(120);
        let max_retries = env::var("PROVIDER_MAX_RETRIES")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .unwrap_or(2);

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            stripe: StripeConfig {
                secret_key: Secret::new(stripe_key),
                product_id: stripe_product,
                api_base_url: stripe_base,
            },
            openai: OpenAiConfig {
                api_key: Secret::new(openai_key),
                api_base_url: openai_base,
                default_chat_model,
                request_timeout_secs,
                max_retries,
            },
            service_name: "chatdeck-backend".to_string(),
        })
    }
}
