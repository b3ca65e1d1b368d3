use chatdeck_backend::config::{
    Config, DatabaseConfig, OpenAiConfig, ServerConfig, StripeConfig,
};
use chatdeck_backend::services::payments::MockPaymentProvider;
use chatdeck_backend::services::providers::{MockChatProvider, MockImageProvider};
use chatdeck_backend::services::stores::{MemoryPlanStore, MemoryUsageStore};
use chatdeck_backend::{router, AppState};
use secrecy::Secret;
use std::sync::Arc;

pub const TEST_USER_ID: &str = "user-1";
pub const TEST_PRODUCT_ID: &str = "prod_chatdeck";

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: Secret::new("mongodb://localhost:27017".to_string()),
            db_name: "chatdeck_test".to_string(),
        },
        stripe: StripeConfig {
            secret_key: Secret::new("sk_test_123".to_string()),
            product_id: TEST_PRODUCT_ID.to_string(),
            api_base_url: "https://api.stripe.com/v1".to_string(),
        },
        openai: OpenAiConfig {
            api_key: Secret::new("test_key".to_string()),
            api_base_url: "https://api.openai.com/v1".to_string(),
            default_chat_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 5,
            max_retries: 0,
        },
        service_name: "chatdeck-backend-test".to_string(),
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub plans: Arc<MemoryPlanStore>,
    pub usage: Arc<MemoryUsageStore>,
}

impl TestApp {
    /// Spawn the app over in-memory stores and well-behaved mock providers.
    pub async fn spawn() -> Self {
        Self::spawn_with(
            MockChatProvider::new("Here is your deck outline.", 42),
            MockPaymentProvider::new(),
        )
        .await
    }

    pub async fn spawn_with(chat: MockChatProvider, payments: MockPaymentProvider) -> Self {
        let plans = Arc::new(MemoryPlanStore::new());
        let usage = Arc::new(MemoryUsageStore::new());

        let state = AppState::new(
            test_config(),
            plans.clone(),
            usage.clone(),
            Arc::new(payments),
            Arc::new(chat),
            Arc::new(MockImageProvider::new("https://images.example/out.png")),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().unwrap().port();
        let app = router(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            plans,
            usage,
        }
    }

    /// POST as the test user with identity headers set.
    pub fn post_as_user(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.address, path))
            .header("X-User-Id", TEST_USER_ID)
    }

    pub fn get_as_user(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.address, path))
            .header("X-User-Id", TEST_USER_ID)
    }

    /// Seed recorded usage for the test user on today's UTC day.
    pub async fn seed_usage_today(&self, tokens: i64) {
        let key = chatdeck_backend::models::date_key(chrono::Utc::now());
        chatdeck_backend::services::stores::UsageStore::increment(
            self.usage.as_ref(),
            TEST_USER_ID,
            &key,
            tokens,
        )
        .await
        .expect("Failed to seed usage");
    }
}
