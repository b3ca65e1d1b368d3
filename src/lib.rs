pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::payments::{PaymentProvider, StripeClient};
use services::providers::{ChatProvider, ImageProvider, OpenAiClient};
use services::stores::{MongoStores, PlanStore, UsageStore};
use services::{EntitlementResolver, QuotaGuard, SubscriptionReconciler, UsageLedger};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub entitlements: EntitlementResolver,
    pub ledger: UsageLedger,
    pub quota: QuotaGuard,
    pub reconciler: SubscriptionReconciler,
    pub chat: Arc<dyn ChatProvider>,
    pub images: Arc<dyn ImageProvider>,
}

impl AppState {
    /// Wire the service graph over the given stores and providers.
    pub fn new(
        config: Config,
        plans: Arc<dyn PlanStore>,
        usage: Arc<dyn UsageStore>,
        payments: Arc<dyn PaymentProvider>,
        chat: Arc<dyn ChatProvider>,
        images: Arc<dyn ImageProvider>,
    ) -> Self {
        let ledger = UsageLedger::new(usage);
        let entitlements = EntitlementResolver::new(plans.clone());
        let quota = QuotaGuard::new(entitlements.clone(), ledger.clone());
        let reconciler = SubscriptionReconciler::new(
            payments,
            plans,
            entitlements.clone(),
            ledger.clone(),
            config.stripe.product_id.clone(),
        );

        Self {
            config,
            entitlements,
            ledger,
            quota,
            reconciler,
            chat,
            images,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/chat/completions", post(handlers::chat::create_completion))
        .route(
            "/images/generations",
            post(handlers::images::generate_image),
        )
        .route("/billing/status", get(handlers::billing::status))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let stores = MongoStores::new(&db);
        stores.init_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            anyhow::anyhow!(e.to_string())
        })?;

        let stripe = StripeClient::new(config.stripe.clone());
        if stripe.is_configured() {
            tracing::info!("Stripe client initialized");
        } else {
            tracing::warn!("Stripe credentials not configured - subscription sync will be limited");
        }

        let openai = Arc::new(OpenAiClient::new(config.openai.clone()));
        if !openai.is_configured() {
            tracing::warn!("OpenAI API key not configured - generation requests will fail");
        }

        services::metrics::init_metrics();

        let stores = Arc::new(stores);
        let state = AppState::new(
            config.clone(),
            stores.clone(),
            stores,
            Arc::new(stripe),
            openai.clone(),
            openai,
        );

        Ok(Self {
            port: config.server.port,
            router: router(state),
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
