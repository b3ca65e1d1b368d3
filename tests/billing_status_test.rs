mod common;

use common::{TestApp, TEST_PRODUCT_ID};
use serde_json::json;

use chatdeck_backend::services::payments::{
    MockPaymentProvider, ProviderPrice, ProviderSubscription, SubscriptionItem, SubscriptionItems,
};
use chatdeck_backend::services::providers::MockChatProvider;

fn pro_subscription() -> ProviderSubscription {
    ProviderSubscription {
        id: "sub_live_1".to_string(),
        status: "active".to_string(),
        items: SubscriptionItems {
            data: vec![SubscriptionItem {
                price: ProviderPrice {
                    id: "tier_pro_monthly".to_string(),
                    unit_amount: Some(9_900),
                    nickname: Some("Pro Monthly".to_string()),
                    product: TEST_PRODUCT_ID.to_string(),
                },
            }],
        },
    }
}

#[tokio::test]
async fn status_requires_identity() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/billing/status", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn fresh_user_reports_the_free_tier() {
    let app = TestApp::spawn().await;

    let response = app.get_as_user("/billing/status").send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["plan"], "free");
    assert_eq!(body["monthly_token_limit"], 10_000);
    assert_eq!(body["tokens_used"], 0);
    assert_eq!(body["tokens_remaining"], 10_000);
}

#[tokio::test]
async fn status_reconciles_an_active_subscription() {
    let payments = MockPaymentProvider::with_subscriptions(vec![pro_subscription()]);
    let app = TestApp::spawn_with(MockChatProvider::new("ok", 1), payments).await;

    let response = app
        .get_as_user("/billing/status")
        .header("X-User-Email", "user@example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["monthly_token_limit"], 3_000_000);
    assert_eq!(body["subscription_status"], "active");
    assert_eq!(body["stripe_subscription_id"], "sub_live_1");
    assert_eq!(body["stripe_customer_id"], "cus_mock_1");
}

#[tokio::test]
async fn status_reflects_recorded_usage() {
    let app = TestApp::spawn().await;
    app.seed_usage_today(1_234).await;

    let response = app.get_as_user("/billing/status").send().await.unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["tokens_used"], 1_234);
    assert_eq!(body["tokens_remaining"], 8_766);
}

#[tokio::test]
async fn provider_outage_still_reports_local_state() {
    let app =
        TestApp::spawn_with(MockChatProvider::new("ok", 1), MockPaymentProvider::failing()).await;

    let response = app
        .get_as_user("/billing/status")
        .header("X-User-Email", "user@example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["plan"], "free");
    assert_eq!(body["monthly_token_limit"], 10_000);
}

#[tokio::test]
async fn chat_after_reconciliation_uses_the_elevated_limit() {
    let payments = MockPaymentProvider::with_subscriptions(vec![pro_subscription()]);
    let app = TestApp::spawn_with(MockChatProvider::new("ok", 10), payments).await;

    // Over the free limit, but well under pro's.
    app.seed_usage_today(50_000).await;

    app.get_as_user("/billing/status")
        .header("X-User-Email", "user@example.com")
        .send()
        .await
        .unwrap();

    let response = app
        .post_as_user("/chat/completions")
        .json(&json!({ "messages": [{"role": "user", "content": "hi"}] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}
