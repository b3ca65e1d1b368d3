mod common;

use common::{TestApp, TEST_USER_ID};
use serde_json::json;

use chatdeck_backend::models::date_key;

#[tokio::test]
async fn image_generation_requires_identity() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/images/generations", app.address))
        .json(&json!({ "prompt": "a volcano" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn empty_prompt_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .post_as_user("/images/generations")
        .json(&json!({ "prompt": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn image_generation_charges_the_flat_cost() {
    let app = TestApp::spawn().await;

    let response = app
        .post_as_user("/images/generations")
        .json(&json!({ "prompt": "a cross-section of a volcano" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["url"], "https://images.example/out.png");
    assert_eq!(body["tokens_used"], 1_000);
    assert_eq!(body["tokens_remaining"], 9_000);

    let today = date_key(chrono::Utc::now());
    assert_eq!(app.usage.entry(TEST_USER_ID, &today), Some(1_000));
}

#[tokio::test]
async fn image_generation_is_denied_without_headroom() {
    let app = TestApp::spawn().await;
    // 900 tokens of headroom cannot cover the flat 1000-token charge.
    app.seed_usage_today(9_100).await;

    let response = app
        .post_as_user("/images/generations")
        .json(&json!({ "prompt": "a volcano" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 429);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["remaining"], 900);
}
