//! Chat completion proxy, gated by the token quota.

use axum::{extract::State, Json};

use crate::{
    dtos::{ChatCompletionRequest, ChatCompletionResponse},
    error::AppError,
    middleware::UserId,
    services::{estimate_chat_tokens, metrics},
    AppState,
};

/// Proxy a chat completion through the provider if the user's quota
/// admits the estimated cost. Actual consumption is recorded from the
/// provider's usage report, best-effort, after the call succeeds.
pub async fn create_completion(
    State(state): State<AppState>,
    user: UserId,
    Json(payload): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>, AppError> {
    if payload.messages.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "messages must not be empty"
        )));
    }

    let model = payload
        .model
        .unwrap_or_else(|| state.config.openai.default_chat_model.clone());
    let estimated = estimate_chat_tokens(&payload.messages, &model);

    let decision = state.quota.can_use_tokens(&user.0, estimated).await;
    if !decision.allowed {
        metrics::GENERATION_REQUESTS_TOTAL
            .with_label_values(&["chat", "denied"])
            .inc();
        return Err(AppError::QuotaExceeded {
            remaining: decision.remaining,
            reason: decision
                .reason
                .unwrap_or_else(|| "Monthly token limit reached".to_string()),
        });
    }

    tracing::info!(
        user_id = %user.0,
        model = %model,
        message_count = payload.messages.len(),
        estimated_tokens = estimated,
        "Proxying chat completion"
    );

    let completion = state
        .chat
        .complete(&model, &payload.messages)
        .await
        .map_err(|e| {
            metrics::GENERATION_REQUESTS_TOTAL
                .with_label_values(&["chat", "error"])
                .inc();
            AppError::from(e)
        })?;

    state.ledger.record(&user.0, completion.total_tokens).await;
    metrics::GENERATION_REQUESTS_TOTAL
        .with_label_values(&["chat", "ok"])
        .inc();

    let tokens_remaining = if decision.remaining < 0 {
        decision.remaining
    } else {
        (decision.remaining - completion.total_tokens).max(0)
    };

    Ok(Json(ChatCompletionResponse {
        content: completion.content,
        tokens_used: completion.total_tokens,
        tokens_remaining,
    }))
}
