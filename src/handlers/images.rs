//! Image generation proxy with a flat per-image token charge.

use axum::{extract::State, Json};

use crate::{
    dtos::{ImageGenerationRequest, ImageGenerationResponse},
    error::AppError,
    middleware::UserId,
    models::PlanTier,
    services::metrics,
    AppState,
};

pub async fn generate_image(
    State(state): State<AppState>,
    user: UserId,
    Json(payload): Json<ImageGenerationRequest>,
) -> Result<Json<ImageGenerationResponse>, AppError> {
    if payload.prompt.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "prompt must not be empty"
        )));
    }

    let cost = match state.entitlements.image_cost(&user.0).await {
        Ok(cost) => cost,
        Err(e) => {
            tracing::warn!(user_id = %user.0, "Plan lookup failed, using free-tier image cost: {}", e);
            PlanTier::Free.limits().image_generation_cost
        }
    };

    let decision = state.quota.can_use_tokens(&user.0, cost).await;
    if !decision.allowed {
        metrics::GENERATION_REQUESTS_TOTAL
            .with_label_values(&["image", "denied"])
            .inc();
        return Err(AppError::QuotaExceeded {
            remaining: decision.remaining,
            reason: decision
                .reason
                .unwrap_or_else(|| "Monthly token limit reached".to_string()),
        });
    }

    tracing::info!(user_id = %user.0, cost = cost, "Proxying image generation");

    let image = state.images.generate(&payload.prompt).await.map_err(|e| {
        metrics::GENERATION_REQUESTS_TOTAL
            .with_label_values(&["image", "error"])
            .inc();
        AppError::from(e)
    })?;

    // The flat charge is the actual consumption for images.
    state.ledger.record(&user.0, cost).await;
    metrics::GENERATION_REQUESTS_TOTAL
        .with_label_values(&["image", "ok"])
        .inc();

    let tokens_remaining = if decision.remaining < 0 {
        decision.remaining
    } else {
        (decision.remaining - cost).max(0)
    };

    Ok(Json(ImageGenerationResponse {
        url: image.url,
        tokens_used: cost,
        tokens_remaining,
    }))
}
