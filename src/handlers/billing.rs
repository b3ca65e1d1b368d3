//! Subscription status endpoint.

use axum::{extract::State, Json};

use crate::{
    error::AppError,
    middleware::{UserEmail, UserId},
    services::BillingStatus,
    AppState,
};

/// Reconcile the user's plan with the payment provider and return the
/// full quota/subscription report.
pub async fn status(
    State(state): State<AppState>,
    user: UserId,
    email: UserEmail,
) -> Result<Json<BillingStatus>, AppError> {
    tracing::info!(user_id = %user.0, "Checking subscription status");

    let status = state
        .reconciler
        .sync_from_provider(&user.0, email.0.as_deref())
        .await?;

    Ok(Json(status))
}
