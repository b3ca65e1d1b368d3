//! Entitlement Resolver: plan record -> effective monthly token limit.

use crate::error::AppError;
use crate::models::{PlanTier, SubscriptionStatus, UserPlanRecord};
use crate::services::stores::PlanStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct EntitlementResolver {
    plans: Arc<dyn PlanStore>,
}

impl EntitlementResolver {
    pub fn new(plans: Arc<dyn PlanStore>) -> Self {
        Self { plans }
    }

    /// Effective monthly token limit for the user (-1 = unlimited).
    ///
    /// Resolved fresh on every call so external status changes take effect
    /// immediately. A linked subscription that is not currently active
    /// forces the free tier's limit regardless of the stored plan.
    pub async fn monthly_limit(&self, user_id: &str) -> Result<i64, AppError> {
        let record = self.plans.get(user_id).await?;
        Ok(effective_tier(&record).limits().monthly_token_limit)
    }

    /// Flat token-equivalent charge for one generated image on the user's
    /// current tier.
    pub async fn image_cost(&self, user_id: &str) -> Result<i64, AppError> {
        let record = self.plans.get(user_id).await?;
        Ok(effective_tier(&record).limits().image_generation_cost)
    }

    pub async fn plan_record(&self, user_id: &str) -> Result<UserPlanRecord, AppError> {
        self.plans.get(user_id).await
    }
}

/// Precedence rule: a previously-elevated plan is not honored once its
/// subscription is no longer active.
pub fn effective_tier(record: &UserPlanRecord) -> PlanTier {
    if record.stripe_subscription_id.is_some()
        && record.subscription_status != Some(SubscriptionStatus::Active)
    {
        return PlanTier::Free;
    }
    record.plan
}
