//! Plan tiers, subscription status, and the per-user plan record.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// Sentinel limit meaning "no monthly cap".
pub const UNLIMITED_TOKENS: i64 = -1;

/// Plan tier for a user. New users start on the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Basic => "basic",
            PlanTier::Pro => "pro",
            PlanTier::Enterprise => "enterprise",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "basic" => PlanTier::Basic,
            "pro" => PlanTier::Pro,
            "enterprise" => PlanTier::Enterprise,
            _ => PlanTier::Free,
        }
    }

    /// Static per-tier limits. The table never changes at runtime.
    pub const fn limits(self) -> PlanLimits {
        match self {
            PlanTier::Free => PlanLimits {
                monthly_token_limit: 10_000,
                image_generation_cost: 1_000,
            },
            PlanTier::Basic => PlanLimits {
                monthly_token_limit: 500_000,
                image_generation_cost: 1_000,
            },
            PlanTier::Pro => PlanLimits {
                monthly_token_limit: 3_000_000,
                image_generation_cost: 1_000,
            },
            PlanTier::Enterprise => PlanLimits {
                monthly_token_limit: UNLIMITED_TOKENS,
                image_generation_cost: 1_000,
            },
        }
    }
}

/// Token limits attached to a plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    /// Tokens allowed in a trailing 30-day window. -1 means unlimited.
    pub monthly_token_limit: i64,
    /// Flat token-equivalent charge per generated image.
    pub image_generation_cost: i64,
}

/// Subscription status as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    Canceled,
    PastDue,
    /// Provider statuses this core does not track (incomplete, unpaid, ...).
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn from_provider(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "canceled" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            _ => SubscriptionStatus::Unknown,
        }
    }
}

/// Plan record for one user, keyed by user id.
///
/// Created lazily with plan=free on first access; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPlanRecord {
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub plan: PlanTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl UserPlanRecord {
    /// Free-tier default with no payment linkage.
    pub fn new_free(user_id: &str) -> Self {
        let now = DateTime::now();
        Self {
            user_id: user_id.to_string(),
            plan: PlanTier::Free,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            subscription_status: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_limits_table() {
        assert_eq!(PlanTier::Free.limits().monthly_token_limit, 10_000);
        assert_eq!(PlanTier::Basic.limits().monthly_token_limit, 500_000);
        assert_eq!(PlanTier::Pro.limits().monthly_token_limit, 3_000_000);
        assert_eq!(
            PlanTier::Enterprise.limits().monthly_token_limit,
            UNLIMITED_TOKENS
        );
        assert_eq!(PlanTier::Free.limits().image_generation_cost, 1_000);
        assert_eq!(PlanTier::Enterprise.limits().image_generation_cost, 1_000);
    }

    #[test]
    fn subscription_status_from_provider_strings() {
        assert_eq!(
            SubscriptionStatus::from_provider("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("past_due"),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete"),
            SubscriptionStatus::Unknown
        );
    }

    #[test]
    fn subscription_status_serde_round_trip() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");
        let status: SubscriptionStatus = serde_json::from_str("\"trialing\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Trialing);
        let status: SubscriptionStatus = serde_json::from_str("\"unpaid\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Unknown);
    }
}
