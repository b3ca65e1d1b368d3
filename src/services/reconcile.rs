//! Subscription Reconciler: syncs the local plan record with the payment
//! provider's view of the user's subscription.
//!
//! Reconciliation is best-effort background sync. Provider-communication
//! failures and plan-write failures on this path are logged and swallowed;
//! the caller always gets a status report built from whatever the local
//! store holds afterwards.

use crate::error::AppError;
use crate::models::{PlanTier, SubscriptionStatus, UNLIMITED_TOKENS};
use crate::services::entitlements::{effective_tier, EntitlementResolver};
use crate::services::ledger::UsageLedger;
use crate::services::payments::{PaymentProvider, ProviderPrice};
use crate::services::stores::{PlanStore, PlanUpdate};
use serde::Serialize;
use std::sync::Arc;

/// Full quota/subscription report for one user.
#[derive(Debug, Clone, Serialize)]
pub struct BillingStatus {
    pub plan: PlanTier,
    /// Effective limit after the precedence rule; -1 = unlimited.
    pub monthly_token_limit: i64,
    pub tokens_used: i64,
    pub tokens_remaining: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
}

#[derive(Clone)]
pub struct SubscriptionReconciler {
    payments: Arc<dyn PaymentProvider>,
    plans: Arc<dyn PlanStore>,
    entitlements: EntitlementResolver,
    ledger: UsageLedger,
    product_id: String,
}

impl SubscriptionReconciler {
    pub fn new(
        payments: Arc<dyn PaymentProvider>,
        plans: Arc<dyn PlanStore>,
        entitlements: EntitlementResolver,
        ledger: UsageLedger,
        product_id: String,
    ) -> Self {
        Self {
            payments,
            plans,
            entitlements,
            ledger,
            product_id,
        }
    }

    /// Reconcile the user's plan with the provider and report the result.
    ///
    /// Any provider failure degrades to "use whatever we last knew": the
    /// report is built from the local record either way.
    pub async fn sync_from_provider(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<BillingStatus, AppError> {
        let record = self.plans.get(user_id).await?;

        let customer_id = match record.stripe_customer_id.clone() {
            Some(id) => Some(id),
            None => self.create_customer(user_id, email, &record).await,
        };

        if let Some(customer_id) = customer_id {
            self.sync_subscription(user_id, &customer_id).await;
        }

        self.report(user_id).await
    }

    /// Create a provider customer for the user and persist the id
    /// immediately, carrying forward any already-known linkage.
    async fn create_customer(
        &self,
        user_id: &str,
        email: Option<&str>,
        record: &crate::models::UserPlanRecord,
    ) -> Option<String> {
        let email = email?;

        match self.payments.create_customer(email, user_id).await {
            Ok(customer_id) => {
                let update = PlanUpdate {
                    plan: record.plan,
                    stripe_customer_id: Some(customer_id.clone()),
                    stripe_subscription_id: record.stripe_subscription_id.clone(),
                    subscription_status: record.subscription_status,
                };
                if let Err(e) = self.plans.update(user_id, update).await {
                    tracing::warn!(user_id = %user_id, "Failed to persist customer id: {}", e);
                }
                Some(customer_id)
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    "Customer creation failed, using locally-stored plan: {}",
                    e
                );
                None
            }
        }
    }

    /// Pull the customer's subscriptions and write back the inferred tier.
    async fn sync_subscription(&self, user_id: &str, customer_id: &str) {
        let subscriptions = match self.payments.list_subscriptions(customer_id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    "Subscription listing failed, using locally-stored plan: {}",
                    e
                );
                return;
            }
        };

        // The provider returns at most one relevant subscription per
        // customer for this product; first match wins.
        let Some(subscription) = subscriptions
            .iter()
            .find(|s| s.status == "active" || s.status == "trialing")
        else {
            tracing::debug!(user_id = %user_id, "No active or trialing subscription");
            return;
        };

        let Some(item) = subscription
            .items
            .data
            .iter()
            .find(|item| item.price.product == self.product_id)
        else {
            tracing::debug!(
                user_id = %user_id,
                subscription_id = %subscription.id,
                "Subscription has no line item for this product"
            );
            return;
        };

        let tier = infer_plan_tier(&item.price);
        let status = SubscriptionStatus::from_provider(&subscription.status);

        tracing::info!(
            user_id = %user_id,
            subscription_id = %subscription.id,
            plan = %tier.as_str(),
            status = ?status,
            "Reconciled plan from subscription"
        );

        let update = PlanUpdate {
            plan: tier,
            stripe_customer_id: Some(customer_id.to_string()),
            stripe_subscription_id: Some(subscription.id.clone()),
            subscription_status: Some(status),
        };
        if let Err(e) = self.plans.update(user_id, update).await {
            tracing::warn!(user_id = %user_id, "Failed to persist reconciled plan: {}", e);
        }
    }

    /// Status report from the local record, limit re-resolved through the
    /// entitlement rules.
    async fn report(&self, user_id: &str) -> Result<BillingStatus, AppError> {
        let record = self.entitlements.plan_record(user_id).await?;
        let limit = effective_tier(&record).limits().monthly_token_limit;
        let used = self.ledger.sum_last_30_days(user_id).await;
        let remaining = if limit == UNLIMITED_TOKENS {
            UNLIMITED_TOKENS
        } else {
            (limit - used).max(0)
        };

        Ok(BillingStatus {
            plan: record.plan,
            monthly_token_limit: limit,
            tokens_used: used,
            tokens_remaining: remaining,
            subscription_status: record.subscription_status,
            stripe_customer_id: record.stripe_customer_id,
            stripe_subscription_id: record.stripe_subscription_id,
        })
    }
}

/// Infer a plan tier from price metadata.
///
/// Three heuristics run in a fixed sequence and each one, if it fires,
/// overwrites the tier chosen so far: amount thresholds, then price-id
/// substrings, then nickname substrings. The last to fire wins.
pub fn infer_plan_tier(price: &ProviderPrice) -> PlanTier {
    let mut tier = PlanTier::Free;

    if let Some(unit_amount) = price.unit_amount {
        let major_units = unit_amount / 100;
        if major_units >= 299 {
            tier = PlanTier::Enterprise;
        } else if major_units >= 90 {
            tier = PlanTier::Pro;
        } else if major_units >= 25 {
            tier = PlanTier::Basic;
        }
    }

    let price_id = price.id.to_lowercase();
    if price_id.contains("enterprise") {
        tier = PlanTier::Enterprise;
    } else if price_id.contains("pro") || price_id.contains("100") {
        tier = PlanTier::Pro;
    } else if price_id.contains("basic") || price_id.contains("29") || price_id.contains("39") {
        tier = PlanTier::Basic;
    }

    if let Some(nickname) = &price.nickname {
        let nickname = nickname.to_lowercase();
        if nickname.contains("enterprise") {
            tier = PlanTier::Enterprise;
        } else if nickname.contains("pro") {
            tier = PlanTier::Pro;
        } else if nickname.contains("basic") {
            tier = PlanTier::Basic;
        }
    }

    tier
}
