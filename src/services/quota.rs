//! Quota Guard: advisory pre-flight admit/deny against the monthly limit.

use crate::models::{PlanTier, UNLIMITED_TOKENS};
use crate::services::entitlements::EntitlementResolver;
use crate::services::ledger::UsageLedger;
use crate::services::metrics;
use crate::services::providers::ChatMessage;

/// Fixed per-message token overhead added to chat estimates.
const MESSAGE_OVERHEAD_TOKENS: i64 = 3;

/// Outcome of a quota check. Denial is a normal decision, not an error.
#[derive(Debug, Clone)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Clamped to zero for display; -1 means unlimited.
    pub remaining: i64,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct QuotaGuard {
    entitlements: EntitlementResolver,
    ledger: UsageLedger,
}

impl QuotaGuard {
    pub fn new(entitlements: EntitlementResolver, ledger: UsageLedger) -> Self {
        Self {
            entitlements,
            ledger,
        }
    }

    /// Decide whether `estimated_tokens` more tokens fit in the user's
    /// trailing 30-day window.
    ///
    /// The allow/deny comparison uses the unclamped `limit - used`, so a
    /// user already over the limit is denied even while `remaining`
    /// displays 0. Storage faults never propagate past this boundary: a
    /// failed plan read degrades to the free tier's limit and the ledger
    /// read fails open.
    pub async fn can_use_tokens(&self, user_id: &str, estimated_tokens: i64) -> QuotaDecision {
        let limit = match self.entitlements.monthly_limit(user_id).await {
            Ok(limit) => limit,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    "Plan lookup failed, degrading to free-tier limit: {}",
                    e
                );
                PlanTier::Free.limits().monthly_token_limit
            }
        };

        // Unlimited plans skip the usage query entirely.
        if limit == UNLIMITED_TOKENS {
            return QuotaDecision {
                allowed: true,
                remaining: UNLIMITED_TOKENS,
                reason: None,
            };
        }

        let used = self.ledger.sum_last_30_days(user_id).await;
        let remaining = (limit - used).max(0);

        if limit - used >= estimated_tokens {
            QuotaDecision {
                allowed: true,
                remaining,
                reason: None,
            }
        } else {
            metrics::QUOTA_DENIALS_TOTAL.inc();
            QuotaDecision {
                allowed: false,
                remaining,
                reason: Some(format!(
                    "Monthly token limit reached: {} of {} tokens used in the last 30 days",
                    used, limit
                )),
            }
        }
    }
}

/// Approximate token cost of a chat request: ~1 token per 4 characters of
/// message content, scaled by a coarse model-name factor, plus a fixed
/// per-message overhead. This is a pre-flight estimate only; real
/// consumption comes from the provider's usage report.
pub fn estimate_chat_tokens(messages: &[ChatMessage], model: &str) -> i64 {
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    let scaled = (chars as f64 / 4.0) * model_cost_factor(model);
    scaled.round() as i64 + MESSAGE_OVERHEAD_TOKENS * messages.len() as i64
}

fn model_cost_factor(model: &str) -> f64 {
    let model = model.to_ascii_lowercase();
    if model.contains("mini") || model.contains("3.5") {
        0.8
    } else if model.contains("gpt-4") {
        1.2
    } else {
        1.0
    }
}
