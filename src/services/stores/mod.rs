//! Storage seams for plan records and usage counters.
//!
//! Trait-based so the MongoDB backend can be swapped for the in-memory
//! backend in tests, mirroring the provider abstraction.

pub mod memory;
pub mod mongo;

use crate::error::AppError;
use crate::models::{PlanTier, SubscriptionStatus, UserPlanRecord};
use async_trait::async_trait;

pub use memory::{MemoryPlanStore, MemoryUsageStore};
pub use mongo::MongoStores;

/// Partial merge for a plan record. `plan` is always written; optional
/// fields overwrite only when provided.
#[derive(Debug, Clone, Default)]
pub struct PlanUpdate {
    pub plan: PlanTier,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
}

/// Per-user plan records.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Load the record, creating and persisting a free-tier default on
    /// first access. Concurrent first reads must converge on one record.
    async fn get(&self, user_id: &str) -> Result<UserPlanRecord, AppError>;

    /// Merge-write the record. Errors propagate; callers on best-effort
    /// paths decide whether to swallow them.
    async fn update(&self, user_id: &str, update: PlanUpdate) -> Result<(), AppError>;
}

/// Per-user daily usage counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Sum tokens over entries with `date_key >= from_key` (inclusive).
    async fn sum_since(&self, user_id: &str, from_key: &str) -> Result<i64, AppError>;

    /// Atomically add `tokens` to the (user, day) counter, creating it if
    /// absent. Concurrent increments for the same day must commute.
    async fn increment(&self, user_id: &str, date_key: &str, tokens: i64) -> Result<(), AppError>;

    /// Delete entries with `date_key < cutoff_key`. Returns deleted count.
    async fn delete_before(&self, user_id: &str, cutoff_key: &str) -> Result<u64, AppError>;
}
