pub mod plan;
pub mod usage;

pub use plan::{PlanLimits, PlanTier, SubscriptionStatus, UserPlanRecord, UNLIMITED_TOKENS};
pub use usage::{cutoff_date_key, date_key, DailyUsage};
