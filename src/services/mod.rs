pub mod entitlements;
pub mod ledger;
pub mod metrics;
pub mod payments;
pub mod providers;
pub mod quota;
pub mod reconcile;
pub mod stores;

pub use entitlements::EntitlementResolver;
pub use ledger::UsageLedger;
pub use quota::{estimate_chat_tokens, QuotaDecision, QuotaGuard};
pub use reconcile::{BillingStatus, SubscriptionReconciler};
