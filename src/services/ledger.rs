//! Usage Ledger: per-user daily token counters over a trailing 30-day window.
//!
//! Accounting here is best-effort and fail-open: a storage outage must never
//! block the user-visible response path. Reads degrade to "no usage
//! recorded"; write failures are logged and dropped.

use crate::models::{cutoff_date_key, date_key};
use crate::services::metrics;
use crate::services::stores::UsageStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Token total over the trailing 30 days (inclusive lower bound).
    ///
    /// Fails soft: a storage error reports zero usage, which makes the
    /// quota check more permissive, never less.
    pub async fn sum_last_30_days(&self, user_id: &str) -> i64 {
        let from_key = cutoff_date_key(Utc::now());
        match self.store.sum_since(user_id, &from_key).await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Usage sum failed, reporting 0: {}", e);
                0
            }
        }
    }

    /// Record consumed tokens against today's counter.
    pub async fn record(&self, user_id: &str, tokens: i64) {
        self.record_at(user_id, tokens, Utc::now()).await;
    }

    /// Record consumed tokens against the counter for `at`'s UTC day,
    /// then opportunistically prune entries that fell out of the window.
    pub async fn record_at(&self, user_id: &str, tokens: i64, at: DateTime<Utc>) {
        let key = date_key(at);

        if let Err(e) = self.store.increment(user_id, &key, tokens).await {
            tracing::warn!(
                user_id = %user_id,
                tokens = tokens,
                "Failed to record usage: {}",
                e
            );
            return;
        }

        metrics::TOKENS_RECORDED_TOTAL.inc_by(tokens as u64);
        self.prune_older_than_30_days(user_id).await;
    }

    /// Delete every entry strictly older than the trailing window.
    /// Best-effort; failures are logged and retried on the next write.
    pub async fn prune_older_than_30_days(&self, user_id: &str) {
        let cutoff = cutoff_date_key(Utc::now());
        match self.store.delete_before(user_id, &cutoff).await {
            Ok(deleted) if deleted > 0 => {
                tracing::debug!(user_id = %user_id, deleted = deleted, "Pruned stale usage entries");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Usage prune failed: {}", e);
            }
        }
    }
}
