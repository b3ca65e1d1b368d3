//! Daily token-usage counters.
//!
//! One document per (user, UTC calendar day). Counters only accumulate;
//! entries older than the trailing window are pruned opportunistically.

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

/// Trailing window over which usage counts against the monthly limit.
pub const USAGE_WINDOW_DAYS: i64 = 30;

/// Accumulated token usage for one user on one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyUsage {
    pub user_id: String,
    /// UTC day in `YYYY-MM-DD` form. Lexicographic order matches
    /// chronological order, so range filters compare strings directly.
    pub date_key: String,
    pub tokens: i64,
    pub updated_at: BsonDateTime,
}

/// UTC calendar-day key for a timestamp.
pub fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// First day still inside the trailing window. Entries with a key below
/// this are prunable; entries at or above it count toward usage.
pub fn cutoff_date_key(now: DateTime<Utc>) -> String {
    date_key(now - Duration::days(USAGE_WINDOW_DAYS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_key_is_utc_calendar_day() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 23, 59, 59).unwrap();
        assert_eq!(date_key(at), "2026-03-05");
    }

    #[test]
    fn cutoff_is_thirty_days_back() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(cutoff_date_key(now), "2026-03-01");
    }

    #[test]
    fn date_keys_order_lexicographically() {
        assert!(date_key(Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap())
            < date_key(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
    }
}
