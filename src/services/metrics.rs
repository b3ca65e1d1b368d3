//! Prometheus metrics for chatdeck-backend.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec, TextEncoder,
};

/// Priced generation request counter by kind and outcome.
pub static GENERATION_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chatdeck_generation_requests_total",
        "Priced generation requests by kind and outcome",
        &["kind", "outcome"] // kind: chat, image; outcome: ok, denied, error
    )
    .expect("Failed to register generation_requests_total")
});

/// Requests denied by the monthly token quota.
pub static QUOTA_DENIALS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chatdeck_quota_denials_total",
        "Requests denied by the monthly token quota"
    )
    .expect("Failed to register quota_denials_total")
});

/// Tokens recorded against user usage ledgers.
pub static TOKENS_RECORDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chatdeck_tokens_recorded_total",
        "Tokens recorded against user usage ledgers"
    )
    .expect("Failed to register tokens_recorded_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&GENERATION_REQUESTS_TOTAL);
    Lazy::force(&QUOTA_DENIALS_TOTAL);
    Lazy::force(&TOKENS_RECORDED_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
