// src/metrics.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration so series carry descriptions when the
/// embedding application installs a recorder. Without a recorder all
/// macros are no-ops.
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregate_items_total", "Raw items returned by providers.");
        describe_counter!(
            "aggregate_invalid_total",
            "Items dropped by provider validation."
        );
        describe_counter!("aggregate_dedup_total", "Items removed as duplicates.");
        describe_counter!("aggregate_blocked_total", "Items removed by the blocklist.");
        describe_counter!(
            "aggregate_kept_total",
            "Items returned after dedup, blocklist and truncation."
        );
        describe_counter!(
            "aggregate_provider_errors_total",
            "Provider search failures."
        );
        describe_gauge!(
            "aggregate_last_run_ts",
            "Unix ts of the last aggregation round."
        );
        describe_counter!("evaluate_chunks_total", "Chunks submitted for scoring.");
        describe_counter!(
            "evaluate_fallback_total",
            "Fallbacks to a lower-priority backend."
        );
        describe_counter!(
            "evaluate_backend_errors_total",
            "Scoring backend call failures."
        );
        describe_counter!(
            "evaluate_parse_failures_total",
            "Items without a usable score in the response."
        );
        describe_histogram!(
            "evaluate_backend_ms",
            "Scoring backend call time in milliseconds."
        );
        describe_counter!("track_records_total", "Records added to the tracker.");
        describe_counter!("track_transitions_total", "Accepted status transitions.");
    });
}
