//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all PubHarvest metrics
pub const METRICS_PREFIX: &str = "pubharvest";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_records_upserted_total", METRICS_PREFIX),
        Unit::Count,
        "Total publication records upserted"
    );

    describe_counter!(
        format!("{}_records_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Total unidentifiable records skipped"
    );

    describe_counter!(
        format!("{}_runs_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total per-author ingestion runs that failed"
    );

    describe_counter!(
        format!("{}_eutils_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total upstream E-utilities requests"
    );

    describe_histogram!(
        format!("{}_eutils_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Upstream E-utilities request latency in seconds"
    );

    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total response cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total response cache misses"
    );

    describe_counter!(
        format!("{}_publications_trashed_total", METRICS_PREFIX),
        Unit::Count,
        "Total publications soft-deleted by author removal"
    );

    tracing::info!("Metrics registered");
}

/// Record a response cache lookup
pub fn record_cache(hit: bool) {
    if hit {
        counter!(format!("{}_cache_hits_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_cache_misses_total", METRICS_PREFIX)).increment(1);
    }
}

/// Record an upstream request
pub fn record_eutils(phase: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_eutils_requests_total", METRICS_PREFIX),
        "phase" => phase.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_eutils_request_duration_seconds", METRICS_PREFIX),
        "phase" => phase.to_string()
    )
    .record(duration_secs);
}

/// Record the outcome of one author's ingestion run
pub fn record_run(upserted: usize, skipped: usize) {
    counter!(format!("{}_records_upserted_total", METRICS_PREFIX)).increment(upserted as u64);
    counter!(format!("{}_records_skipped_total", METRICS_PREFIX)).increment(skipped as u64);
}

/// Record a failed per-author run
pub fn record_run_failure() {
    counter!(format!("{}_runs_failed_total", METRICS_PREFIX)).increment(1);
}

/// Record publications trashed during author deletion
pub fn record_trashed(count: usize) {
    counter!(format!("{}_publications_trashed_total", METRICS_PREFIX)).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_do_not_panic() {
        record_cache(true);
        record_cache(false);
        record_eutils("esearch", 0.05, true);
        record_run(3, 1);
        record_run_failure();
        record_trashed(2);
    }
}
