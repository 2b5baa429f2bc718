//! Reduction observability metrics
//!
//! Prometheus-compatible metrics for coordinator-side reductions, labeled by
//! result kind (`suggestions` / `aggregation`). Recorded by the coordinator
//! only; the merge and transform kernels stay metrics-free.

use std::time::Duration;

/// Record reduction duration
pub fn record_reduce_duration(kind: &str, duration: Duration) {
    metrics::histogram!(
        "opal_reduce_duration_seconds",
        "kind" => kind.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a completed reduction
pub fn record_reduce_success(kind: &str) {
    metrics::counter!(
        "opal_reduce_total",
        "kind" => kind.to_string(),
        "status" => "ok",
    )
    .increment(1);
}

/// Record a failed reduction
pub fn record_reduce_error(kind: &str, error_type: &str) {
    metrics::counter!(
        "opal_reduce_total",
        "kind" => kind.to_string(),
        "status" => "error",
    )
    .increment(1);

    metrics::counter!(
        "opal_reduce_errors_total",
        "kind" => kind.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}
