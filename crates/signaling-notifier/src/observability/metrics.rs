//! Delivery metrics.
//!
//! All metrics follow Prometheus naming conventions:
//! - `signaling_notifier_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `event`: 5 values (invite, disinvite, update, delete, incall)
//! - `status`: 3 values (success, error, timeout)
//!
//! Backend URLs and room tokens are never used as labels.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record one callback delivery attempt.
///
/// Metric: `signaling_notifier_requests_total`,
/// `signaling_notifier_request_duration_seconds`
/// Labels: `event`, `status`
pub fn record_delivery(event: &'static str, status: &'static str, duration: Duration) {
    histogram!("signaling_notifier_request_duration_seconds",
        "event" => event,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("signaling_notifier_requests_total",
        "event" => event,
        "status" => status
    )
    .increment(1);
}

/// Categorize an HTTP status code into success/error/timeout. Gateway and
/// request timeouts (408, 504) count as timeouts.
pub fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}
