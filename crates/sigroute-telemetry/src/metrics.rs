//! Dispatch metrics.
//!
//! Recorded through the `metrics` facade. No exporter is installed here; the
//! host process installs whichever recorder it uses, and without one every
//! call below is a no-op.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `sigroute_dispatch_total` | Counter | `outcome` | Dispatched requests |
//! | `sigroute_dispatch_duration_seconds` | Histogram | `outcome` | Dispatch latency |
//! | `sigroute_resolutions_total` | Counter | `capability`, `outcome` | Provider calls |
//! | `sigroute_rejections_total` | Counter | `node` | Rejected route nodes |
//! | `sigroute_in_flight_requests` | Gauge | - | Requests being dispatched |

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are recorded.
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Applies the configuration and registers metric descriptions.
pub fn init_metrics(config: &MetricsConfig) {
    ENABLED.store(config.enabled, Ordering::Relaxed);
    if config.enabled {
        register_metric_descriptions();
    }
}

/// Returns true if metrics are being recorded.
#[must_use]
pub fn metrics_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

fn register_metric_descriptions() {
    describe_counter!(
        "sigroute_dispatch_total",
        "Total number of requests dispatched, by outcome"
    );
    describe_histogram!(
        "sigroute_dispatch_duration_seconds",
        "Dispatch duration in seconds"
    );
    describe_counter!(
        "sigroute_resolutions_total",
        "Total capability provider calls, by capability and outcome"
    );
    describe_counter!(
        "sigroute_rejections_total",
        "Total route nodes rejected for a missing required capability"
    );
    describe_gauge!(
        "sigroute_in_flight_requests",
        "Number of requests currently being dispatched"
    );
}

/// Records a finished dispatch.
///
/// `outcome` is one of `handled`, `not_found`, `method_not_allowed`,
/// `resolution_error`, `handler_error`, `timeout` or `cancelled`.
pub fn record_dispatch(outcome: &'static str, duration: Duration) {
    if !metrics_enabled() {
        return;
    }
    counter!("sigroute_dispatch_total", "outcome" => outcome).increment(1);
    histogram!("sigroute_dispatch_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}

/// Records one provider call.
pub fn record_resolution(capability: &str, outcome: &'static str) {
    if !metrics_enabled() {
        return;
    }
    counter!(
        "sigroute_resolutions_total",
        "capability" => capability.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Records a rejected route node.
pub fn record_rejection(node: &str) {
    if !metrics_enabled() {
        return;
    }
    counter!("sigroute_rejections_total", "node" => node.to_string()).increment(1);
}

/// Keeps `sigroute_in_flight_requests` raised while alive.
pub struct InFlightGuard {
    recorded: bool,
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        let recorded = metrics_enabled();
        if recorded {
            gauge!("sigroute_in_flight_requests").increment(1.0);
        }
        Self { recorded }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.recorded {
            gauge!("sigroute_in_flight_requests").decrement(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert!(MetricsConfig::default().enabled);
    }

    #[test]
    fn test_record_functions_dont_panic() {
        // No recorder is installed in tests.
        record_dispatch("handled", Duration::from_millis(3));
        record_resolution("User", "resolved");
        record_rejection("find_user");
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
