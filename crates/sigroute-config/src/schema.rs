//! Configuration sections.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sigroute_telemetry::{LogConfig, LogFormat, MetricsConfig};

/// Dispatcher settings.
///
/// # Example
///
/// ```
/// use sigroute_config::DispatchConfig;
///
/// let config = DispatchConfig {
///     request_timeout_ms: 0,
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout(), None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Per-request deadline in milliseconds. `0` disables the deadline.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Message of the default not-found response.
    #[serde(default = "default_not_found_message")]
    pub not_found_message: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            not_found_message: default_not_found_message(),
        }
    }
}

impl DispatchConfig {
    /// Returns the request deadline, or `None` when disabled.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.request_timeout_ms))
        }
    }
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_not_found_message() -> String {
    "no route admitted the request".to_string()
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info", "sigroute_dispatch=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Enable ANSI colors in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include file and line in log events.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts to the telemetry crate's logging configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ansi_enabled: self.ansi_enabled,
            include_location: self.include_location,
            span_events: self.format == LogFormat::Pretty,
            include_target: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Record dispatch metrics.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetricsSection {
    /// Converts to the telemetry crate's metrics configuration.
    #[must_use]
    pub fn to_metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.enabled,
        }
    }
}

fn default_true() -> bool {
    true
}
