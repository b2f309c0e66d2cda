//! Logging and metrics for sigroute.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output and an env filter
//! - **Metrics**: dispatch, resolution and rejection counters via the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use sigroute_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! init_telemetry(&LogConfig::production(), &MetricsConfig::default())?;
//! ```

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use self::metrics::{
    init_metrics, record_dispatch, record_rejection, record_resolution, InFlightGuard, MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if the subscriber cannot be installed.
pub fn init_telemetry(logging: &LogConfig, metrics: &MetricsConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    init_metrics(metrics);
    Ok(())
}
