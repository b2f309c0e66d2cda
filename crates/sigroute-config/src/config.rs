//! Top-level configuration.

use serde::{Deserialize, Serialize};
use sigroute_telemetry::LogFormat;

use crate::{ConfigError, DispatchConfig, LoggingConfig, MetricsSection};

/// Complete sigroute configuration.
///
/// # Example
///
/// ```
/// use sigroute_config::SigrouteConfig;
///
/// let config = SigrouteConfig::default();
/// assert_eq!(config.dispatch.request_timeout_ms, 30_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SigrouteConfig {
    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl SigrouteConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SigrouteConfigBuilder {
        SigrouteConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - The log level is not a valid filter directive
    /// - The not-found message is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = sigroute_telemetry::logging::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid("logging.level", e.to_string()));
        }

        if self.dispatch.not_found_message.trim().is_empty() {
            return Err(ConfigError::invalid(
                "dispatch.not_found_message",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config
    }
}

/// Builder for [`SigrouteConfig`].
#[derive(Debug, Default)]
pub struct SigrouteConfigBuilder {
    config: SigrouteConfig,
}

impl SigrouteConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatcher section.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.config.dispatch = dispatch;
        self
    }

    /// Set the request deadline in milliseconds.
    #[must_use]
    pub fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.dispatch.request_timeout_ms = timeout_ms;
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Set the metrics section.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsSection) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Build without validation.
    #[must_use]
    pub fn build(self) -> SigrouteConfig {
        self.config
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<SigrouteConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
