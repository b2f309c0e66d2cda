//! Typed configuration for sigroute.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides, optionally seeded from `.env`
//! - Strict parsing (unknown fields are errors)
//! - Layered loading (defaults → file → env)
//!
//! # Configuration File Format
//!
//! ```toml
//! [dispatch]
//! request_timeout_ms = 30000
//! not_found_message = "no route admitted the request"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `SIGROUTE__DISPATCH__REQUEST_TIMEOUT_MS=5000`
//! - `SIGROUTE__LOGGING__LEVEL=sigroute_dispatch=debug`
//! - `SIGROUTE__METRICS__ENABLED=false`

mod config;
mod error;
mod loader;
mod schema;

pub use config::{SigrouteConfig, SigrouteConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, LoggingConfig, MetricsSection};
pub use sigroute_telemetry::LogFormat;
