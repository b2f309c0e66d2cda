//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded or accepted.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file does not exist.
    #[error("configuration file {} does not exist", path.display())]
    Missing {
        /// The requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read configuration file {}", path.display())]
    Unreadable {
        /// The requested path.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The content is neither TOML nor JSON.
    #[error("unsupported configuration format '{format}'")]
    UnsupportedFormat {
        /// The format name or file extension.
        format: String,
    },

    /// Malformed TOML, or TOML with unknown keys.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or JSON with unknown keys.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file could not be loaded.
    #[error("cannot load dotenv file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// A loaded value failed validation.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted field path, e.g. `logging.level`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override could not be applied.
    #[error("environment override {var}: {reason}")]
    EnvOverride {
        /// The variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
