//! Error types for rendering and settings.

use cdevents_domain::EventError;
use thiserror::Error;

/// Result type alias for output rendering.
pub type Result<T> = std::result::Result<T, OutputError>;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("unsupported output format: {0} (expected structured, structured-readable or envelope)")]
    UnsupportedFormat(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Event(#[from] EventError),
}

/// Failures loading [`crate::config::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ParseYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Attach the file path to a parse error.
    pub(crate) fn at_path(self, path: &std::path::Path) -> Self {
        let path = path.display().to_string();
        match self {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path, source },
            ConfigError::ParseYaml { source, .. } => ConfigError::ParseYaml { path, source },
            other => other,
        }
    }
}
