//! Error types for event construction

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("unsupported {domain} event type: {phase}")]
    UnsupportedPhase { domain: String, phase: String },

    #[error("unknown event domain: {0}")]
    UnknownDomain(String),

    #[error("failed to parse custom data: {0}")]
    CustomDataParse(String),

    #[error("invalid key=value format: {0}")]
    InvalidKeyValue(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event construction
pub type Result<T> = std::result::Result<T, EventError>;
