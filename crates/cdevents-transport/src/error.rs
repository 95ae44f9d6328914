//! Error types for event delivery.
//!
//! Resolution failures (`UnsupportedTarget`, `NotImplemented`, `Init`) happen
//! before anything is sent. `Delivery` is a single failed attempt; `Fanout`
//! and `RetryExhausted` aggregate those.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// One member of a fan-out that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFailure {
    /// Destination descriptor of the failing transport
    pub destination: String,
    /// Failure message reported by that transport
    pub message: String,
}

impl fmt::Display for MemberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.destination, self.message)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// Descriptor does not name any known transport.
    #[error("unsupported transport target: {0}")]
    UnsupportedTarget(String),

    /// Descriptor names a known transport that is not available yet.
    #[error("{scheme} transport not implemented yet (target: {target})")]
    NotImplemented { scheme: String, target: String },

    /// Transport could not be constructed.
    #[error("failed to initialise transport for {target}: {message}")]
    Init { target: String, message: String },

    /// A single delivery attempt failed.
    #[error("failed to send event to {destination}: {message}")]
    Delivery {
        destination: String,
        message: String,
    },

    /// One or more fan-out members failed; the rest were still attempted.
    #[error("transport errors: {}", join_failures(.failures))]
    Fanout { failures: Vec<MemberFailure> },

    /// Every attempt failed.
    #[error("failed to send event after {attempts} attempt(s): {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<TransportError>,
    },

    /// The overall delivery deadline passed; in-flight work was dropped.
    #[error("delivery timed out after {after:?}")]
    Timeout { after: Duration },

    /// Delivery was cancelled by the caller.
    #[error("delivery cancelled")]
    Cancelled,
}

impl TransportError {
    pub fn delivery(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            destination: destination.into(),
            message: message.into(),
        }
    }

    pub fn init(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Init {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Whether the retry loop may try again after this error.
    ///
    /// `Fanout` is not: its members are retried one by one instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }
}

fn join_failures(failures: &[MemberFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_message_lists_every_failure() {
        let err = TransportError::Fanout {
            failures: vec![
                MemberFailure {
                    destination: "http://a".to_string(),
                    message: "connection refused".to_string(),
                },
                MemberFailure {
                    destination: "file:///tmp/x".to_string(),
                    message: "permission denied".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "transport errors: http://a: connection refused; file:///tmp/x: permission denied"
        );
    }

    #[test]
    fn retry_exhausted_wraps_last_error() {
        let err = TransportError::RetryExhausted {
            attempts: 4,
            last: Box::new(TransportError::delivery("http://a", "HTTP 503")),
        };
        assert_eq!(
            err.to_string(),
            "failed to send event after 4 attempt(s): failed to send event to http://a: HTTP 503"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn only_delivery_failures_are_retryable() {
        assert!(TransportError::delivery("x", "y").is_retryable());
        assert!(!TransportError::UnsupportedTarget("ftp://x".to_string()).is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
        assert!(!TransportError::Fanout { failures: Vec::new() }.is_retryable());
    }
}
