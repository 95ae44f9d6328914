//! Bounded-retry delivery.
//!
//! A send makes up to `max_retries + 1` attempts and stops at the first
//! success. The optional timeout bounds the whole sequence; an attempt still
//! in flight when it fires is dropped. A cancellation token aborts between or
//! during attempts.
//!
//! A fan-out is never retried as a whole. Each member gets its own attempt
//! budget and a member that delivered is not sent the event again.

use std::time::Duration;

use cdevents_domain::Event;
use futures::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Result, TransportError};
use crate::multi::MultiTransport;
use crate::transport::Transport;

/// Upper bound for a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry and deadline settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 means exactly one attempt
    pub max_retries: u32,

    /// Deadline for the entire sequence
    pub timeout: Option<Duration>,

    /// Base delay between attempts, doubled each retry; zero retries immediately
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            timeout: Some(Duration::from_secs(30)),
            backoff: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-indexed)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if self.backoff.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry.min(16));
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Wraps a transport with the retry policy
#[derive(Debug, Clone, Default)]
pub struct RetryingSender {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl RetryingSender {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryingSender {
            policy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver `event`, returning the number of attempts it took.
    pub async fn send_with_retry(&self, transport: &dyn Transport, event: &Event) -> Result<u32> {
        let attempts = self.attempt_all(transport, event);

        let bounded = async {
            match self.policy.timeout {
                Some(after) => tokio::time::timeout(after, attempts)
                    .await
                    .unwrap_or_else(|_| Err(TransportError::Timeout { after })),
                None => attempts.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!(event_id = %event.id(), "delivery cancelled");
                Err(TransportError::Cancelled)
            }
            result = bounded => result,
        }
    }

    async fn attempt_all(&self, transport: &dyn Transport, event: &Event) -> Result<u32> {
        match transport.as_fanout() {
            Some(fanout) => self.attempt_members(fanout, event).await,
            None => self.attempt_one(transport, event).await,
        }
    }

    /// Retry each fan-out member independently; reports the most attempts any
    /// member needed.
    async fn attempt_members(&self, fanout: &MultiTransport, event: &Event) -> Result<u32> {
        let members = fanout.members();
        let results = if fanout.is_parallel() {
            join_all(members.iter().map(|m| self.attempt_one(m.as_ref(), event))).await
        } else {
            let mut results = Vec::with_capacity(members.len());
            for member in members {
                results.push(self.attempt_one(member.as_ref(), event).await);
            }
            results
        };

        let attempts = fanout.collect(results)?;
        Ok(attempts.into_iter().max().unwrap_or(1))
    }

    async fn attempt_one(&self, transport: &dyn Transport, event: &Event) -> Result<u32> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match transport.send(event).await {
                Ok(()) => {
                    info!(
                        event_id = %event.id(),
                        destination = %transport.destination(),
                        attempt,
                        "event delivered"
                    );
                    return Ok(attempt);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.delay_for_retry(attempt - 1);
                    warn!(
                        event_id = %event.id(),
                        attempt,
                        max_attempts,
                        ?delay,
                        error = %err,
                        "delivery attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
                Err(err) if err.is_retryable() => {
                    warn!(event_id = %event.id(), attempts = attempt, error = %err, "retries exhausted");
                    return Err(TransportError::RetryExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_backoff_is_immediate() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(0), Duration::ZERO);
        assert_eq!(policy.delay_for_retry(5), Duration::ZERO);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10).with_backoff(Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for_retry(20), MAX_BACKOFF);
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(3).max_attempts(), 4);
        assert_eq!(RetryPolicy::new(u32::MAX).max_attempts(), u32::MAX);
    }
}
