//! Fan-out delivery to several transports.

use async_trait::async_trait;
use cdevents_domain::Event;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::{MemberFailure, Result, TransportError};
use crate::transport::Transport;

/// Sends each event to every member transport.
///
/// One member's failure never stops the others from being attempted. Failures
/// are collected in member order regardless of whether members ran
/// sequentially or concurrently. Under a `RetryingSender` each member is
/// retried on its own, so members that already succeeded are not resent.
pub struct MultiTransport {
    members: Vec<Box<dyn Transport>>,
    parallel: bool,
}

impl MultiTransport {
    pub fn new(members: Vec<Box<dyn Transport>>) -> Self {
        MultiTransport {
            members,
            parallel: false,
        }
    }

    /// Attempt all members concurrently
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Box<dyn Transport>] {
        &self.members
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Pair per-member outcomes with their members.
    ///
    /// `results` must be in member order. Returns every success value, or a
    /// `Fanout` error listing each failed member.
    pub(crate) fn collect<T>(&self, results: Vec<Result<T>>) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(results.len());
        let mut failures = Vec::new();

        for (member, result) in self.members.iter().zip(results) {
            match result {
                Ok(value) => values.push(value),
                Err(err) => failures.push(MemberFailure {
                    destination: member.destination(),
                    message: member_message(err),
                }),
            }
        }

        if failures.is_empty() {
            debug!(members = self.members.len(), "fan-out delivered");
            return Ok(values);
        }

        warn!(
            failed = failures.len(),
            members = self.members.len(),
            "fan-out partially failed"
        );
        Err(TransportError::Fanout { failures })
    }

    async fn send_sequential(&self, event: &Event) -> Vec<Result<()>> {
        let mut results = Vec::with_capacity(self.members.len());
        for member in &self.members {
            results.push(member.send(event).await);
        }
        results
    }

    async fn send_parallel(&self, event: &Event) -> Vec<Result<()>> {
        join_all(self.members.iter().map(|member| member.send(event))).await
    }
}

/// Failure text without the destination, which `MemberFailure` already carries
fn member_message(err: TransportError) -> String {
    match err {
        TransportError::Delivery { message, .. } => message,
        TransportError::RetryExhausted { attempts, last } => match *last {
            TransportError::Delivery { message, .. } => {
                format!("{message} (after {attempts} attempt(s))")
            }
            other => format!("{other} (after {attempts} attempt(s))"),
        },
        other => other.to_string(),
    }
}

impl std::fmt::Debug for MultiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiTransport")
            .field("destinations", &self.destination())
            .field("parallel", &self.parallel)
            .finish()
    }
}

#[async_trait]
impl Transport for MultiTransport {
    fn destination(&self) -> String {
        self.members
            .iter()
            .map(|m| m.destination())
            .collect::<Vec<_>>()
            .join(", ")
    }

    async fn send(&self, event: &Event) -> Result<()> {
        let results = if self.parallel {
            self.send_parallel(event).await
        } else {
            self.send_sequential(event).await
        };

        self.collect(results).map(|_| ())
    }

    fn as_fanout(&self) -> Option<&MultiTransport> {
        Some(self)
    }
}
