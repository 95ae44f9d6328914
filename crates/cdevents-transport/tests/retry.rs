//! Retry loop behaviour against scripted transports.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdevents_domain::{Domain, Event, EventFactory, EventParams};
use cdevents_transport::{
    CancellationToken, Result, RetryPolicy, RetryingSender, Transport, TransportError,
};

/// Fails the first `failures` sends, then succeeds.
struct FlakyTransport {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyTransport {
    fn new(failures: u32) -> Self {
        FlakyTransport {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    fn destination(&self) -> String {
        "flaky".to_string()
    }

    async fn send(&self, _event: &Event) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(TransportError::delivery("flaky", format!("failure {}", n + 1)))
        } else {
            Ok(())
        }
    }
}

/// Never finishes a send within any reasonable deadline.
struct SlowTransport {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Transport for SlowTransport {
    fn destination(&self) -> String {
        "slow".to_string()
    }

    async fn send(&self, _event: &Event) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

fn event() -> Event {
    EventFactory::new("retry-test")
        .construct(Domain::PipelineRun, "started", EventParams::new("p-1", "pipeline"))
        .unwrap()
        .event
}

fn sender(max_retries: u32) -> RetryingSender {
    RetryingSender::new(RetryPolicy::new(max_retries).with_timeout(None))
}

#[tokio::test]
async fn succeeds_iff_enough_retries_and_counts_calls() {
    for failures in 0..5u32 {
        for max_retries in 0..5u32 {
            let transport = FlakyTransport::new(failures);
            let result = sender(max_retries).send_with_retry(&transport, &event()).await;

            if max_retries >= failures {
                assert_eq!(result.unwrap(), failures + 1);
                assert_eq!(transport.calls(), failures.min(max_retries) + 1);
            } else {
                assert!(result.is_err(), "N={failures} max={max_retries}");
                assert_eq!(transport.calls(), max_retries + 1);
            }
        }
    }
}

#[tokio::test]
async fn exhaustion_wraps_last_error_and_attempt_count() {
    let transport = FlakyTransport::new(10);
    let err = sender(2).send_with_retry(&transport, &event()).await.unwrap_err();

    match err {
        TransportError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.to_string(), "failed to send event to flaky: failure 3");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn zero_retries_means_exactly_one_attempt() {
    let transport = FlakyTransport::new(1);
    let err = sender(0).send_with_retry(&transport, &event()).await.unwrap_err();

    assert!(matches!(err, TransportError::RetryExhausted { attempts: 1, .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_bounds_the_whole_sequence() {
    let calls = Arc::new(AtomicU32::new(0));
    let transport = SlowTransport {
        calls: calls.clone(),
    };
    let sender = RetryingSender::new(RetryPolicy::new(3).with_timeout(Some(Duration::from_secs(1))));

    let err = sender.send_with_retry(&transport, &event()).await.unwrap_err();

    assert!(matches!(err, TransportError::Timeout { after } if after == Duration::from_secs(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_sleeps_count_against_the_deadline() {
    let transport = FlakyTransport::new(10);
    let sender = RetryingSender::new(
        RetryPolicy::new(10)
            .with_backoff(Duration::from_secs(1))
            .with_timeout(Some(Duration::from_secs(5))),
    );

    let err = sender.send_with_retry(&transport, &event()).await.unwrap_err();

    // delays of 1s, 2s, then 4s crosses the 5s deadline
    assert!(matches!(err, TransportError::Timeout { .. }));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn cancelled_token_stops_before_sending() {
    let token = CancellationToken::new();
    token.cancel();
    let transport = FlakyTransport::new(0);

    let err = sender(3)
        .with_cancellation(token)
        .send_with_retry(&transport, &event())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Cancelled));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_an_attempt_in_flight() {
    let token = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));
    let transport = SlowTransport {
        calls: calls.clone(),
    };

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = sender(3)
        .with_cancellation(token)
        .send_with_retry(&transport, &event())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_retryable_errors_are_returned_as_is() {
    struct Misconfigured;

    #[async_trait]
    impl Transport for Misconfigured {
        fn destination(&self) -> String {
            "misconfigured".to_string()
        }

        async fn send(&self, _event: &Event) -> Result<()> {
            Err(TransportError::init("misconfigured", "no client"))
        }
    }

    let err = sender(3).send_with_retry(&Misconfigured, &event()).await.unwrap_err();
    assert!(matches!(err, TransportError::Init { .. }));
}
