//! Descriptor classification.

use cdevents_transport::{HttpOptions, TransportError, TransportFactory};
use tempfile::tempdir;

fn factory() -> TransportFactory {
    TransportFactory::new(HttpOptions::default())
}

fn resolve_err(target: &str) -> TransportError {
    match factory().resolve(target) {
        Ok(transport) => panic!("{target} resolved to {}", transport.destination()),
        Err(err) => err,
    }
}

#[test]
fn empty_and_console_resolve_to_console() {
    for target in ["", "console", "  console  "] {
        let transport = factory().resolve(target).unwrap();
        assert_eq!(transport.destination(), "console", "{target:?}");
    }
}

#[test]
fn http_and_https_resolve_to_network() {
    for target in ["http://localhost:8080/events", "https://collector.example.com/cdevents"] {
        let transport = factory().resolve(target).unwrap();
        assert_eq!(transport.destination(), target);
    }
}

#[test]
fn file_scheme_keeps_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.json");
    let target = format!("file://{}", path.display());

    let transport = factory().resolve(&target).unwrap();
    assert_eq!(transport.destination(), target);
}

#[test]
fn file_in_missing_directory_fails_at_resolution() {
    let err = resolve_err("file:///no/such/directory/events.json");
    assert!(matches!(err, TransportError::Init { .. }));
}

#[test]
fn broker_schemes_are_not_implemented() {
    for (target, scheme) in [
        ("kafka://broker:9092/topic", "kafka"),
        ("amqp://rabbit/exchange", "amqp"),
        ("nats://nats:4222/subject", "nats"),
    ] {
        match resolve_err(target) {
            TransportError::NotImplemented { scheme: s, target: t } => {
                assert_eq!(s, scheme);
                assert_eq!(t, target);
            }
            other => panic!("{target}: unexpected {other}"),
        }
    }
}

#[test]
fn unknown_schemes_are_unsupported() {
    for target in ["ftp://host/path", "grpc://svc", "nonsense"] {
        let err = resolve_err(target);
        assert!(
            matches!(err, TransportError::UnsupportedTarget(ref t) if t == target),
            "{target}: {err}"
        );
    }
}

#[test]
fn several_targets_build_a_fanout() {
    let transport = factory()
        .resolve_all(&["console", "http://localhost:9000/events"], false)
        .unwrap();
    assert_eq!(transport.destination(), "console, http://localhost:9000/events");
}

#[test]
fn no_targets_means_console() {
    let targets: [&str; 0] = [];
    let transport = factory().resolve_all(&targets, false).unwrap();
    assert_eq!(transport.destination(), "console");
}

#[test]
fn one_bad_target_fails_the_whole_set() {
    let err = factory()
        .resolve_all(&["console", "kafka://broker/topic"], true)
        .err()
        .expect("kafka must not resolve");
    assert!(matches!(err, TransportError::NotImplemented { .. }));
}
