//! CDEvents CLI Core Library
//!
//! Ties the domain model and delivery layer together for the binary:
//! - output: rendering events as structured JSON, YAML or CloudEvents
//! - config: the single settings value resolved at startup
//! - telemetry: tracing subscriber setup
//!
//! The lower crates are re-exported so callers depend on this one only.

pub mod config;
pub mod error;
pub mod output;
pub mod telemetry;

pub use config::{
    default_source, local_hostname, parse_duration, parse_header, split_targets, ConfigFormat,
    Settings,
};
pub use error::{ConfigError, OutputError, Result};
pub use output::{format_event, format_many, OutputFormat, OutputFormatter};
pub use telemetry::{init_tracing, level_for_verbosity, log_filter};

pub use cdevents_domain as domain;
pub use cdevents_transport as transport;

pub use cdevents_domain::{
    CloudEvent, CustomData, Domain, Event, EventError, EventFactory, EventParams, EventType,
    GeneratedEvent,
};
pub use cdevents_transport::{
    CancellationToken, HttpOptions, RetryPolicy, RetryingSender, Transport, TransportError,
    TransportFactory,
};
