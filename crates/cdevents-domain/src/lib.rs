//! CDEvents Domain Model
//!
//! Typed CI/CD lifecycle events following the CDEvents v0.4 vocabulary:
//! - EventType: the table of valid (domain, phase) pairs
//! - Event: context + per-domain subject, immutable once built
//! - EventFactory: builds events from caller parameters
//! - CustomData: free-form payload rendered alongside an event
//! - CloudEvent: transport envelope used for network delivery
//!
//! Construction is strict: a phase outside its domain's table is an error,
//! never a partially filled event.

pub mod custom_data;
pub mod envelope;
pub mod error;
pub mod events;
pub mod factory;
pub mod schema;

pub use custom_data::CustomData;
pub use envelope::{CloudEvent, CLOUDEVENTS_SPEC_VERSION, JSON_CONTENT_TYPE};
pub use error::{EventError, Result};
pub use events::{
    BuildSubject, Completion, Context, Event, EventId, NamedReference, PipelineRunSubject,
    Reference, ServiceSubject, Subject, SubjectContent, SubjectFields, TaskRunSubject,
    TestCaseRunSubject, TestOutputSubject, TestSuiteRunSubject,
};
pub use factory::{
    Clock, EventFactory, EventParams, FixedClock, GeneratedEvent, IdGenerator, RandomIds,
    SequentialIds, SystemClock,
};
pub use schema::{Domain, EventType, SPEC_VERSION};

/// CDEvents domain crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
