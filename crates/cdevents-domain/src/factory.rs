//! Event Factory: (domain, phase, parameters) -> typed [`Event`].
//!
//! Construction is all-or-nothing. An unknown phase is rejected before any
//! field is filled, and optional fields are omitted rather than emitted empty.

use crate::custom_data::CustomData;
use crate::error::Result;
use crate::events::*;
use crate::schema::{Domain, EventType};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Source of event timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of event ids
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> EventId;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> EventId {
        EventId::new()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Deterministic ids: 00000000-0000-0000-0000-000000000001, ...2, ...
#[derive(Debug, Default)]
pub struct SequentialIds(AtomicU64);

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> EventId {
        let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        EventId(Uuid::from_u128(n as u128))
    }
}

/// Caller-supplied values for one event.
///
/// Empty strings mean "not supplied".
#[derive(Debug, Clone, Default)]
pub struct EventParams {
    pub subject_id: String,
    pub subject_name: String,
    pub url: String,
    /// Finished phases only
    pub outcome: String,
    /// Finished phases only
    pub errors: String,
    /// task-run only
    pub pipeline_run_id: String,
    /// service only
    pub environment_id: String,
    pub custom_data: Option<CustomData>,
}

impl EventParams {
    pub fn new(subject_id: impl Into<String>, subject_name: impl Into<String>) -> Self {
        EventParams {
            subject_id: subject_id.into(),
            subject_name: subject_name.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = outcome.into();
        self
    }

    pub fn with_errors(mut self, errors: impl Into<String>) -> Self {
        self.errors = errors.into();
        self
    }

    pub fn with_pipeline_run(mut self, id: impl Into<String>) -> Self {
        self.pipeline_run_id = id.into();
        self
    }

    pub fn with_environment(mut self, id: impl Into<String>) -> Self {
        self.environment_id = id.into();
        self
    }

    pub fn with_custom_data(mut self, custom_data: Option<CustomData>) -> Self {
        self.custom_data = custom_data;
        self
    }
}

/// A constructed event together with the custom data recorded for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEvent {
    pub event: Event,
    pub custom_data: Option<CustomData>,
}

/// Builds events stamped with a fixed source
pub struct EventFactory {
    source: String,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl EventFactory {
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_sources(source, Arc::new(SystemClock), Arc::new(RandomIds))
    }

    /// Factory with an injected clock and id generator
    pub fn with_sources(
        source: impl Into<String>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        EventFactory {
            source: source.into(),
            clock,
            ids,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Construct an event for `domain` in lifecycle `phase`.
    ///
    /// Fails with `UnsupportedPhase` when `phase` is not valid for `domain`.
    pub fn construct(
        &self,
        domain: Domain,
        phase: &str,
        params: EventParams,
    ) -> Result<GeneratedEvent> {
        let event_type = EventType::parse(domain, phase)?;
        Ok(self.build(event_type, params))
    }

    /// Construct an event of a known type; cannot fail
    pub fn build(&self, event_type: EventType, params: EventParams) -> GeneratedEvent {
        let EventParams {
            subject_id,
            subject_name,
            url,
            outcome,
            errors,
            pipeline_run_id,
            environment_id,
            custom_data,
        } = params;

        let url = non_empty(url);
        let completion = if event_type.is_finished() {
            Completion {
                outcome: non_empty(outcome),
                errors: non_empty(errors),
            }
        } else {
            Completion::default()
        };

        let content = match event_type.domain() {
            Domain::PipelineRun => SubjectContent::PipelineRun(PipelineRunSubject {
                pipeline_name: subject_name,
                url,
                completion,
            }),
            Domain::TaskRun => SubjectContent::TaskRun(TaskRunSubject {
                task_name: subject_name,
                url,
                pipeline_run: non_empty(pipeline_run_id).map(|id| Reference { id }),
                completion,
            }),
            Domain::Build => SubjectContent::Build(BuildSubject {
                build_name: subject_name,
                url,
                completion,
            }),
            Domain::Service => SubjectContent::Service(ServiceSubject {
                service_name: subject_name,
                url,
                environment: non_empty(environment_id).map(|id| Reference { id }),
            }),
            Domain::Test => test_content(event_type, &subject_id, subject_name, url, completion),
        };

        let event = Event::new(
            self.ids.next_id(),
            self.source.clone(),
            event_type,
            self.clock.now(),
            subject_id,
            content,
        );

        debug!(
            event_id = %event.id(),
            event_type = %event_type,
            subject_id = %event.subject_id(),
            "constructed event"
        );

        GeneratedEvent {
            event,
            custom_data: custom_data.filter(|c| !c.is_empty()),
        }
    }
}

fn test_content(
    event_type: EventType,
    subject_id: &str,
    name: String,
    url: Option<String>,
    completion: Completion,
) -> SubjectContent {
    use EventType::*;
    match event_type {
        TestCaseRunQueued | TestCaseRunStarted | TestCaseRunFinished | TestCaseRunSkipped => {
            SubjectContent::TestCaseRun(TestCaseRunSubject {
                test_case: NamedReference {
                    id: subject_id.to_string(),
                    name,
                },
                url,
                completion,
            })
        }
        TestSuiteRunQueued | TestSuiteRunStarted | TestSuiteRunFinished => {
            SubjectContent::TestSuiteRun(TestSuiteRunSubject {
                test_suite: NamedReference {
                    id: subject_id.to_string(),
                    name,
                },
                url,
                completion,
            })
        }
        _ => SubjectContent::TestOutput(TestOutputSubject {
            output_name: name,
            url,
        }),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
