//! Typed CDEvents and their per-domain subjects.
//!
//! Each domain gets its own subject struct carrying exactly the fields that
//! domain supports. [`SubjectContent`] is the sum over them; no field is
//! ever looked up by name at runtime.

use crate::schema::{EventType, SPEC_VERSION};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A unique event ID (UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        EventId(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SUBJECT BUILDING BLOCKS
// ============================================================================

/// Link to another CDEvents subject by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub id: String,
}

/// Embedded object that carries both id and name (test case / test suite)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedReference {
    pub id: String,
    pub name: String,
}

/// Outcome and error text; only ever populated on finishing phases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

/// Fields every domain subject exposes
pub trait SubjectFields {
    /// Subject name as supplied by the caller
    fn name(&self) -> &str;

    /// JSON pointer of the name field, relative to `subject.content`
    fn name_pointer(&self) -> &'static str;

    fn url(&self) -> Option<&str>;

    fn completion(&self) -> Option<&Completion> {
        None
    }
}

// ============================================================================
// PER-DOMAIN SUBJECTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSubject {
    pub pipeline_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunSubject {
    pub task_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_run: Option<Reference>,
    #[serde(flatten)]
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSubject {
    pub build_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSubject {
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRunSubject {
    pub test_case: NamedReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteRunSubject {
    pub test_suite: NamedReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutputSubject {
    pub output_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SubjectFields for PipelineRunSubject {
    fn name(&self) -> &str {
        &self.pipeline_name
    }
    fn name_pointer(&self) -> &'static str {
        "/pipelineName"
    }
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    fn completion(&self) -> Option<&Completion> {
        Some(&self.completion)
    }
}

impl SubjectFields for TaskRunSubject {
    fn name(&self) -> &str {
        &self.task_name
    }
    fn name_pointer(&self) -> &'static str {
        "/taskName"
    }
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    fn completion(&self) -> Option<&Completion> {
        Some(&self.completion)
    }
}

impl SubjectFields for BuildSubject {
    fn name(&self) -> &str {
        &self.build_name
    }
    fn name_pointer(&self) -> &'static str {
        "/buildName"
    }
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    fn completion(&self) -> Option<&Completion> {
        Some(&self.completion)
    }
}

impl SubjectFields for ServiceSubject {
    fn name(&self) -> &str {
        &self.service_name
    }
    fn name_pointer(&self) -> &'static str {
        "/serviceName"
    }
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl SubjectFields for TestCaseRunSubject {
    fn name(&self) -> &str {
        &self.test_case.name
    }
    fn name_pointer(&self) -> &'static str {
        "/testCase/name"
    }
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    fn completion(&self) -> Option<&Completion> {
        Some(&self.completion)
    }
}

impl SubjectFields for TestSuiteRunSubject {
    fn name(&self) -> &str {
        &self.test_suite.name
    }
    fn name_pointer(&self) -> &'static str {
        "/testSuite/name"
    }
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    fn completion(&self) -> Option<&Completion> {
        Some(&self.completion)
    }
}

impl SubjectFields for TestOutputSubject {
    fn name(&self) -> &str {
        &self.output_name
    }
    fn name_pointer(&self) -> &'static str {
        "/outputName"
    }
    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// Domain-specific subject content (`subject.content`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubjectContent {
    PipelineRun(PipelineRunSubject),
    TaskRun(TaskRunSubject),
    Build(BuildSubject),
    Service(ServiceSubject),
    TestCaseRun(TestCaseRunSubject),
    TestSuiteRun(TestSuiteRunSubject),
    TestOutput(TestOutputSubject),
}

impl SubjectContent {
    fn fields(&self) -> &dyn SubjectFields {
        match self {
            SubjectContent::PipelineRun(s) => s,
            SubjectContent::TaskRun(s) => s,
            SubjectContent::Build(s) => s,
            SubjectContent::Service(s) => s,
            SubjectContent::TestCaseRun(s) => s,
            SubjectContent::TestSuiteRun(s) => s,
            SubjectContent::TestOutput(s) => s,
        }
    }
}

impl SubjectFields for SubjectContent {
    fn name(&self) -> &str {
        self.fields().name()
    }
    fn name_pointer(&self) -> &'static str {
        self.fields().name_pointer()
    }
    fn url(&self) -> Option<&str> {
        self.fields().url()
    }
    fn completion(&self) -> Option<&Completion> {
        self.fields().completion()
    }
}

// ============================================================================
// EVENT
// ============================================================================

/// `context` block shared by every CDEvent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Context {
    pub specversion: &'static str,
    pub id: EventId,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
}

/// `subject` block: what happened, to what
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub id: String,
    #[serde(rename = "type")]
    pub subject_type: &'static str,
    pub content: SubjectContent,
}

/// A constructed CDEvent.
///
/// Only the [`EventFactory`](crate::EventFactory) builds these, and nothing
/// mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    context: Context,
    subject: Subject,
}

impl Event {
    pub(crate) fn new(
        id: EventId,
        source: String,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        subject_id: String,
        content: SubjectContent,
    ) -> Self {
        Event {
            context: Context {
                specversion: SPEC_VERSION,
                id,
                source,
                event_type,
                timestamp,
            },
            subject: Subject {
                id: subject_id,
                subject_type: event_type.subject_type(),
                content,
            },
        }
    }

    pub fn id(&self) -> EventId {
        self.context.id
    }

    pub fn source(&self) -> &str {
        &self.context.source
    }

    pub fn event_type(&self) -> EventType {
        self.context.event_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.context.timestamp
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn subject_id(&self) -> &str {
        &self.subject.id
    }

    pub fn subject_name(&self) -> &str {
        self.subject.content.name()
    }

    pub fn url(&self) -> Option<&str> {
        self.subject.content.url()
    }

    pub fn outcome(&self) -> Option<&str> {
        self.subject
            .content
            .completion()
            .and_then(|c| c.outcome.as_deref())
    }

    pub fn errors(&self) -> Option<&str> {
        self.subject
            .content
            .completion()
            .and_then(|c| c.errors.as_deref())
    }

    /// JSON pointer to the subject name within the structured document,
    /// e.g. `/subject/content/testCase/name`
    pub fn subject_name_pointer(&self) -> String {
        format!("/subject/content{}", self.subject.content.name_pointer())
    }

    /// Generic key/value form of the event
    pub fn to_value(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline_event(completion: Completion) -> Event {
        Event::new(
            EventId::new(),
            "test-source".to_string(),
            EventType::PipelineRunFinished,
            Utc::now(),
            "pipeline-123".to_string(),
            SubjectContent::PipelineRun(PipelineRunSubject {
                pipeline_name: "my-pipeline".to_string(),
                url: None,
                completion,
            }),
        )
    }

    #[test]
    fn test_event_id_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn test_context_serialization() {
        let event = pipeline_event(Completion::default());
        let value = event.to_value().unwrap();

        assert_eq!(value["context"]["specversion"], "0.4.1");
        assert_eq!(value["context"]["source"], "test-source");
        assert_eq!(
            value["context"]["type"],
            "dev.cdevents.pipelinerun.finished.0.2.0"
        );
        assert_eq!(value["subject"]["type"], "pipelineRun");
    }

    #[test]
    fn test_completion_flattened_into_content() {
        let event = pipeline_event(Completion {
            outcome: Some("success".to_string()),
            errors: None,
        });
        let value = event.to_value().unwrap();

        assert_eq!(
            value["subject"]["content"],
            json!({ "pipelineName": "my-pipeline", "outcome": "success" })
        );
        assert_eq!(event.outcome(), Some("success"));
        assert_eq!(event.errors(), None);
    }

    #[test]
    fn test_name_pointer_resolves() {
        let event = pipeline_event(Completion::default());
        let value = event.to_value().unwrap();
        assert_eq!(
            value.pointer(&event.subject_name_pointer()),
            Some(&json!("my-pipeline"))
        );
    }
}
