//! Event-type table: which lifecycle phases each domain supports.
//!
//! Every valid (domain, phase) pair is one [`EventType`] variant. Anything
//! outside this table is rejected before an event is built.

use crate::error::{EventError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// CDEvents specification version emitted in `context.specversion`
pub const SPEC_VERSION: &str = "0.4.1";

/// Family of CI/CD activity an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    PipelineRun,
    TaskRun,
    Build,
    Service,
    Test,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::PipelineRun,
        Domain::TaskRun,
        Domain::Build,
        Domain::Service,
        Domain::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::PipelineRun => "pipeline-run",
            Domain::TaskRun => "task-run",
            Domain::Build => "build",
            Domain::Service => "service",
            Domain::Test => "test",
        }
    }

    /// Phase strings accepted for this domain, in lifecycle order
    pub fn phases(&self) -> Vec<&'static str> {
        EventType::ALL
            .iter()
            .filter(|t| t.domain() == *self)
            .map(|t| t.phase())
            .collect()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pipeline" | "pipeline-run" | "pipelinerun" => Ok(Domain::PipelineRun),
            "task" | "task-run" | "taskrun" => Ok(Domain::TaskRun),
            "build" => Ok(Domain::Build),
            "service" => Ok(Domain::Service),
            "test" => Ok(Domain::Test),
            other => Err(EventError::UnknownDomain(other.to_string())),
        }
    }
}

/// A valid (domain, phase) combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    PipelineRunQueued,
    PipelineRunStarted,
    PipelineRunFinished,
    TaskRunStarted,
    TaskRunFinished,
    BuildQueued,
    BuildStarted,
    BuildFinished,
    ServiceDeployed,
    ServicePublished,
    ServiceRemoved,
    ServiceRolledback,
    ServiceUpgraded,
    TestCaseRunQueued,
    TestCaseRunStarted,
    TestCaseRunFinished,
    TestCaseRunSkipped,
    TestSuiteRunQueued,
    TestSuiteRunStarted,
    TestSuiteRunFinished,
    TestOutputPublished,
}

impl EventType {
    pub const ALL: [EventType; 21] = [
        EventType::PipelineRunQueued,
        EventType::PipelineRunStarted,
        EventType::PipelineRunFinished,
        EventType::TaskRunStarted,
        EventType::TaskRunFinished,
        EventType::BuildQueued,
        EventType::BuildStarted,
        EventType::BuildFinished,
        EventType::ServiceDeployed,
        EventType::ServicePublished,
        EventType::ServiceRemoved,
        EventType::ServiceRolledback,
        EventType::ServiceUpgraded,
        EventType::TestCaseRunQueued,
        EventType::TestCaseRunStarted,
        EventType::TestCaseRunFinished,
        EventType::TestCaseRunSkipped,
        EventType::TestSuiteRunQueued,
        EventType::TestSuiteRunStarted,
        EventType::TestSuiteRunFinished,
        EventType::TestOutputPublished,
    ];

    /// Look up the event type for a domain and phase string.
    ///
    /// Fails with [`EventError::UnsupportedPhase`] when the phase is not in
    /// the domain's table.
    pub fn parse(domain: Domain, phase: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.domain() == domain && t.phase() == phase)
            .ok_or_else(|| EventError::UnsupportedPhase {
                domain: domain.to_string(),
                phase: phase.to_string(),
            })
    }

    pub fn domain(&self) -> Domain {
        use EventType::*;
        match self {
            PipelineRunQueued | PipelineRunStarted | PipelineRunFinished => Domain::PipelineRun,
            TaskRunStarted | TaskRunFinished => Domain::TaskRun,
            BuildQueued | BuildStarted | BuildFinished => Domain::Build,
            ServiceDeployed | ServicePublished | ServiceRemoved | ServiceRolledback
            | ServiceUpgraded => Domain::Service,
            TestCaseRunQueued | TestCaseRunStarted | TestCaseRunFinished | TestCaseRunSkipped
            | TestSuiteRunQueued | TestSuiteRunStarted | TestSuiteRunFinished
            | TestOutputPublished => Domain::Test,
        }
    }

    /// Phase string as accepted on the command line
    pub fn phase(&self) -> &'static str {
        use EventType::*;
        match self {
            PipelineRunQueued | BuildQueued => "queued",
            PipelineRunStarted | TaskRunStarted | BuildStarted => "started",
            PipelineRunFinished | TaskRunFinished | BuildFinished => "finished",
            ServiceDeployed => "deployed",
            ServicePublished => "published",
            ServiceRemoved => "removed",
            ServiceRolledback => "rolledback",
            ServiceUpgraded => "upgraded",
            TestCaseRunQueued => "testcase-queued",
            TestCaseRunStarted => "testcase-started",
            TestCaseRunFinished => "testcase-finished",
            TestCaseRunSkipped => "testcase-skipped",
            TestSuiteRunQueued => "testsuite-queued",
            TestSuiteRunStarted => "testsuite-started",
            TestSuiteRunFinished => "testsuite-finished",
            TestOutputPublished => "testoutput-published",
        }
    }

    /// Whether outcome/errors may be carried by this event
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            EventType::PipelineRunFinished
                | EventType::TaskRunFinished
                | EventType::BuildFinished
                | EventType::TestCaseRunFinished
                | EventType::TestSuiteRunFinished
        )
    }

    /// CDEvents subject type (`subject.type`)
    pub fn subject_type(&self) -> &'static str {
        use EventType::*;
        match self {
            PipelineRunQueued | PipelineRunStarted | PipelineRunFinished => "pipelineRun",
            TaskRunStarted | TaskRunFinished => "taskRun",
            BuildQueued | BuildStarted | BuildFinished => "build",
            ServiceDeployed | ServicePublished | ServiceRemoved | ServiceRolledback
            | ServiceUpgraded => "service",
            TestCaseRunQueued | TestCaseRunStarted | TestCaseRunFinished | TestCaseRunSkipped => {
                "testCaseRun"
            }
            TestSuiteRunQueued | TestSuiteRunStarted | TestSuiteRunFinished => "testSuiteRun",
            TestOutputPublished => "testOutput",
        }
    }

    /// CDEvents predicate (the verb in the type URI)
    fn predicate(&self) -> &'static str {
        let phase = self.phase();
        phase.rsplit('-').next().unwrap_or(phase)
    }

    fn schema_version(&self) -> &'static str {
        match self {
            EventType::TestCaseRunSkipped => "0.1.0",
            _ => "0.2.0",
        }
    }

    /// Full CDEvents type, e.g. `dev.cdevents.pipelinerun.started.0.2.0`
    pub fn type_uri(&self) -> String {
        format!(
            "dev.cdevents.{}.{}.{}",
            self.subject_type().to_lowercase(),
            self.predicate(),
            self.schema_version()
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.domain(), self.phase())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.type_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_aliases() {
        assert_eq!("pipeline".parse::<Domain>().unwrap(), Domain::PipelineRun);
        assert_eq!("task-run".parse::<Domain>().unwrap(), Domain::TaskRun);
        assert!(matches!(
            "deployment".parse::<Domain>(),
            Err(EventError::UnknownDomain(_))
        ));
    }

    #[test]
    fn test_phase_table_sizes() {
        assert_eq!(Domain::PipelineRun.phases(), vec!["queued", "started", "finished"]);
        assert_eq!(Domain::TaskRun.phases(), vec!["started", "finished"]);
        assert_eq!(Domain::Service.phases().len(), 5);
        assert_eq!(Domain::Test.phases().len(), 8);
    }

    #[test]
    fn test_unsupported_phase_names_domain_and_phase() {
        let err = EventType::parse(Domain::TaskRun, "queued").unwrap_err();
        assert_eq!(err.to_string(), "unsupported task-run event type: queued");
    }

    #[test]
    fn test_type_uri() {
        assert_eq!(
            EventType::PipelineRunStarted.type_uri(),
            "dev.cdevents.pipelinerun.started.0.2.0"
        );
        assert_eq!(
            EventType::TestCaseRunSkipped.type_uri(),
            "dev.cdevents.testcaserun.skipped.0.1.0"
        );
        assert_eq!(
            EventType::TestOutputPublished.type_uri(),
            "dev.cdevents.testoutput.published.0.2.0"
        );
    }

    #[test]
    fn test_finished_subset() {
        let finished: Vec<_> = EventType::ALL.iter().filter(|t| t.is_finished()).collect();
        assert_eq!(finished.len(), 5);
        assert!(!EventType::TestCaseRunSkipped.is_finished());
    }
}
