//! CloudEvents envelope for CDEvents.
//!
//! The whole CDEvent becomes the envelope's `data`; context fields are
//! lifted into the envelope attributes. Network delivery uses the binary
//! content mode: attributes travel as `ce-*` headers and `data` is the body.

use crate::error::Result;
use crate::events::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CloudEvents specification version
pub const CLOUDEVENTS_SPEC_VERSION: &str = "1.0";

/// Content type of envelope data
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    pub specversion: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub time: DateTime<Utc>,
    pub datacontenttype: String,
    pub data: Value,
}

impl CloudEvent {
    /// Wrap `event` in an envelope
    pub fn from_event(event: &Event) -> Result<Self> {
        Ok(CloudEvent {
            specversion: CLOUDEVENTS_SPEC_VERSION.to_string(),
            id: event.id().to_string(),
            source: event.source().to_string(),
            event_type: event.event_type().type_uri(),
            subject: Some(event.subject_id().to_string()).filter(|s| !s.is_empty()),
            time: event.timestamp(),
            datacontenttype: JSON_CONTENT_TYPE.to_string(),
            data: event.to_value()?,
        })
    }

    /// Attribute headers for binary content mode
    pub fn binary_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("ce-specversion", self.specversion.clone()),
            ("ce-id", self.id.clone()),
            ("ce-source", self.source.clone()),
            ("ce-type", self.event_type.clone()),
            ("ce-time", self.time.to_rfc3339()),
            ("content-type", self.datacontenttype.clone()),
        ];
        if let Some(subject) = &self.subject {
            headers.push(("ce-subject", subject.clone()));
        }
        headers
    }

    /// Body for binary content mode
    pub fn binary_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.data)?)
    }
}

impl Event {
    pub fn to_cloud_event(&self) -> Result<CloudEvent> {
        CloudEvent::from_event(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Domain, EventFactory, EventParams};

    fn sample() -> Event {
        EventFactory::new("test-source")
            .construct(Domain::PipelineRun, "queued", EventParams::new("pipeline-123", "p"))
            .unwrap()
            .event
    }

    #[test]
    fn test_envelope_attributes() {
        let event = sample();
        let ce = event.to_cloud_event().unwrap();

        assert_eq!(ce.specversion, "1.0");
        assert_eq!(ce.id, event.id().to_string());
        assert_eq!(ce.source, "test-source");
        assert_eq!(ce.event_type, "dev.cdevents.pipelinerun.queued.0.2.0");
        assert_eq!(ce.subject.as_deref(), Some("pipeline-123"));
        assert_eq!(ce.data["subject"]["id"], "pipeline-123");
    }

    #[test]
    fn test_binary_headers() {
        let ce = sample().to_cloud_event().unwrap();
        let headers = ce.binary_headers();

        let get = |name: &str| {
            headers
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("ce-specversion").as_deref(), Some("1.0"));
        assert_eq!(get("content-type").as_deref(), Some("application/json"));
        assert_eq!(get("ce-subject").as_deref(), Some("pipeline-123"));
    }

    #[test]
    fn test_binary_body_is_data() {
        let ce = sample().to_cloud_event().unwrap();
        let body: Value = serde_json::from_slice(&ce.binary_body().unwrap()).unwrap();
        assert_eq!(body, ce.data);
    }
}
