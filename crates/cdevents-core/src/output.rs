//! Rendering events for stdout.
//!
//! Three modes:
//! - `structured`: the CDEvent as pretty JSON
//! - `structured-readable`: the same document as YAML
//! - `envelope`: the CloudEvents envelope as pretty JSON
//!
//! Custom data sits beside the canonical fields under `customData` and
//! `customDataContentType`: at the document root for the structured modes,
//! inside the envelope's `data` for `envelope`. Canonical fields are never
//! overwritten.

use std::fmt;
use std::str::FromStr;

use cdevents_domain::{CustomData, Event, GeneratedEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{OutputError, Result};

pub const CUSTOM_DATA_KEY: &str = "customData";
pub const CUSTOM_DATA_CONTENT_TYPE_KEY: &str = "customDataContentType";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    #[default]
    Structured,
    StructuredReadable,
    Envelope,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Structured,
        OutputFormat::StructuredReadable,
        OutputFormat::Envelope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Structured => "structured",
            OutputFormat::StructuredReadable => "structured-readable",
            OutputFormat::Envelope => "envelope",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    /// Accepts the mode names plus the short aliases `json`, `yaml` and
    /// `cloudevent`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(OutputFormat::Structured),
            "structured-readable" | "yaml" => Ok(OutputFormat::StructuredReadable),
            "envelope" | "cloudevent" => Ok(OutputFormat::Envelope),
            _ => Err(OutputError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = OutputError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.as_str().to_string()
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render one event with optional custom data.
pub fn format_event(
    event: &Event,
    custom_data: Option<&CustomData>,
    format: OutputFormat,
) -> Result<String> {
    let document = document(event, custom_data, format)?;
    debug!(event_id = %event.id(), %format, "rendering event");
    encode(&document, format)
}

/// Render several events as one JSON array or YAML sequence.
pub fn format_many(events: &[GeneratedEvent], format: OutputFormat) -> Result<String> {
    let documents = events
        .iter()
        .map(|g| document(&g.event, g.custom_data.as_ref(), format))
        .collect::<Result<Vec<_>>>()?;
    encode(&Value::Array(documents), format)
}

/// Wire document for `event`, before text encoding
fn document(event: &Event, custom_data: Option<&CustomData>, format: OutputFormat) -> Result<Value> {
    let mut value = match format {
        OutputFormat::Structured | OutputFormat::StructuredReadable => event.to_value()?,
        OutputFormat::Envelope => serde_json::to_value(event.to_cloud_event()?)?,
    };

    if let Some(custom) = custom_data.filter(|c| !c.is_empty()) {
        let target = match format {
            OutputFormat::Envelope => value.get_mut("data"),
            _ => Some(&mut value),
        };
        if let Some(Value::Object(map)) = target {
            attach_custom_data(map, custom);
        }
    }

    Ok(value)
}

fn attach_custom_data(map: &mut Map<String, Value>, custom: &CustomData) {
    if let Some(data) = &custom.data {
        map.insert(CUSTOM_DATA_KEY.to_string(), data.clone());
    }
    if let Some(content_type) = custom.content_type.as_deref().filter(|c| !c.is_empty()) {
        map.insert(
            CUSTOM_DATA_CONTENT_TYPE_KEY.to_string(),
            Value::String(content_type.to_string()),
        );
    }
}

fn encode(document: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Structured | OutputFormat::Envelope => {
            Ok(serde_json::to_string_pretty(document)?)
        }
        OutputFormat::StructuredReadable => Ok(serde_yaml::to_string(document)?),
    }
}

/// Renders generated events in a fixed mode
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        OutputFormatter { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render(&self, generated: &GeneratedEvent) -> Result<String> {
        format_event(&generated.event, generated.custom_data.as_ref(), self.format)
    }

    pub fn render_many(&self, events: &[GeneratedEvent]) -> Result<String> {
        format_many(events, self.format)
    }
}
