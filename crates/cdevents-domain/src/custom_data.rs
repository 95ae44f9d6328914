//! Caller-supplied payload attached alongside an event.
//!
//! Custom data never enters the typed [`Event`](crate::Event); the output
//! formatter merges it into the rendered document only.

use crate::error::{EventError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form payload plus its content type.
///
/// Only `data` and `contentType` are accepted; any other top-level key is a
/// parse error rather than being dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl CustomData {
    pub fn new(data: Value) -> Self {
        CustomData {
            data: Some(data),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.content_type.is_none()
    }

    /// Parse `{"data": ..., "contentType": "..."}`.
    ///
    /// An empty (or all-whitespace) string means "no custom data".
    pub fn from_json(input: &str) -> Result<Option<Self>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(input)
            .map(Some)
            .map_err(|e| EventError::CustomDataParse(format!("invalid JSON: {}", e)))
    }

    /// Same shape as [`CustomData::from_json`], written as YAML
    pub fn from_yaml(input: &str) -> Result<Option<Self>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        serde_yaml::from_str(input)
            .map(Some)
            .map_err(|e| EventError::CustomDataParse(format!("invalid YAML: {}", e)))
    }

    /// Build a data object from `key=value` pairs.
    ///
    /// Values that parse as JSON keep their type (`retries=3` is a number);
    /// anything else is stored as a string.
    pub fn from_key_values<S: AsRef<str>>(pairs: &[S]) -> Result<Option<Self>> {
        if pairs.is_empty() {
            return Ok(None);
        }

        let mut data = Map::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| EventError::InvalidKeyValue(pair.to_string()))?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(EventError::InvalidKeyValue(pair.to_string()));
            }
            let parsed =
                serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            data.insert(key.to_string(), parsed);
        }

        Ok(Some(CustomData::new(Value::Object(data))))
    }

    /// Fold `other` into `self`; object data is merged key by key, anything
    /// else is replaced.
    pub fn merge(mut self, other: CustomData) -> Self {
        self.data = match (self.data.take(), other.data) {
            (Some(Value::Object(mut base)), Some(Value::Object(extra))) => {
                base.extend(extra);
                Some(Value::Object(base))
            }
            (base, None) => base,
            (_, extra) => extra,
        };
        if other.content_type.is_some() {
            self.content_type = other.content_type;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_string_is_no_custom_data() {
        assert_eq!(CustomData::from_json("").unwrap(), None);
        assert_eq!(CustomData::from_json("   ").unwrap(), None);
        assert_eq!(CustomData::from_yaml("").unwrap(), None);
    }

    #[test]
    fn test_parse_json() {
        let parsed = CustomData::from_json(
            r#"{"data": {"commit": "abc123"}, "contentType": "application/json"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(parsed.data, Some(json!({"commit": "abc123"})));
        assert_eq!(parsed.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_either_field_may_be_absent() {
        let only_type = CustomData::from_json(r#"{"contentType": "text/plain"}"#)
            .unwrap()
            .unwrap();
        assert!(only_type.data.is_none());
        assert!(!only_type.is_empty());
    }

    #[test]
    fn test_malformed_json_is_error() {
        let err = CustomData::from_json("{not json").unwrap_err();
        assert!(matches!(err, EventError::CustomDataParse(_)));
    }

    #[test]
    fn test_unknown_top_level_keys_are_rejected() {
        let err = CustomData::from_json(
            r#"{"labels": {"team": "platform"}, "links": [{"name": "docs", "url": "https://x"}]}"#,
        )
        .unwrap_err();
        assert!(
            matches!(&err, EventError::CustomDataParse(msg) if msg.contains("labels")),
            "{err}"
        );

        let err = CustomData::from_yaml("data:\n  a: 1\nannotations:\n  owner: me\n").unwrap_err();
        assert!(matches!(err, EventError::CustomDataParse(_)));
    }

    #[test]
    fn test_unknown_keys_inside_data_are_kept() {
        let parsed = CustomData::from_json(r#"{"data": {"labels": {"team": "platform"}}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.data, Some(json!({"labels": {"team": "platform"}})));
    }

    #[test]
    fn test_parse_yaml() {
        let parsed = CustomData::from_yaml("data:\n  branch: main\ncontentType: application/json\n")
            .unwrap()
            .unwrap();
        assert_eq!(parsed.data, Some(json!({"branch": "main"})));
    }

    #[test]
    fn test_key_values_typed() {
        let parsed = CustomData::from_key_values(&["retries=3", "branch = main", "ok=true"])
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed.data,
            Some(json!({"retries": 3, "branch": "main", "ok": true}))
        );
    }

    #[test]
    fn test_key_values_rejects_missing_separator() {
        let err = CustomData::from_key_values(&["novalue"]).unwrap_err();
        assert_eq!(err.to_string(), "invalid key=value format: novalue");
    }

    #[test]
    fn test_merge_objects() {
        let base = CustomData::new(json!({"a": 1})).with_content_type("application/json");
        let merged = base.merge(CustomData::new(json!({"b": 2})));
        assert_eq!(merged.data, Some(json!({"a": 1, "b": 2})));
        assert_eq!(merged.content_type.as_deref(), Some("application/json"));
    }
}
