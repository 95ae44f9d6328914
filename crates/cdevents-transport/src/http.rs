//! HTTP delivery of CloudEvents in binary content mode.
//!
//! Each send converts the event to a [`CloudEvent`] envelope, puts the
//! attributes in `ce-*` headers and POSTs the data as the body. Any
//! non-2xx status or transport failure is a `Delivery` error carrying the
//! underlying message.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use cdevents_domain::{CloudEvent, Event};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info_span, Instrument};

use crate::error::{Result, TransportError};
use crate::transport::Transport;

/// Maximum response body bytes echoed into an error message
const MAX_ERROR_BODY: usize = 512;

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Extra request headers
    pub headers: BTreeMap<String, String>,

    /// User agent string
    pub user_agent: String,

    /// Per-request timeout; the caller's overall deadline still applies
    pub request_timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        HttpOptions {
            headers: BTreeMap::new(),
            user_agent: format!("cdevents-cli/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: None,
        }
    }
}

impl HttpOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Sends events to an HTTP(S) endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    target: String,
}

impl HttpTransport {
    /// Build the client eagerly.
    ///
    /// A malformed extra header or a client build failure is an `Init` error,
    /// raised before any event is sent.
    pub fn new(target: impl Into<String>, options: &HttpOptions) -> Result<Self> {
        let target = target.into();
        let headers = header_map(&options.headers)
            .map_err(|message| TransportError::init(&target, message))?;

        let mut builder = reqwest::Client::builder()
            .user_agent(&options.user_agent)
            .default_headers(headers);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::init(&target, format!("failed to create HTTP client: {e}")))?;

        Ok(HttpTransport { client, target })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn fail(&self, message: impl Into<String>) -> TransportError {
        TransportError::delivery(&self.target, message)
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> std::result::Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid header name {name:?}"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| format!("invalid value for header {name}"))?;
        map.insert(header, value);
    }
    Ok(map)
}

#[async_trait]
impl Transport for HttpTransport {
    fn destination(&self) -> String {
        self.target.clone()
    }

    async fn send(&self, event: &Event) -> Result<()> {
        let envelope = CloudEvent::from_event(event)
            .map_err(|e| self.fail(format!("failed to convert to CloudEvent: {e}")))?;
        let body = envelope
            .binary_body()
            .map_err(|e| self.fail(format!("failed to encode event: {e}")))?;

        let span = info_span!("http_delivery", event_id = %event.id(), target = %self.target);

        async move {
            let mut request = self.client.post(&self.target).body(body);
            for (name, value) in envelope.binary_headers() {
                request = request.header(name, value);
            }

            let response = request.send().await.map_err(|e| self.fail(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                debug!(status = status.as_u16(), "event delivered");
                return Ok(());
            }

            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            let message = if text.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), text.trim())
            };
            Err(self.fail(message))
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_accepts_valid_headers() {
        let options = HttpOptions::default()
            .with_header("Authorization", "Bearer abc")
            .with_header("X-Team", "platform");
        let map = header_map(&options.headers).unwrap();
        assert_eq!(map["authorization"], "Bearer abc");
        assert_eq!(map["x-team"], "platform");
    }

    #[test]
    fn test_header_map_rejects_bad_name() {
        let headers = BTreeMap::from([("bad header".to_string(), "x".to_string())]);
        let err = header_map(&headers).unwrap_err();
        assert!(err.contains("bad header"), "{err}");
    }
}
