//! Destination descriptor parsing.
//!
//! Grammar:
//! - `""` or `console` → console
//! - `http://...` / `https://...` → network
//! - `file://<path>` → file
//! - `kafka://`, `amqp://`, `nats://`, `mqtt://` → not implemented yet
//! - anything else → unsupported

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::http::{HttpOptions, HttpTransport};
use crate::multi::MultiTransport;
use crate::transport::{ConsoleTransport, FileTransport, Transport};

/// Broker schemes recognised but without a transport
const PLANNED_SCHEMES: &[&str] = &["kafka", "amqp", "nats", "mqtt"];

/// Builds transports from destination descriptors
#[derive(Debug, Clone, Default)]
pub struct TransportFactory {
    http: HttpOptions,
}

impl TransportFactory {
    pub fn new(http: HttpOptions) -> Self {
        TransportFactory { http }
    }

    pub fn http_options(&self) -> &HttpOptions {
        &self.http
    }

    /// Resolve one descriptor.
    pub fn resolve(&self, target: &str) -> Result<Box<dyn Transport>> {
        let target = target.trim();
        debug!(target, "resolving transport");

        if target.is_empty() || target == "console" {
            return Ok(Box::new(ConsoleTransport::new()));
        }

        let Some((scheme, rest)) = target.split_once("://") else {
            return Err(TransportError::UnsupportedTarget(target.to_string()));
        };

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Ok(Box::new(HttpTransport::new(target, &self.http)?)),
            "file" => Ok(Box::new(FileTransport::new(rest)?)),
            s if PLANNED_SCHEMES.contains(&s) => Err(TransportError::NotImplemented {
                scheme: s.to_string(),
                target: target.to_string(),
            }),
            _ => Err(TransportError::UnsupportedTarget(target.to_string())),
        }
    }

    /// Resolve every descriptor; more than one yields a fan-out.
    ///
    /// An empty list resolves to the console. Resolution is all-or-nothing:
    /// the first bad descriptor fails the whole set before anything is sent.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        targets: &[S],
        parallel: bool,
    ) -> Result<Box<dyn Transport>> {
        match targets {
            [] => self.resolve(""),
            [single] => self.resolve(single.as_ref()),
            many => {
                let members = many
                    .iter()
                    .map(|t| self.resolve(t.as_ref()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Box::new(MultiTransport::new(members).parallel(parallel)))
            }
        }
    }
}
