//! The delivery capability and its local variants.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cdevents_domain::Event;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::multi::MultiTransport;

/// Delivers one event to one destination.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Descriptor identifying where this transport delivers (used in errors)
    fn destination(&self) -> String;

    /// Make a single delivery attempt.
    async fn send(&self, event: &Event) -> Result<()>;

    /// The fan-out behind this transport, if it is one
    fn as_fanout(&self) -> Option<&MultiTransport> {
        None
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn destination(&self) -> String {
        (**self).destination()
    }

    async fn send(&self, event: &Event) -> Result<()> {
        (**self).send(event).await
    }

    fn as_fanout(&self) -> Option<&MultiTransport> {
        (**self).as_fanout()
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Prints a delivery confirmation to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        ConsoleTransport
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn destination(&self) -> String {
        "console".to_string()
    }

    async fn send(&self, event: &Event) -> Result<()> {
        writeln!(std::io::stdout(), "Event sent to console: {}", event.id())
            .map_err(|e| TransportError::delivery(self.destination(), e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Appends each event as one JSON line to a local file.
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    /// Bind to `path`; the parent directory must already exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let target = format!("file://{}", path.display());

        if path.as_os_str().is_empty() {
            return Err(TransportError::init(target, "empty file path"));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(TransportError::init(
                    target,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }

        Ok(FileTransport { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fail(&self, err: impl std::fmt::Display) -> TransportError {
        TransportError::delivery(self.destination(), err.to_string())
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn destination(&self) -> String {
        format!("file://{}", self.path.display())
    }

    async fn send(&self, event: &Event) -> Result<()> {
        let mut line = serde_json::to_vec(event).map_err(|e| self.fail(e))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.fail(e))?;
        file.write_all(&line).await.map_err(|e| self.fail(e))?;
        file.flush().await.map_err(|e| self.fail(e))?;

        debug!(event_id = %event.id(), path = %self.path.display(), "appended event to file");
        Ok(())
    }
}
