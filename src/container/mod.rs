//! # Container Lifecycle
//!
//! Starts one ephemeral backing-service instance, reports where it can be
//! reached and guarantees it is terminated exactly once.
//!
//! ## Architecture
//!
//! ```text
//! ContainerRuntime            # start(StartRequest) -> RunningContainer
//! ├── DockerRuntime           # testcontainers GenericImage
//! └── (test_helpers) FakeRuntime
//!
//! BackingInstance             # owned guard around one RunningContainer
//! ```
//!
//! Coordinates returned by the runtime are not guaranteed reachable; the
//! readiness gate decides that.

pub mod docker;
pub mod instance;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::FixtureResult;

pub use docker::DockerRuntime;
pub use instance::BackingInstance;

/// Image `name:tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parse `name[:tag]`, defaulting the tag to `latest`
    ///
    /// A colon inside a registry host (`registry:5000/img`) is not taken as a tag.
    pub fn parse(reference: &str) -> Self {
        match reference.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') && !name.is_empty() => Self::new(name, tag),
            _ => Self::new(reference, "latest"),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// Mount attached to the instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSpec {
    /// In-memory filesystem at `target`
    Tmpfs { target: String },
    /// Host directory `source` mounted at `target`
    Bind { source: String, target: String },
}

/// Output stream carrying a startup message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Log line the runtime waits for before handing the instance back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyMessage {
    pub stream: LogStream,
    pub text: String,
}

impl ReadyMessage {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: LogStream::Stderr,
            text: text.into(),
        }
    }
}

/// Everything the runtime needs to start one instance
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    /// Engine label, used for logging and errors
    pub engine: String,
    pub image: ImageRef,
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<MountSpec>,
    /// Container-side port to map to the host
    pub exposed_port: u16,
    pub ready_message: Option<ReadyMessage>,
    pub startup_timeout: Duration,
}

/// Starts instances
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start an instance and report its mapped coordinates
    ///
    /// Fails with `FixtureError::Provision` when the image is unavailable,
    /// the port cannot be bound or resources are exhausted.
    async fn start(&self, request: StartRequest) -> FixtureResult<Box<dyn RunningContainer>>;
}

/// A started instance as seen by the runtime
///
/// Dropping the handle without calling [`RunningContainer::terminate`] must
/// still release the instance.
#[async_trait]
pub trait RunningContainer: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// Host the mapped port is reachable on
    fn host(&self) -> &str;

    /// Host-side mapped port
    fn port(&self) -> u16;

    /// Terminate and remove the instance
    async fn terminate(self: Box<Self>) -> FixtureResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_parse() {
        assert_eq!(
            ImageRef::parse("postgres:17-alpine"),
            ImageRef::new("postgres", "17-alpine")
        );
        assert_eq!(ImageRef::parse("mysql"), ImageRef::new("mysql", "latest"));
        assert_eq!(
            ImageRef::parse("registry:5000/team/mysql"),
            ImageRef::new("registry:5000/team/mysql", "latest")
        );
        assert_eq!(
            ImageRef::parse("registry:5000/team/mysql:8.4").to_string(),
            "registry:5000/team/mysql:8.4"
        );
    }
}
