//! # Fixture Errors
//!
//! Error kinds raised while standing up an ephemeral datastore. Every kind is
//! terminal to the calling test's setup phase; none of them are swallowed.
//!
//! - [`FixtureError::Provision`] - the container runtime could not start or expose the instance
//! - [`FixtureError::ReadinessTimeout`] - the instance never answered a probe within budget
//! - [`MigrationError`] - schema bootstrap failed, remaining migrations were not attempted
//! - [`ConnectionError`] - driver failure (open, ping, query or timeout)
//!
//! Connection errors only ever carry redacted URIs.

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigurationError;

/// Top-level error for provisioning, readiness, migration and teardown.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The runtime could not start or expose the backing instance
    #[error("Failed to provision {engine} instance from image '{image}': {reason}")]
    Provision {
        engine: String,
        image: String,
        reason: String,
    },

    /// The instance never became reachable within the readiness budget
    #[error(
        "Datastore not ready after {attempts} attempts in {elapsed:?}: {last_error}"
    )]
    ReadinessTimeout {
        attempts: u32,
        elapsed: Duration,
        #[source]
        last_error: ConnectionError,
    },

    /// Schema bootstrap failed
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Driver failure outside the readiness window
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Invalid or unloadable fixture configuration
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The runtime failed to terminate the instance
    #[error("Failed to terminate container {container_id}: {reason}")]
    Teardown {
        container_id: String,
        reason: String,
    },
}

impl FixtureError {
    /// Create a provisioning error
    pub fn provision<E: std::fmt::Display>(
        engine: impl Into<String>,
        image: impl Into<String>,
        error: E,
    ) -> Self {
        Self::Provision {
            engine: engine.into(),
            image: image.into(),
            reason: error.to_string(),
        }
    }

    /// Create a teardown error
    pub fn teardown<E: std::fmt::Display>(container_id: impl Into<String>, error: E) -> Self {
        Self::Teardown {
            container_id: container_id.into(),
            reason: error.to_string(),
        }
    }

    /// The last probe failure when this is a readiness timeout
    pub fn last_probe_error(&self) -> Option<&ConnectionError> {
        match self {
            Self::ReadinessTimeout { last_error, .. } => Some(last_error),
            _ => None,
        }
    }
}

/// Driver-level failures. `uri` is always the redacted form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Failed to open connection to {uri}: {reason}")]
    Open { uri: String, reason: String },

    #[error("Ping failed for {uri}: {reason}")]
    Ping { uri: String, reason: String },

    #[error("Query failed against {uri}: {reason}")]
    Query { uri: String, reason: String },

    /// A probe or statement did not finish within its time limit
    #[error("No response within {after:?}")]
    TimedOut { after: Duration },
}

impl ConnectionError {
    pub fn open<E: std::fmt::Display>(uri: impl Into<String>, error: E) -> Self {
        Self::Open {
            uri: uri.into(),
            reason: error.to_string(),
        }
    }

    pub fn ping<E: std::fmt::Display>(uri: impl Into<String>, error: E) -> Self {
        Self::Ping {
            uri: uri.into(),
            reason: error.to_string(),
        }
    }

    pub fn query<E: std::fmt::Display>(uri: impl Into<String>, error: E) -> Self {
        Self::Query {
            uri: uri.into(),
            reason: error.to_string(),
        }
    }
}

/// Schema migration failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A single migration failed; later migrations were not attempted
    #[error("Migration {version} ({description}) failed: {reason}")]
    Failed {
        version: i64,
        description: String,
        reason: String,
    },

    /// A pending migration sorts below an already-applied version
    #[error("Migration {version} is pending but the schema is already at version {current}")]
    OutOfOrder { version: i64, current: i64 },

    /// Two migrations in one set share a version
    #[error("Duplicate migration version {version} in set '{source_name}'")]
    DuplicateVersion { version: i64, source_name: String },

    /// Reading or writing the migration-state table failed
    #[error("Migration state error: {0}")]
    State(String),

    /// No embedded migration set matches the identifier
    #[error("Unknown migration source '{0}'")]
    UnknownSource(String),
}

/// Result type for fixture operations
pub type FixtureResult<T> = Result<T, FixtureError>;
