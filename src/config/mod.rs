//! # Fixture Configuration
//!
//! Tunables for provisioning: readiness budget, container options, credential
//! policy, default engine and image overrides. Every field has a default so an
//! empty configuration is valid.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use datastore_testfixtures::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?;
//! let budget = config.readiness.max_elapsed();
//! # Ok(())
//! # }
//! ```
//!
//! Environment overrides use the `FIXTURES` prefix with `__` between levels:
//!
//! ```bash
//! FIXTURES__READINESS__MAX_ELAPSED_MS=30000 cargo test
//! FIXTURES__CREDENTIALS__MODE=generated cargo test
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

use crate::constants::{
    DEFAULT_ENGINE, DEFAULT_INITIAL_INTERVAL_MS, DEFAULT_MAX_ELAPSED_MS, DEFAULT_MAX_INTERVAL_MS,
    DEFAULT_MULTIPLIER, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_STARTUP_TIMEOUT_SECS,
};

/// Root fixture configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Readiness gate backoff policy
    pub readiness: ReadinessConfig,

    /// Container start options
    pub container: ContainerConfig,

    /// Credential policy
    pub credentials: CredentialsConfig,

    /// Engine used by `provision_default`
    pub engine: EngineSelection,

    /// Per-engine image overrides
    pub images: ImageOverrides,
}

impl FixtureConfig {
    /// Validate cross-field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        self.readiness.validate()?;
        if self.container.startup_timeout_secs == 0 {
            return Err(ConfigurationError::invalid_value(
                "container.startup_timeout_secs",
                0,
                "must be greater than zero",
            ));
        }
        crate::datastore::Engine::from_name(&self.engine.name)?;
        Ok(())
    }
}

/// Exponential backoff policy for the readiness gate
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    pub max_elapsed_ms: u64,
    /// Upper bound on a single probe's connection attempt
    pub probe_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: DEFAULT_INITIAL_INTERVAL_MS,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            max_elapsed_ms: DEFAULT_MAX_ELAPSED_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

impl ReadinessConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.initial_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "readiness.initial_interval_ms",
                0,
                "must be greater than zero",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "readiness.multiplier",
                self.multiplier,
                "must be a finite value >= 1.0",
            ));
        }
        if self.max_interval_ms < self.initial_interval_ms {
            return Err(ConfigurationError::invalid_value(
                "readiness.max_interval_ms",
                self.max_interval_ms,
                "must not be smaller than readiness.initial_interval_ms",
            ));
        }
        if self.max_elapsed_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "readiness.max_elapsed_ms",
                0,
                "must be greater than zero",
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "readiness.probe_timeout_ms",
                0,
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Container start options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Upper bound on the runtime's own start/wait phase
    pub startup_timeout_secs: u64,

    /// Back the engine's data directory with tmpfs
    pub tmpfs_data_dir: bool,

    /// Replaces the host reported by the runtime (e.g. when tests run inside a container)
    pub host_override: Option<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            tmpfs_data_dir: true,
            host_override: None,
        }
    }
}

impl ContainerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

/// How provisioning picks credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsMode {
    /// The engine's fixed fixture credentials, identical across runs
    #[default]
    Fixed,
    /// A fresh password per provision call
    Generated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub mode: CredentialsMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSelection {
    pub name: String,
}

impl Default for EngineSelection {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENGINE.to_string(),
        }
    }
}

/// Image references replacing the engine defaults, `name:tag`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageOverrides {
    pub postgres: Option<String>,
    pub mysql: Option<String>,
    pub mssql: Option<String>,
}

impl ImageOverrides {
    /// Override for the named engine, if any
    pub fn for_engine(&self, engine: &str) -> Option<&str> {
        match engine {
            "postgres" => self.postgres.as_deref(),
            "mysql" => self.mysql.as_deref(),
            "mssql" => self.mssql.as_deref(),
            _ => None,
        }
    }
}
