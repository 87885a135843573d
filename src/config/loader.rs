//! Configuration Loader
//!
//! Layers, lowest precedence first:
//! 1. Serde defaults on [`FixtureConfig`]
//! 2. Optional YAML file (`FIXTURES_CONFIG_PATH`, else `config/fixtures.yaml` when present)
//! 3. `FIXTURES__*` environment variables

use super::error::{ConfigResult, ConfigurationError};
use super::FixtureConfig;
use crate::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE, ENV_PREFIX, ENV_SEPARATOR};
use config::{Config, Environment, File, FileFormat, Map};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`FixtureConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the default file location and the process environment
    pub fn load() -> ConfigResult<FixtureConfig> {
        let path = Self::config_path();
        Self::load_from(path.as_deref(), None)
    }

    /// Load from an explicit file and, optionally, an explicit environment map
    ///
    /// Passing `Some(env)` replaces the process environment, which keeps tests
    /// independent of each other.
    pub fn load_from(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> ConfigResult<FixtureConfig> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading fixture configuration file");
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Yaml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let config: FixtureConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize::<FixtureConfig>())
            .map_err(ConfigurationError::load_error)?;

        config.validate()?;

        debug!(
            engine = %config.engine.name,
            max_elapsed_ms = config.readiness.max_elapsed_ms,
            credentials = ?config.credentials.mode,
            "Fixture configuration loaded"
        );

        Ok(config)
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.is_file().then_some(default)
    }
}
