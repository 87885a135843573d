//! # Datastore Engines
//!
//! Per-engine composition: which image to run, how to configure it, where its
//! data lives, how to reach it and which migrations bootstrap it. The
//! provisioning pipeline is engine-agnostic and only talks to
//! [`DatastoreEngine`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::mssql::MsSqlEngine;
use super::mysql::MySqlEngine;
use super::postgres::PostgresEngine;
use crate::config::{ConfigResult, ConfigurationError, ReadinessConfig};
use crate::container::{ImageRef, MountSpec, ReadyMessage};
use crate::descriptor::Credentials;
use crate::driver::Driver;
use crate::error::MigrationError;
use crate::migrations::MigrationSet;

/// Everything the provisioner needs to know about one engine
pub trait DatastoreEngine: Send + Sync + fmt::Debug {
    /// Lowercase engine label, also the image-override key
    fn name(&self) -> &'static str;

    /// Default image
    fn image(&self) -> ImageRef;

    /// Port the engine listens on inside the container
    fn container_port(&self) -> u16;

    /// Container environment configuring the given credentials
    fn container_env(&self, credentials: &Credentials) -> BTreeMap<String, String>;

    /// Data directory inside the container, if the engine has one
    fn data_dir(&self) -> Option<&'static str> {
        None
    }

    /// Mounts for the container; a tmpfs over the data directory when `tmpfs_data_dir`
    fn mounts(&self, tmpfs_data_dir: bool) -> Vec<MountSpec> {
        match self.data_dir() {
            Some(target) if tmpfs_data_dir => vec![MountSpec::Tmpfs {
                target: target.to_string(),
            }],
            _ => Vec::new(),
        }
    }

    /// Log line marking the end of the engine's own initialisation
    fn ready_message(&self) -> Option<ReadyMessage> {
        None
    }

    /// URI scheme
    fn scheme(&self) -> &'static str;

    /// Appended to `host:port` in connection URIs
    fn database_path(&self) -> String {
        String::new()
    }

    /// Fixed fixture credentials
    fn default_credentials(&self) -> Credentials;

    /// Driver used for probing and migrating
    fn driver(&self, readiness: &ReadinessConfig) -> Box<dyn Driver>;

    /// Schema bootstrap applied after the instance is ready
    fn migrations(&self) -> Result<MigrationSet, MigrationError>;
}

/// Built-in engines, selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Postgres,
    MySql,
    MsSql,
}

impl Engine {
    /// Resolve an engine name, case-insensitively
    ///
    /// Accepts `postgres`, `postgresql`, `mysql`, `mssql` and `sqlserver`.
    pub fn from_name(name: &str) -> ConfigResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "mssql" | "sqlserver" => Ok(Self::MsSql),
            _ => Err(ConfigurationError::UnknownEngine(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::MsSql => "mssql",
        }
    }

    /// The engine's composition
    pub fn definition(&self) -> Box<dyn DatastoreEngine> {
        match self {
            Self::Postgres => Box::new(PostgresEngine),
            Self::MySql => Box::new(MySqlEngine),
            Self::MsSql => Box::new(MsSqlEngine),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_names() {
        assert_eq!(Engine::from_name("postgres").unwrap(), Engine::Postgres);
        assert_eq!(Engine::from_name("PostgreSQL").unwrap(), Engine::Postgres);
        assert_eq!("mysql".parse::<Engine>().unwrap(), Engine::MySql);
        assert_eq!(Engine::from_name("mssql").unwrap(), Engine::MsSql);
        assert_eq!(Engine::from_name("SQLServer").unwrap(), Engine::MsSql);
        assert!(matches!(
            Engine::from_name("cassandra"),
            Err(ConfigurationError::UnknownEngine(name)) if name == "cassandra"
        ));
    }

    #[test]
    fn test_definition_matches_name() {
        for engine in [Engine::Postgres, Engine::MySql, Engine::MsSql] {
            assert_eq!(engine.definition().name(), engine.name());
            assert_eq!(engine.to_string(), engine.name());
        }
    }

    #[test]
    fn test_tmpfs_mount_follows_flag() {
        let engine = Engine::Postgres.definition();
        assert_eq!(engine.mounts(true).len(), 1);
        assert!(engine.mounts(false).is_empty());
    }
}
