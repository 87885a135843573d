//! # Schema Migrations
//!
//! Ordered, versioned schema changes embedded per engine, and the runner that
//! applies the pending ones.
//!
//! ## Migration Directory Structure
//!
//! ```text
//! migrations/
//! ├── postgres/   # <version>_<description>.sql
//! ├── mysql/
//! └── mssql/      # T-SQL, one batch per file (no `GO` separators)
//! ```
//!
//! Sets are embedded at compile time with `sqlx::migrate!` and addressed by
//! [`MigrationDir`]. Down migrations are excluded.

pub mod runner;

use sqlx::migrate::Migrator;
use std::fmt;
use std::str::FromStr;

use crate::error::MigrationError;

pub use runner::{apply, current_version, MigrationReport};

static POSTGRES_MIGRATOR: Migrator = sqlx::migrate!("./migrations/postgres");
static MYSQL_MIGRATOR: Migrator = sqlx::migrate!("./migrations/mysql");
static MSSQL_MIGRATOR: Migrator = sqlx::migrate!("./migrations/mssql");

/// One versioned schema change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: i64, description: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            description: description.into(),
            sql: sql.into(),
        }
    }
}

/// Migrations sorted by ascending, unique version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSet {
    name: String,
    migrations: Vec<Migration>,
}

impl MigrationSet {
    /// Build a set, rejecting duplicate versions
    pub fn new(name: impl Into<String>, mut migrations: Vec<Migration>) -> Result<Self, MigrationError> {
        let name = name.into();
        migrations.sort_by_key(|m| m.version);

        if let Some(pair) = migrations.windows(2).find(|w| w[0].version == w[1].version) {
            return Err(MigrationError::DuplicateVersion {
                version: pair[0].version,
                source_name: name,
            });
        }

        Ok(Self { name, migrations })
    }

    /// The embedded set for `dir`
    pub fn embedded(dir: MigrationDir) -> Result<Self, MigrationError> {
        let migrations = dir
            .migrator()
            .iter()
            .filter(|m| !m.migration_type.is_down_migration())
            .map(|m| Migration::new(m.version, m.description.to_string(), m.sql.to_string()))
            .collect();

        Self::new(dir.to_string(), migrations)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Highest version in the set, 0 when empty
    pub fn latest_version(&self) -> i64 {
        self.migrations.last().map_or(0, |m| m.version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.iter()
    }
}

/// Identifier of an embedded migration directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationDir {
    Postgres,
    MySql,
    MsSql,
}

impl MigrationDir {
    fn migrator(self) -> &'static Migrator {
        match self {
            Self::Postgres => &POSTGRES_MIGRATOR,
            Self::MySql => &MYSQL_MIGRATOR,
            Self::MsSql => &MSSQL_MIGRATOR,
        }
    }
}

impl fmt::Display for MigrationDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::MySql => write!(f, "mysql"),
            Self::MsSql => write!(f, "mssql"),
        }
    }
}

impl FromStr for MigrationDir {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "mssql" => Ok(Self::MsSql),
            other => Err(MigrationError::UnknownSource(other.to_string())),
        }
    }
}
