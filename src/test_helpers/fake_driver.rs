//! # Fake Driver
//!
//! In-memory [`Driver`] emulating just enough of a database for the readiness
//! gate and the migration runner: scripted ping failures, the migration-state
//! table, created tables, transactions with rollback, and failure injection on
//! statements containing a marker.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::constants::MIGRATION_STATE_TABLE;
use crate::driver::{Connection, Driver};
use crate::descriptor::redact_uri;
use crate::error::ConnectionError;

/// Shared state behind every connection opened by one [`FakeDriver`]
#[derive(Debug, Default)]
pub struct FakeDatabase {
    /// Pings that fail before the first success; `u32::MAX` never succeeds
    pub ping_failures: u32,
    pub pings: u32,
    pub state_table: bool,
    /// Recorded migration versions and descriptions
    pub applied: BTreeMap<i64, String>,
    /// Tables created by `CREATE TABLE` statements outside the state table
    pub tables: BTreeSet<String>,
    /// Transactions rolled back after a failing statement
    pub rollbacks: u32,
    /// Every statement passed to `execute`, in order
    pub executed: Vec<String>,
    /// `execute` fails for statements containing this marker
    pub fail_on: Option<String>,
    /// URIs passed to `open`
    pub opened: Vec<String>,
    pub closed: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDriver {
    database: Arc<Mutex<FakeDatabase>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver whose first `failures` pings are refused
    pub fn unreachable_for(failures: u32) -> Self {
        let driver = Self::new();
        driver.database.lock().ping_failures = failures;
        driver
    }

    /// Driver that never answers a ping
    pub fn never_ready() -> Self {
        Self::unreachable_for(u32::MAX)
    }

    /// Fail any statement containing `marker`
    pub fn fail_statements_containing(self, marker: impl Into<String>) -> Self {
        self.database.lock().fail_on = Some(marker.into());
        self
    }

    pub fn database(&self) -> Arc<Mutex<FakeDatabase>> {
        Arc::clone(&self.database)
    }
}

#[async_trait]
impl Driver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn open(&self, uri: &str) -> Result<Box<dyn Connection>, ConnectionError> {
        self.database.lock().opened.push(uri.to_string());
        Ok(Box::new(FakeConnection {
            redacted: redact_uri(uri),
            database: Arc::clone(&self.database),
        }))
    }
}

struct FakeConnection {
    redacted: String,
    database: Arc<Mutex<FakeDatabase>>,
}

impl FakeConnection {
    fn run(&self, database: &mut FakeDatabase, sql: &str) -> Result<(), ConnectionError> {
        database.executed.push(sql.to_string());

        if let Some(marker) = &database.fail_on {
            if sql.contains(marker.as_str()) {
                return Err(ConnectionError::query(
                    self.redacted.clone(),
                    format!("syntax error near '{marker}'"),
                ));
            }
        }

        let state_insert = format!("INSERT INTO {MIGRATION_STATE_TABLE}");
        if sql.contains(&format!("CREATE TABLE IF NOT EXISTS {MIGRATION_STATE_TABLE}")) {
            database.state_table = true;
        } else if sql.starts_with(&state_insert) {
            if !database.state_table {
                return Err(ConnectionError::query(
                    self.redacted.clone(),
                    format!("relation \"{MIGRATION_STATE_TABLE}\" does not exist"),
                ));
            }
            Self::record_version(database, sql).ok_or_else(|| {
                ConnectionError::query(self.redacted.clone(), "malformed state insert")
            })?;
        } else if let Some(table) = created_table(sql) {
            if !database.tables.insert(table.to_string()) {
                return Err(ConnectionError::query(
                    self.redacted.clone(),
                    format!("relation \"{table}\" already exists"),
                ));
            }
        }
        Ok(())
    }

    fn record_version(database: &mut FakeDatabase, sql: &str) -> Option<()> {
        let values = sql.split_once("VALUES (")?.1;
        let (version, rest) = values.split_once(',')?;
        let description = rest.trim().trim_end_matches(')').trim().trim_matches('\'');
        database
            .applied
            .insert(version.trim().parse().ok()?, description.to_string());
        Some(())
    }
}

fn created_table(sql: &str) -> Option<&str> {
    sql.strip_prefix("CREATE TABLE ")?
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl Connection for FakeConnection {
    async fn ping(&self) -> Result<(), ConnectionError> {
        let mut database = self.database.lock();
        database.pings += 1;
        if database.ping_failures > 0 {
            if database.ping_failures != u32::MAX {
                database.ping_failures -= 1;
            }
            return Err(ConnectionError::ping(
                self.redacted.clone(),
                "connection refused",
            ));
        }
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), ConnectionError> {
        let mut database = self.database.lock();
        self.run(&mut database, sql)
    }

    async fn execute_in_transaction(&mut self, scripts: &[&str]) -> Result<(), ConnectionError> {
        let mut database = self.database.lock();
        let state_table = database.state_table;
        let applied = database.applied.clone();
        let tables = database.tables.clone();

        for sql in scripts {
            if let Err(error) = self.run(&mut database, sql) {
                database.state_table = state_table;
                database.applied = applied;
                database.tables = tables;
                database.rollbacks += 1;
                return Err(error);
            }
        }
        Ok(())
    }

    async fn fetch_versions(&mut self, _sql: &str) -> Result<Vec<i64>, ConnectionError> {
        let database = self.database.lock();
        if !database.state_table {
            return Err(ConnectionError::query(
                self.redacted.clone(),
                format!("relation \"{MIGRATION_STATE_TABLE}\" does not exist"),
            ));
        }
        Ok(database.applied.keys().copied().collect())
    }

    async fn close(self: Box<Self>) {
        self.database.lock().closed += 1;
    }
}
