//! # Database Drivers
//!
//! The open / ping / execute / close contract consumed by the readiness gate
//! and the migration runner. Any driver satisfying it works; the bundled ones
//! are sqlx pools plus a tiberius client for SQL Server.
//!
//! Connections are opened lazily, so `open` only fails on a malformed URI.
//! Reachability is decided by `ping`.

pub mod mssql;
pub mod mysql;
pub mod postgres;

use async_trait::async_trait;

use crate::error::ConnectionError;

pub use mssql::MsSqlDriver;
pub use mysql::MySqlDriver;
pub use postgres::PostgresDriver;

/// Opens connections to one engine
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn open(&self, uri: &str) -> Result<Box<dyn Connection>, ConnectionError>;
}

/// An open connection (or small pool) to one instance
#[async_trait]
pub trait Connection: Send + Sync {
    /// Cheap round trip proving the server accepts requests
    async fn ping(&self) -> Result<(), ConnectionError>;

    /// Run a script of one or more statements
    async fn execute(&mut self, sql: &str) -> Result<(), ConnectionError>;

    /// Run `scripts` so that either all of them take effect or none do
    ///
    /// The default runs them one by one, for engines without transactions.
    async fn execute_in_transaction(&mut self, scripts: &[&str]) -> Result<(), ConnectionError> {
        for sql in scripts {
            self.execute(sql).await?;
        }
        Ok(())
    }

    /// Statement creating the migration-state table when it is missing
    fn state_table_ddl(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             version BIGINT NOT NULL PRIMARY KEY, \
             description VARCHAR(255) NOT NULL, \
             applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        )
    }

    /// Run a query whose first column is a 64-bit version number
    async fn fetch_versions(&mut self, sql: &str) -> Result<Vec<i64>, ConnectionError>;

    async fn close(self: Box<Self>);
}
