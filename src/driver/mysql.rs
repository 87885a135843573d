//! MySQL driver backed by a lazy `MySqlPool`.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Connection as _;
use std::time::Duration;
use tracing::debug;

use super::{Connection, Driver};
use crate::descriptor::redact_uri;
use crate::error::ConnectionError;

const MAX_CONNECTIONS: u32 = 2;

#[derive(Debug, Clone)]
pub struct MySqlDriver {
    acquire_timeout: Duration,
}

impl MySqlDriver {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self { acquire_timeout }
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn open(&self, uri: &str) -> Result<Box<dyn Connection>, ConnectionError> {
        let redacted = redact_uri(uri);
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(self.acquire_timeout)
            .connect_lazy(uri)
            .map_err(|e| ConnectionError::open(redacted.clone(), e))?;

        debug!(uri = %redacted, "Opened lazy MySQL pool");
        Ok(Box::new(MySqlConnection { pool, redacted }))
    }
}

struct MySqlConnection {
    pool: MySqlPool,
    redacted: String,
}

#[async_trait]
impl Connection for MySqlConnection {
    async fn ping(&self) -> Result<(), ConnectionError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ConnectionError::ping(self.redacted.clone(), e))?;
        conn.ping()
            .await
            .map_err(|e| ConnectionError::ping(self.redacted.clone(), e))
    }

    async fn execute(&mut self, sql: &str) -> Result<(), ConnectionError> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| ConnectionError::query(self.redacted.clone(), e))
    }

    /// MySQL commits DDL implicitly, so only data statements roll back here
    async fn execute_in_transaction(&mut self, scripts: &[&str]) -> Result<(), ConnectionError> {
        let query_error = |e: sqlx::Error| ConnectionError::query(self.redacted.clone(), e);
        let mut tx = self.pool.begin().await.map_err(query_error)?;
        for &sql in scripts {
            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(sql))
                .await
                .map_err(query_error)?;
        }
        tx.commit().await.map_err(query_error)
    }

    async fn fetch_versions(&mut self, sql: &str) -> Result<Vec<i64>, ConnectionError> {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ConnectionError::query(self.redacted.clone(), e))
    }

    async fn close(self: Box<Self>) {
        self.pool.close().await;
    }
}
