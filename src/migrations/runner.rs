//! # Migration Runner
//!
//! Applies the pending migrations of a [`MigrationSet`] strictly in ascending
//! version order, tracking applied versions in a state table inside the
//! instance itself.
//!
//! - Re-running on a migrated instance applies nothing and reports the same version
//! - The first failing migration aborts the run; later ones are not attempted
//! - A pending version below the current schema version is rejected, never reordered
//! - A migration and its state row are written in one transaction where the
//!   engine supports it, so a failed run never leaves an unrecorded change

use std::collections::BTreeSet;
use tracing::{debug, info};

use super::{Migration, MigrationSet};
use crate::constants::MIGRATION_STATE_TABLE;
use crate::driver::Connection;
use crate::error::{ConnectionError, MigrationError};

/// Outcome of one [`apply`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Schema version after the run (highest recorded version, 0 if none)
    pub version: i64,
    /// Versions applied by this run, in order
    pub applied: Vec<i64>,
    /// Migrations already recorded before this run
    pub skipped: usize,
}

/// Apply every pending migration in `set`
pub async fn apply(
    conn: &mut dyn Connection,
    set: &MigrationSet,
) -> Result<MigrationReport, MigrationError> {
    ensure_state_table(conn).await?;

    let recorded: BTreeSet<i64> = applied_versions(conn).await?.into_iter().collect();
    let current = recorded.last().copied().unwrap_or(0);
    let pending: Vec<&Migration> = set
        .iter()
        .filter(|m| !recorded.contains(&m.version))
        .collect();

    if let Some(first) = pending.first() {
        if first.version < current {
            return Err(MigrationError::OutOfOrder {
                version: first.version,
                current,
            });
        }
    }

    debug!(
        source = %set.name(),
        current,
        pending = pending.len(),
        "Applying migrations"
    );

    let mut applied = Vec::with_capacity(pending.len());
    for migration in pending {
        let record = record_statement(migration);
        conn.execute_in_transaction(&[&migration.sql, &record])
            .await
            .map_err(|e| MigrationError::Failed {
                version: migration.version,
                description: migration.description.clone(),
                reason: e.to_string(),
            })?;

        info!(
            source = %set.name(),
            version = migration.version,
            description = %migration.description,
            "Migration applied"
        );
        applied.push(migration.version);
    }

    let version = applied_versions(conn)
        .await?
        .into_iter()
        .max()
        .unwrap_or(0);
    Ok(MigrationReport {
        version,
        skipped: set.len() - applied.len(),
        applied,
    })
}

/// Highest recorded version, 0 before any migration ran
pub async fn current_version(conn: &mut dyn Connection) -> Result<i64, MigrationError> {
    ensure_state_table(conn).await?;
    Ok(applied_versions(conn).await?.into_iter().max().unwrap_or(0))
}

async fn ensure_state_table(conn: &mut dyn Connection) -> Result<(), MigrationError> {
    let sql = conn.state_table_ddl(MIGRATION_STATE_TABLE);
    conn.execute(&sql).await.map_err(state_error)
}

async fn applied_versions(conn: &mut dyn Connection) -> Result<Vec<i64>, MigrationError> {
    conn.fetch_versions(&format!(
        "SELECT version FROM {MIGRATION_STATE_TABLE} ORDER BY version"
    ))
    .await
    .map_err(state_error)
}

fn record_statement(migration: &Migration) -> String {
    format!(
        "INSERT INTO {MIGRATION_STATE_TABLE} (version, description) VALUES ({}, '{}')",
        migration.version,
        sanitize_description(&migration.description)
    )
}

/// Descriptions come from file names; keep only characters that need no quoting
fn sanitize_description(description: &str) -> String {
    description
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.'))
        .take(255)
        .collect()
}

fn state_error(error: ConnectionError) -> MigrationError {
    MigrationError::State(error.to_string())
}
