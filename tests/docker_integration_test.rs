//! # Docker Integration Tests
//!
//! Provision real PostgreSQL, MySQL and SQL Server containers and check the bootstrapped
//! schema. Ignored by default; run with `cargo test -- --ignored` when a
//! Docker daemon is available.

use anyhow::Result;
use datastore_testfixtures::config::FixtureConfig;
use datastore_testfixtures::constants::MIGRATION_STATE_TABLE;
use datastore_testfixtures::driver::{Connection, Driver, MsSqlDriver};
use datastore_testfixtures::migrations::current_version;
use datastore_testfixtures::logging::init_test_logging;
use datastore_testfixtures::migrations::{MigrationDir, MigrationSet};
use datastore_testfixtures::{
    run_datastore_test_container, DatastoreProvisioner, DatastoreTestContainer, Engine,
};

#[tokio::test]
#[ignore] // Only run when Docker is available
async fn test_postgres_datastore_end_to_end() -> Result<()> {
    init_test_logging();

    let mut datastore = run_datastore_test_container("postgres").await?;
    let uri = datastore.connection_uri(true);
    assert!(uri.starts_with("postgres://postgres:"));
    assert!(!datastore.connection_uri(false).contains('@'));

    let expected = MigrationSet::embedded(MigrationDir::Postgres)?.latest_version();
    assert_eq!(datastore.schema_version(), expected);

    let pool = sqlx::PgPool::connect(&uri).await?;
    let recorded: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {MIGRATION_STATE_TABLE}"))
            .fetch_one(&pool)
            .await?;
    assert_eq!(recorded, expected);
    let tuples: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tuple")
        .fetch_one(&pool)
        .await?;
    assert_eq!(tuples, 0);
    pool.close().await;

    datastore.teardown().await?;
    datastore.teardown().await?;
    Ok(())
}

#[tokio::test]
#[ignore] // Only run when Docker is available
async fn test_mysql_datastore_end_to_end() -> Result<()> {
    init_test_logging();

    let provisioner = DatastoreProvisioner::docker(FixtureConfig::default());
    let mut datastore = provisioner
        .provision(Engine::MySql.definition().as_ref())
        .await?;
    assert_eq!(datastore.username(), "root");

    let pool = sqlx::MySqlPool::connect(&datastore.connection_uri(true)).await?;
    let version: i64 =
        sqlx::query_scalar(&format!("SELECT MAX(version) FROM {MIGRATION_STATE_TABLE}"))
            .fetch_one(&pool)
            .await?;
    assert_eq!(version, datastore.schema_version());
    pool.close().await;

    datastore.teardown().await?;
    Ok(())
}

#[tokio::test]
#[ignore] // Only run when Docker is available
async fn test_mssql_datastore_end_to_end() -> Result<()> {
    init_test_logging();

    let mut datastore = run_datastore_test_container("mssql").await?;
    let uri = datastore.connection_uri(true);
    assert!(uri.starts_with("sqlserver://sa:pKC8mMA_qu5SLeaG@"));
    assert_eq!(datastore.username(), "sa");

    let expected = MigrationSet::embedded(MigrationDir::MsSql)?.latest_version();
    assert_eq!(datastore.schema_version(), expected);

    // a second connection sees the same recorded version
    let mut conn = MsSqlDriver::new(std::time::Duration::from_secs(5))
        .open(&uri)
        .await?;
    conn.ping().await?;
    assert_eq!(current_version(conn.as_mut()).await?, expected);
    conn.close().await;

    datastore.teardown().await?;
    Ok(())
}
