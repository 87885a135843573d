//! # Ephemeral Datastores
//!
//! Composes the container lifecycle, the readiness gate, the migration runner
//! and connection descriptors into one provisioning call:
//!
//! ```text
//! start container ─► wait until ping succeeds ─► apply migrations ─► descriptor
//!        │                     │                        │
//!        └─────────────── teardown on failure ◄─────────┘
//! ```
//!
//! The caller gets back an [`EphemeralDatastore`] only once every step has
//! succeeded. On any failure after the container started, the container is
//! torn down before the setup error is returned.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use datastore_testfixtures::datastore::{run_datastore_test_container, DatastoreTestContainer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut datastore = run_datastore_test_container("postgres").await?;
//! let uri = datastore.connection_uri(true);
//! // ... run the test against `uri` ...
//! datastore.teardown().await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod mssql;
pub mod mysql;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::config::{ConfigLoader, CredentialsMode, FixtureConfig};
use crate::container::{
    BackingInstance, ContainerRuntime, DockerRuntime, ImageRef, StartRequest,
};
use crate::descriptor::{ConnectionDescriptor, Credentials};
use crate::driver::Connection;
use crate::error::FixtureResult;
use crate::migrations::{self, MigrationReport, MigrationSet};
use crate::readiness::{wait_ready, BackoffPolicy};

pub use engine::{DatastoreEngine, Engine};
pub use mssql::MsSqlEngine;
pub use mysql::MySqlEngine;
pub use postgres::PostgresEngine;

/// A provisioned, reachable and migrated datastore
#[async_trait]
pub trait DatastoreTestContainer: Send + Sync {
    /// Connection URI, with `username:password@` only when `include_credentials`
    fn connection_uri(&self, include_credentials: bool) -> String;

    fn username(&self) -> &str;

    fn password(&self) -> &str;

    /// Highest applied migration version
    fn schema_version(&self) -> i64;

    fn engine_name(&self) -> &str;

    /// Terminate the backing instance; later calls are no-ops
    async fn teardown(&mut self) -> FixtureResult<()>;
}

/// Datastore handed out by [`DatastoreProvisioner::provision`]
///
/// Dropping it without calling `teardown` still releases the container.
#[derive(Debug)]
pub struct EphemeralDatastore {
    instance: BackingInstance,
    descriptor: ConnectionDescriptor,
    credentials: Credentials,
    migrations: MigrationReport,
}

impl EphemeralDatastore {
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn container_id(&self) -> &str {
        self.instance.id()
    }

    /// Migration outcome of the provisioning run
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migrations
    }

    pub fn is_terminated(&self) -> bool {
        self.instance.is_terminated()
    }
}

#[async_trait]
impl DatastoreTestContainer for EphemeralDatastore {
    fn connection_uri(&self, include_credentials: bool) -> String {
        self.descriptor
            .build_uri(&self.credentials, include_credentials)
    }

    fn username(&self) -> &str {
        self.credentials.username()
    }

    fn password(&self) -> &str {
        self.credentials.password()
    }

    fn schema_version(&self) -> i64 {
        self.migrations.version
    }

    fn engine_name(&self) -> &str {
        self.instance.engine()
    }

    async fn teardown(&mut self) -> FixtureResult<()> {
        self.instance.teardown().await
    }
}

/// Runs the provisioning pipeline against a container runtime
#[derive(Clone)]
pub struct DatastoreProvisioner {
    runtime: Arc<dyn ContainerRuntime>,
    config: FixtureConfig,
}

impl std::fmt::Debug for DatastoreProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreProvisioner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DatastoreProvisioner {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: FixtureConfig) -> Self {
        Self { runtime, config }
    }

    /// Provisioner backed by the local Docker daemon
    pub fn docker(config: FixtureConfig) -> Self {
        Self::new(Arc::new(DockerRuntime::new()), config)
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Provision the engine named by `engine.name` in the configuration
    pub async fn provision_default(&self) -> FixtureResult<EphemeralDatastore> {
        let engine = Engine::from_name(&self.config.engine.name)?;
        self.provision(engine.definition().as_ref()).await
    }

    /// Start, gate, migrate and describe one instance of `engine`
    #[instrument(skip_all, fields(engine = engine.name()))]
    pub async fn provision(&self, engine: &dyn DatastoreEngine) -> FixtureResult<EphemeralDatastore> {
        let started = Instant::now();
        // an invalid migration set fails before any container starts
        let migration_set = engine.migrations()?;
        let credentials = self.credentials_for(engine);

        let mut instance = BackingInstance::provision(
            self.runtime.as_ref(),
            self.start_request(engine, &credentials),
            self.config.container.host_override.as_deref(),
        )
        .await?;

        let descriptor = ConnectionDescriptor::new(engine.scheme(), instance.host(), instance.port())
            .with_path(engine.database_path());

        match self
            .bootstrap(engine, &descriptor, &credentials, &migration_set)
            .await
        {
            Ok(report) => {
                info!(
                    container_id = %instance.id(),
                    uri = %descriptor.redacted_uri(),
                    schema_version = report.version,
                    applied = report.applied.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Datastore ready"
                );
                Ok(EphemeralDatastore {
                    instance,
                    descriptor,
                    credentials,
                    migrations: report,
                })
            }
            Err(setup_error) => {
                error!(
                    container_id = %instance.id(),
                    error = %setup_error,
                    "Datastore setup failed, tearing down"
                );
                if let Err(teardown_error) = instance.teardown().await {
                    error!(
                        container_id = %instance.id(),
                        error = %teardown_error,
                        "Teardown after failed setup also failed"
                    );
                }
                Err(setup_error)
            }
        }
    }

    fn credentials_for(&self, engine: &dyn DatastoreEngine) -> Credentials {
        let defaults = engine.default_credentials();
        match self.config.credentials.mode {
            CredentialsMode::Fixed => defaults,
            CredentialsMode::Generated => Credentials::generated(defaults.username()),
        }
    }

    fn start_request(&self, engine: &dyn DatastoreEngine, credentials: &Credentials) -> StartRequest {
        let image = self
            .config
            .images
            .for_engine(engine.name())
            .map(ImageRef::parse)
            .unwrap_or_else(|| engine.image());

        StartRequest {
            engine: engine.name().to_string(),
            image,
            env: engine.container_env(credentials),
            mounts: engine.mounts(self.config.container.tmpfs_data_dir),
            exposed_port: engine.container_port(),
            ready_message: engine.ready_message(),
            startup_timeout: self.config.container.startup_timeout(),
        }
    }

    async fn bootstrap(
        &self,
        engine: &dyn DatastoreEngine,
        descriptor: &ConnectionDescriptor,
        credentials: &Credentials,
        migration_set: &MigrationSet,
    ) -> FixtureResult<MigrationReport> {
        let driver = engine.driver(&self.config.readiness);
        let mut conn = driver
            .open(&descriptor.build_uri(credentials, true))
            .await?;

        let policy = BackoffPolicy::from(&self.config.readiness);
        let result = ready_and_migrate(&policy, conn.as_mut(), migration_set).await;
        conn.close().await;
        result
    }
}

async fn ready_and_migrate(
    policy: &BackoffPolicy,
    conn: &mut dyn Connection,
    migration_set: &MigrationSet,
) -> FixtureResult<MigrationReport> {
    let probe: &dyn Connection = &*conn;
    wait_ready(policy, move || probe.ping()).await?;

    Ok(migrations::apply(conn, migration_set).await?)
}

/// Provision `engine_name` on Docker with the loaded fixture configuration
pub async fn run_datastore_test_container(engine_name: &str) -> FixtureResult<EphemeralDatastore> {
    let engine = Engine::from_name(engine_name)?;
    let config = ConfigLoader::load()?;
    DatastoreProvisioner::docker(config)
        .provision(engine.definition().as_ref())
        .await
}
