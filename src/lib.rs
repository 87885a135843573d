#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Datastore Test Fixtures
//!
//! Ephemeral datastores for integration tests: start a throwaway database
//! container, wait until it accepts connections, bootstrap its schema and hand
//! back a connection descriptor. The container is torn down exactly once,
//! whether the test finishes, fails or setup itself goes wrong.
//!
//! ## Architecture
//!
//! ```text
//! DatastoreProvisioner
//! ├── container   # ContainerRuntime + BackingInstance (testcontainers)
//! ├── readiness   # exponential backoff bounded by max elapsed time
//! ├── migrations  # ordered, idempotent, embedded with sqlx::migrate!
//! └── descriptor  # scheme://[user:password@]host:port URIs
//! ```
//!
//! ## Module Organization
//!
//! - [`datastore`] - engines, the provisioning pipeline and [`DatastoreTestContainer`]
//! - [`container`] - container runtime boundary and the Docker implementation
//! - [`readiness`] - the readiness gate
//! - [`migrations`] - embedded migration sets and the runner
//! - [`driver`] - open / ping / execute contract over sqlx and tiberius
//! - [`descriptor`] - credentials and connection URIs
//! - [`middleware`] - gRPC request-id tagging
//! - [`config`] - layered fixture configuration
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use datastore_testfixtures::{run_datastore_test_container, DatastoreTestContainer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! datastore_testfixtures::logging::init_test_logging();
//!
//! let mut datastore = run_datastore_test_container("postgres").await?;
//! println!("connect to {}", datastore.connection_uri(false));
//! assert!(datastore.schema_version() > 0);
//!
//! datastore.teardown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Docker-backed tests are ignored by default:
//!
//! ```bash
//! cargo test                  # Unit and fake-runtime integration tests
//! cargo test -- --ignored     # Tests that start real containers
//! ```

pub mod config;
pub mod constants;
pub mod container;
pub mod datastore;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod migrations;
pub mod readiness;
pub mod test_helpers;

pub use config::{ConfigLoader, ConfigurationError, FixtureConfig};
pub use datastore::{
    run_datastore_test_container, DatastoreEngine, DatastoreProvisioner, DatastoreTestContainer,
    Engine, EphemeralDatastore, MsSqlEngine, MySqlEngine, PostgresEngine,
};
pub use descriptor::{ConnectionDescriptor, Credentials};
pub use error::{ConnectionError, FixtureError, FixtureResult, MigrationError};
pub use middleware::{new_streaming_interceptor, new_unary_interceptor, REQUEST_ID_KEY};
pub use readiness::{wait_ready, BackoffPolicy};
