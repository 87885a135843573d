//! PostgreSQL engine: `postgres:17-alpine` with the data directory on tmpfs.

use std::collections::BTreeMap;

use super::DatastoreEngine;
use crate::config::ReadinessConfig;
use crate::constants::FIXTURE_DATABASE;
use crate::container::{ImageRef, ReadyMessage};
use crate::descriptor::Credentials;
use crate::driver::{Driver, PostgresDriver};
use crate::error::MigrationError;
use crate::migrations::{MigrationDir, MigrationSet};

const IMAGE_NAME: &str = "postgres";
const IMAGE_TAG: &str = "17-alpine";
const PORT: u16 = 5432;
const USERNAME: &str = "postgres";
const PASSWORD: &str = "Fx_pgFixture2024";

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresEngine;

impl DatastoreEngine for PostgresEngine {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn image(&self) -> ImageRef {
        ImageRef::new(IMAGE_NAME, IMAGE_TAG)
    }

    fn container_port(&self) -> u16 {
        PORT
    }

    fn container_env(&self, credentials: &Credentials) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("POSTGRES_USER".to_string(), credentials.username().to_string()),
            (
                "POSTGRES_PASSWORD".to_string(),
                credentials.password().to_string(),
            ),
            ("POSTGRES_DB".to_string(), FIXTURE_DATABASE.to_string()),
        ])
    }

    fn data_dir(&self) -> Option<&'static str> {
        Some("/var/lib/postgresql/data")
    }

    // The entrypoint restarts the server once after init; the runtime only
    // waits for the first announcement and the readiness gate covers the rest.
    fn ready_message(&self) -> Option<ReadyMessage> {
        Some(ReadyMessage::stderr(
            "database system is ready to accept connections",
        ))
    }

    fn scheme(&self) -> &'static str {
        "postgres"
    }

    fn database_path(&self) -> String {
        format!("/{FIXTURE_DATABASE}?sslmode=disable")
    }

    fn default_credentials(&self) -> Credentials {
        Credentials::new(USERNAME, PASSWORD)
    }

    fn driver(&self, readiness: &ReadinessConfig) -> Box<dyn Driver> {
        Box::new(PostgresDriver::new(readiness.probe_timeout()))
    }

    fn migrations(&self) -> Result<MigrationSet, MigrationError> {
        MigrationSet::embedded(MigrationDir::Postgres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_env_carries_credentials() {
        let env = PostgresEngine.container_env(&Credentials::new("fixture", "pw"));
        assert_eq!(env["POSTGRES_USER"], "fixture");
        assert_eq!(env["POSTGRES_PASSWORD"], "pw");
        assert_eq!(env["POSTGRES_DB"], "defaultdb");
    }

    #[test]
    fn test_database_path_disables_tls() {
        assert_eq!(PostgresEngine.database_path(), "/defaultdb?sslmode=disable");
        assert_eq!(PostgresEngine.image().to_string(), "postgres:17-alpine");
    }
}
