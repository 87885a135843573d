//! MySQL engine: `mysql:8` configured for root access to the fixture database.

use std::collections::BTreeMap;

use super::DatastoreEngine;
use crate::config::ReadinessConfig;
use crate::constants::FIXTURE_DATABASE;
use crate::container::{ImageRef, ReadyMessage};
use crate::descriptor::Credentials;
use crate::driver::{Driver, MySqlDriver};
use crate::error::MigrationError;
use crate::migrations::{MigrationDir, MigrationSet};

const IMAGE_NAME: &str = "mysql";
const IMAGE_TAG: &str = "8";
const PORT: u16 = 3306;
const USERNAME: &str = "root";
const PASSWORD: &str = "Fx_mysqlFixture2024";

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlEngine;

impl DatastoreEngine for MySqlEngine {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn image(&self) -> ImageRef {
        ImageRef::new(IMAGE_NAME, IMAGE_TAG)
    }

    fn container_port(&self) -> u16 {
        PORT
    }

    // Only root is supported; MYSQL_USER cannot be "root".
    fn container_env(&self, credentials: &Credentials) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "MYSQL_ROOT_PASSWORD".to_string(),
                credentials.password().to_string(),
            ),
            ("MYSQL_DATABASE".to_string(), FIXTURE_DATABASE.to_string()),
        ])
    }

    fn data_dir(&self) -> Option<&'static str> {
        Some("/var/lib/mysql")
    }

    fn ready_message(&self) -> Option<ReadyMessage> {
        Some(ReadyMessage::stderr(
            "X Plugin ready for connections. Bind-address: '::' port: 33060",
        ))
    }

    fn scheme(&self) -> &'static str {
        "mysql"
    }

    fn database_path(&self) -> String {
        format!("/{FIXTURE_DATABASE}")
    }

    fn default_credentials(&self) -> Credentials {
        Credentials::new(USERNAME, PASSWORD)
    }

    fn driver(&self, readiness: &ReadinessConfig) -> Box<dyn Driver> {
        Box::new(MySqlDriver::new(readiness.probe_timeout()))
    }

    fn migrations(&self) -> Result<MigrationSet, MigrationError> {
        MigrationSet::embedded(MigrationDir::MySql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_env_sets_root_password() {
        let env = MySqlEngine.container_env(&Credentials::new("root", "pw"));
        assert_eq!(env["MYSQL_ROOT_PASSWORD"], "pw");
        assert_eq!(env["MYSQL_DATABASE"], "defaultdb");
        assert!(!env.contains_key("MYSQL_USER"));
    }

    #[test]
    fn test_default_credentials_are_root() {
        assert_eq!(MySqlEngine.default_credentials().username(), "root");
        assert_eq!(MySqlEngine.database_path(), "/defaultdb");
    }
}
