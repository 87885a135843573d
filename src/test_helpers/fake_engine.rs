//! # Fake Engine
//!
//! [`DatastoreEngine`] wired to a [`FakeDriver`] and an in-memory migration
//! set, so provisioning can run against a [`super::FakeRuntime`].

use std::collections::BTreeMap;

use super::FakeDriver;
use crate::config::ReadinessConfig;
use crate::container::{ImageRef, ReadyMessage};
use crate::datastore::DatastoreEngine;
use crate::descriptor::Credentials;
use crate::driver::Driver;
use crate::error::MigrationError;
use crate::migrations::{Migration, MigrationSet};

#[derive(Debug, Clone)]
pub struct FakeEngine {
    driver: FakeDriver,
    migrations: Vec<Migration>,
    credentials: Credentials,
}

impl FakeEngine {
    /// Engine with a three-step relationship-store schema
    pub fn new(driver: FakeDriver) -> Self {
        Self {
            driver,
            migrations: vec![
                Migration::new(1, "initialize schema", "CREATE TABLE tuple (store TEXT)"),
                Migration::new(2, "add changelog", "CREATE TABLE changelog (store TEXT)"),
                Migration::new(3, "add assertions", "CREATE TABLE assertion (store TEXT)"),
            ],
            credentials: Credentials::new("sa", "pKC8mMA_qu5SLeaG"),
        }
    }

    pub fn with_migrations(mut self, migrations: Vec<Migration>) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn migration_count(&self) -> usize {
        self.migrations.len()
    }
}

impl DatastoreEngine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn image(&self) -> ImageRef {
        ImageRef::new("fake-datastore", "1")
    }

    fn container_port(&self) -> u16 {
        14330
    }

    fn container_env(&self, credentials: &Credentials) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("FAKE_USER".to_string(), credentials.username().to_string()),
            (
                "FAKE_PASSWORD".to_string(),
                credentials.password().to_string(),
            ),
        ])
    }

    fn data_dir(&self) -> Option<&'static str> {
        Some("/var/lib/fake")
    }

    fn ready_message(&self) -> Option<ReadyMessage> {
        Some(ReadyMessage::stdout("fake datastore started"))
    }

    fn scheme(&self) -> &'static str {
        "scheme"
    }

    fn default_credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    fn driver(&self, _readiness: &ReadinessConfig) -> Box<dyn Driver> {
        Box::new(self.driver.clone())
    }

    fn migrations(&self) -> Result<MigrationSet, MigrationError> {
        MigrationSet::new("fake", self.migrations.clone())
    }
}
