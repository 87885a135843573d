// Test Helpers Module - Docker-free fixtures
//
// In-process stand-ins for the container runtime, the database driver and an
// engine definition, so the provisioning pipeline can be exercised end to end
// in unit and integration tests.

pub mod fake_driver;
pub mod fake_engine;
pub mod fake_runtime;

pub use fake_driver::{FakeDatabase, FakeDriver};
pub use fake_engine::FakeEngine;
pub use fake_runtime::{ContainerRecord, FakeRuntime};
