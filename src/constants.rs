//! Shared constants for provisioning, readiness and configuration.

/// Readiness backoff: first sleep between probes
pub const DEFAULT_INITIAL_INTERVAL_MS: u64 = 500;

/// Readiness backoff: growth factor applied after each failed probe
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Readiness backoff: ceiling for a single sleep
pub const DEFAULT_MAX_INTERVAL_MS: u64 = 60_000;

/// Readiness backoff: total budget before giving up
pub const DEFAULT_MAX_ELAPSED_MS: u64 = 120_000;

/// Readiness probe: connection acquire timeout for one attempt
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_ENGINE: &str = "postgres";

pub const ENV_PREFIX: &str = "FIXTURES";
pub const ENV_SEPARATOR: &str = "__";
pub const CONFIG_PATH_ENV: &str = "FIXTURES_CONFIG_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "config/fixtures.yaml";

/// Table holding applied migration versions inside each instance
pub const MIGRATION_STATE_TABLE: &str = "fixture_schema_migrations";

/// Database created inside every provisioned instance
pub const FIXTURE_DATABASE: &str = "defaultdb";
