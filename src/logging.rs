//! # Test Logging
//!
//! Console logging for test binaries using the tracing ecosystem. Call
//! [`init_test_logging`] at the top of a test; repeated calls are no-ops and an
//! already-installed global subscriber is left in place.
//!
//! Level comes from `RUST_LOG` (default `info`). Set `FIXTURES_LOG_FORMAT=json`
//! for JSON lines.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "info";
const LOG_FORMAT_ENV: &str = "FIXTURES_LOG_FORMAT";

/// Initialize console tracing once per process
pub fn init_test_logging() {
    TRACING_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|format| format == "json");

        let layer = if json {
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal())
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - keeping existing subscriber");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test_logging();
        init_test_logging();
        tracing::info!(component = "logging", "still logging after double init");
    }
}
