//! Logging bootstrap for test binaries.

use common::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Output goes through the
/// test writer so `cargo test` captures it per test. Safe to call from every
/// test: only the first call installs a subscriber and returns `true`.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_test_writer())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init()
    };

    result.is_ok()
}
