//! Test support: one-time tracing setup shared by unit and integration tests.

use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

/// Install a test subscriber once per process. `RUST_LOG` selects the level, default debug.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let noisy_modules = ["rayon", "walkdir"];
        let module_filter = filter_fn(move |metadata| {
            !noisy_modules
                .iter()
                .any(|name| metadata.target().starts_with(name))
        });
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(module_filter)
                .with_filter(env_filter),
        );

        if tracing::dispatcher::has_been_set() {
            debug!("Tracing subscriber already set");
        } else if let Err(e) = subscriber.try_init() {
            eprintln!("Error: Failed to set up logging: {}", e);
        }
    });
}
