//! Structured logging initialization
//!
//! JSON output by default (structured for log shipping); `LOG_FORMAT=pretty`
//! switches to human-readable output for local development. The filter is
//! taken from `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the tracing subscriber.
///
/// Safe to call once per process; later calls are ignored so tests that
/// race on initialization do not panic.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let pretty = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("pretty"));

    if pretty {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init();
    }
}
