//! Console logging for the client binary.
//!
//! Filtering comes from `RUST_LOG` and defaults to `info`. Output is compact
//! and timestamped with local RFC 3339 time.

use tracing_subscriber::{EnvFilter, fmt};

pub fn init_logging() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_timer(fmt::time::ChronoLocal::rfc_3339())
        .compact()
        .init();
}
