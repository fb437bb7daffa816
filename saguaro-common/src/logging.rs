//! Tracing setup shared by binaries and integration tests

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber with an env-filter.
///
/// Filtering is driven by `RUST_LOG`; `default_directive` applies when the
/// variable is unset (e.g. `"saguaro=info"`). Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug");
        init_tracing("info");
    }
}
