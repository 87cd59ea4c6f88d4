use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`), e.g.
/// `RUST_LOG=onboarding_scheduler=debug` to see every placement decision.
/// Log records emitted by actix's request logger are bridged into the same
/// subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Test-friendly subscriber; safe to call from every test
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
