use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber with the default `info` level.
///
/// `RUST_LOG` takes precedence when set. Calling this more than once is a no-op.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Install the global `tracing` subscriber, falling back to `default_directive`
/// when `RUST_LOG` is unset or invalid.
pub fn init_tracing_with(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
