use tracing_subscriber::EnvFilter;

/// Default filter when neither the config file nor `RUST_LOG` sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install the global tracing subscriber.
///
/// Logs go to stderr so they never interleave with reply text streamed to
/// stdout. `RUST_LOG` takes precedence over `level`. Calling this twice is a
/// no-op.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}
