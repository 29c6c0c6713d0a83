use tracing_subscriber::{EnvFilter, fmt};

/// Installs the process-wide `tracing` subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info` when unset. Safe to call more
/// than once per process (later calls are no-ops), which matters for test
/// binaries that each bring up their own `main`-equivalent.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
