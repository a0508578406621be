//! Logging setup for the command line host

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
fn default_directives() -> &'static str {
    if cfg!(debug_assertions) { "debug" } else { "info" }
}

/// Initialize the global subscriber, logging to stderr so stdout stays clean for output
pub fn setup_logging() {
    let from_env = EnvFilter::try_from_default_env();
    let defaulted = from_env.is_err();
    let filter = from_env.unwrap_or_else(|_| EnvFilter::new(default_directives()));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
        return;
    }
    if defaulted {
        tracing::debug!("RUST_LOG not set, defaulting to {}", default_directives());
    }
}

/// Log the package name and version
pub fn log_version_info() {
    tracing::info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
}
