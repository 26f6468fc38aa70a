//! Tracing/logging setup shared by the binary and the tests.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops). The filter
/// defaults to `info` for the kosh crates and is overridable via
/// `RUST_LOG`. Release builds emit JSON lines; debug builds keep the
/// human-readable formatter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,kosh_api=debug,kosh_store=debug")
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    if cfg!(debug_assertions) {
        let _ = builder.try_init();
    } else {
        let _ = builder.json().with_target(false).try_init();
    }
}
