//! TCP server side of netmutex: the per-connection request loop, the
//! accept loop, and server-side counters.

pub mod connection;
pub mod metrics;
pub mod server;

pub use metrics::{Metrics, MetricsSnapshot};
pub use server::Server;

/// Initializes `tracing` with a single env var, `DEBUG`. `DEBUG=true`
/// (case-insensitive) enables debug-level logging; any other value, or the
/// variable being unset, leaves the server at info level — matching the
/// original's `strings.ToLower(os.Getenv("DEBUG")) == "true"` exactly.
/// Deliberately not `RUST_LOG`: the wire contract promises exactly one
/// environment knob and `EnvFilter`'s usual directive syntax would be a
/// second, undocumented one.
pub fn init_logging() {
    let debug = std::env::var("DEBUG")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}
