//! Diagnostics for the `assistant` binary.
//!
//! Two channels never mix: tracing events go to stderr, while stdout carries
//! only the JSON the command prints. Durable per-run artifacts are a separate
//! concern handled by `io::run_record`; the log filter does not affect them.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Filter directives come from `RUST_LOG` (for example
/// `RUST_LOG=assistant::agents=debug`); invalid directives are skipped and an
/// unset variable means warnings and errors only.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
