//! Process-wide tracing setup shared by the workspace binaries.
//!
//! Events go to stderr so that stdout stays free for command output.
//! The filter is read from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber, later calls are no-ops
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("logger initialised");
    }
}
