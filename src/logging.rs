//! Opt-in subscriber setup for hosts and tests. The library itself only emits
//! `tracing` events.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

pub const LOG_ENV: &str = "SHEETPLAN_LOG";
const DEFAULT_FILTER: &str = "info";

/// Installs a formatted subscriber filtered by `SHEETPLAN_LOG` (default `info`).
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_refused() {
        init_tracing();
        assert!(!init_tracing());
    }
}
