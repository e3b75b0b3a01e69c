//! Logging setup. Near-silent unless `DEBUG_LOGS` is on.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug_logs: bool) -> &'static str {
    if debug_logs {
        "info,tower_http=debug"
    } else {
        "error"
    }
}

/// Install the global subscriber, writing to stderr.
///
/// A subscriber installed earlier (e.g. by a test harness) is left in place.
pub fn init(debug_logs: bool) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(debug_logs).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(default_filter(false), "error");
        assert!(default_filter(true).starts_with("info"));
    }
}
