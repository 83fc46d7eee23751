//! Tracing setup for hosts that do not install their own subscriber.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use solverforge_config::LoggingConfig;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs a formatting subscriber filtered by `RUST_LOG`, or by
/// `config.filter` when the variable is unset.
///
/// Safe to call multiple times - only the first call has effect, and a
/// subscriber installed by the host wins.
///
/// ```
/// use solverforge_config::BridgeConfig;
///
/// let config = BridgeConfig::default();
/// solverforge_interop::console::init(&config.logging);
/// ```
pub fn init(config: &LoggingConfig) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init(&config);
        init(&LoggingConfig {
            filter: "trace".to_string(),
        });

        assert!(INIT.get().is_some());
        assert!(tracing::dispatcher::has_been_set());
        tracing::info!(event = "console_ready");
    }
}
