//! Tracing subscriber setup for binaries and test harnesses embedding the wallet.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the host process.

use crate::config::LogConfig;
use crate::domain::WalletError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, WalletError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| WalletError::Configuration(format!("invalid log filter: {}", e)))
}

/// Install a global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), WalletError> {
    let filter = env_filter(config)?;

    if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| WalletError::Configuration(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| WalletError::Configuration(e.to_string()))?;
    }

    tracing::info!(
        level = %config.log_level,
        json = config.json_logs,
        "Wallet tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directive() {
        let config = LogConfig {
            log_level: "shard_wallet=debug,warn".to_string(),
            json_logs: false,
        };
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        // Another test binary may already own the global subscriber, so only
        // the second call is asserted.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
