//! # Wallet Configuration
//!
//! Shard layout, receipt polling cadence, retry budget and logging.

use crate::domain::{ExecutionFailurePolicy, WalletError, MAX_SHARD_COUNT};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Complete wallet configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Number of shards; valid shard ids are `0..shard_count`.
    pub shard_count: u16,
    /// Fixed chain id. When unset it is fetched from the node per send.
    pub chain_id: Option<u64>,
    /// Receipt polling.
    pub receipts: WaitConfig,
    /// Funder retry budget.
    pub retry: RetryConfig,
    /// Logging.
    pub logging: LogConfig,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            shard_count: 4,
            chain_id: None,
            receipts: WaitConfig::default(),
            retry: RetryConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl WalletConfig {
    /// Create a config for testing (short intervals).
    pub fn for_testing() -> Self {
        Self {
            shard_count: 4,
            chain_id: None,
            receipts: WaitConfig {
                poll_interval_ms: 10,
                timeout_ms: 500,
            },
            retry: RetryConfig {
                max_attempts: 3,
                attempt_timeout_ms: 200,
                backoff_ms: 20,
                execution_failure: ExecutionFailurePolicy::Retry,
            },
            logging: LogConfig::default(),
        }
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, WalletError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WalletError::Configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the wallet cannot operate with.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.shard_count == 0 || self.shard_count > MAX_SHARD_COUNT {
            return Err(WalletError::Configuration(format!(
                "shard_count must be in 1..={}, got {}",
                MAX_SHARD_COUNT, self.shard_count
            )));
        }
        if self.receipts.poll_interval_ms == 0 {
            return Err(WalletError::Configuration(
                "receipts.poll_interval_ms must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(WalletError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Receipt polling cadence and overall deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Delay between receipt polls.
    pub poll_interval_ms: u64,
    /// Maximum wait for a whole receipt chain.
    pub timeout_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            timeout_ms: 60_000,
        }
    }
}

impl WaitConfig {
    /// Poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overall deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Same cadence, different deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            ..self
        }
    }
}

/// Bounded retry policy for funding operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Default attempt budget.
    pub max_attempts: u32,
    /// Deadline for one attempt's receipt chain.
    pub attempt_timeout_ms: u64,
    /// Fixed sleep after a transport error.
    pub backoff_ms: u64,
    /// Handling of `success = false` receipts.
    pub execution_failure: ExecutionFailurePolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout_ms: 20_000,
            backoff_ms: 1_000,
            execution_failure: ExecutionFailurePolicy::Retry,
        }
    }
}

impl RetryConfig {
    /// Per-attempt deadline.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Backoff interval.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error or a full EnvFilter).
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl LogConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SHARD_WALLET_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SHARD_WALLET_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("SHARD_WALLET_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("SHARD_WALLET_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}
