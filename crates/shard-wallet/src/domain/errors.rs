//! # Domain Errors
//!
//! Error taxonomy for envelope construction, submission and confirmation.

use thiserror::Error;

/// Shard identifier (u16, embedded big-endian in the first two address bytes).
pub type ShardId = u16;

/// Hash type (32-byte keccak256).
pub type Hash = [u8; 32];

/// Wallet error types.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Bad or contradictory construction inputs. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Shard id outside the configured shard range.
    #[error("Invalid shard id {shard_id} (shard count {shard_count})")]
    InvalidShardId {
        /// Requested shard
        shard_id: ShardId,
        /// Configured number of shards
        shard_count: u16,
    },

    /// Envelope was signed twice.
    #[error("Envelope already signed")]
    AlreadySigned,

    /// Envelope needs a signature before it can be encoded.
    #[error("Envelope requires a signature before encoding")]
    MissingSignature,

    /// RPC call failed on the way to or from the node.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Node accepted the request but rejected the message.
    #[error("Submission rejected: {0}")]
    Submission(String),

    /// A receipt in the chain reported `success = false`.
    #[error("Execution failed for message {}: {reason}", hex::encode(.hash))]
    ExecutionFailure {
        /// Hash of the failed message
        hash: Hash,
        /// Node-reported reason
        reason: String,
    },

    /// No receipt was observed before the deadline.
    #[error("Message {} not confirmed before deadline", hex::encode(.hash))]
    ConfirmationTimeout {
        /// Hash of the unconfirmed message
        hash: Hash,
    },

    /// Retry budget exhausted. Wraps the last underlying cause.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Attempts made
        attempts: u32,
        /// Last observed cause
        last: Box<WalletError>,
    },

    /// Signer failed to produce a signature.
    #[error("Signer error: {0}")]
    Signer(String),

    /// Malformed wire data.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl WalletError {
    /// Whether a bounded retry may recover from this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Submission(_))
    }
}

impl From<rlp::DecoderError> for WalletError {
    fn from(err: rlp::DecoderError) -> Self {
        WalletError::Encoding(err.to_string())
    }
}
