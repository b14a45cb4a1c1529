//! # Shard Wallet
//!
//! Client-side wallet for a sharded account-based chain.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Deterministic, shard-prefixed addresses computable before deployment
//! - Signed RLP message envelopes with a signature-independent hash
//! - Receipt-chain confirmation across shards
//! - Bounded-retry funding from a faucet contract
//!
//! ## Guarantees
//!
//! | Property | Enforced by |
//! |----------|-------------|
//! | Address bytes `[0..2]` carry the shard id | `derive_address` |
//! | `hash()` unchanged by signing | `MessageEnvelope` |
//! | Unsigned deploys and calls never leave the client | `MessageEnvelope::encode` |
//! | Funding submits at most `max_attempts` envelopes | `RetryingFunder` |
//!
//! ## Module Structure
//!
//! ```text
//! shard-wallet/
//! ├── domain/          # Address, MessageEnvelope, Receipt, Completion, errors
//! ├── algorithms/      # Address derivation, receipt waiting, retry decisions
//! ├── ports/           # WalletApi, FunderApi, NodeRpc, Signer, AbiCodec
//! ├── adapters/        # InMemoryNode, Secp256k1Signer, RlpAbiCodec
//! ├── application/     # AccountClient, RetryingFunder, SeqnoLedger
//! ├── config.rs        # WalletConfig
//! └── telemetry.rs     # tracing-subscriber setup
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;

// Re-exports
pub use adapters::{InMemoryNode, RlpAbiCodec, Secp256k1Signer};
pub use algorithms::{
    derive_address, shard_of, wait_for_origin, wait_until_completed, AddressDeriver,
    ReceiptWaiter,
};
pub use application::{AccountClient, AccountParams, RetryingFunder, SeqnoLedger};
pub use config::{LogConfig, RetryConfig, WaitConfig, WalletConfig};
pub use domain::{
    keccak256, AbiValue, AccountState, Address, AwaitPolicy, BlockTag, Completion,
    DeployPayload, ExecutionFailurePolicy, Hash, MessageEnvelope, OutgoingMessage, Receipt,
    Salt, ShardId, WalletError, DEFAULT_SALT, MAX_SHARD_COUNT,
};
pub use ports::{
    AbiCodec, DeployOutcome, DeployParams, FunderApi, NodeRpc, SelfDeployParams, SendParams,
    Signer, StaticSigner, WalletApi,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
