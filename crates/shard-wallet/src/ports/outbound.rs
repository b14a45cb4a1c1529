//! # Outbound Ports
//!
//! Traits for external dependencies (node RPC, signer, ABI codec).

use crate::domain::{keccak256, AbiValue, Address, BlockTag, Hash, Receipt, ShardId, WalletError};
use async_trait::async_trait;

/// Wallet contract entry point for fire-and-confirm sends.
pub const WALLET_ASYNC_CALL: &str = "asyncCall";

/// Wallet contract entry point for same-shard sends.
pub const WALLET_SYNC_CALL: &str = "syncCall";

/// Funding contract entry point.
pub const FAUCET_WITHDRAW_TO: &str = "withdrawTo";

/// Node RPC service - outbound port.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Submit a fully encoded envelope; returns the message hash.
    async fn submit_raw_message(&self, raw: &[u8]) -> Result<Hash, WalletError>;

    /// Next seqno expected from `address`.
    async fn get_seqno(&self, address: &Address, tag: BlockTag) -> Result<u64, WalletError>;

    /// Network chain id.
    async fn get_chain_id(&self) -> Result<u64, WalletError>;

    /// Receipt of `hash` on `shard_id`, if processed yet.
    async fn get_receipt(
        &self,
        shard_id: ShardId,
        hash: &Hash,
    ) -> Result<Option<Receipt>, WalletError>;
}

/// Signing capability - outbound port. Key material stays opaque.
pub trait Signer: Send + Sync {
    /// Sign a 32-byte digest.
    fn sign(&self, digest: &Hash) -> Result<Vec<u8>, WalletError>;

    /// Public key bytes.
    fn public_key(&self) -> Vec<u8>;
}

/// ABI codec - outbound port. Output is opaque to the wallet.
pub trait AbiCodec: Send + Sync {
    /// Encode a call to `function` with `args`.
    fn encode_call(&self, function: &str, args: &[AbiValue]) -> Result<Vec<u8>, WalletError>;
}

impl<T: Signer + ?Sized> Signer for std::sync::Arc<T> {
    fn sign(&self, digest: &Hash) -> Result<Vec<u8>, WalletError> {
        (**self).sign(digest)
    }

    fn public_key(&self) -> Vec<u8> {
        (**self).public_key()
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Deterministic signer for testing.
///
/// Signature is `keccak256(public_key || digest) || digest || 0x00`.
#[derive(Clone, Debug)]
pub struct StaticSigner {
    public_key: Vec<u8>,
    /// Should fail?
    pub should_fail: bool,
}

impl StaticSigner {
    /// Create with the given public key bytes.
    pub fn new(public_key: Vec<u8>) -> Self {
        Self {
            public_key,
            should_fail: false,
        }
    }
}

impl Signer for StaticSigner {
    fn sign(&self, digest: &Hash) -> Result<Vec<u8>, WalletError> {
        if self.should_fail {
            return Err(WalletError::Signer("Mock failure".to_string()));
        }
        let mut material = self.public_key.clone();
        material.extend_from_slice(digest);
        let mut signature = keccak256(&material).to_vec();
        signature.extend_from_slice(digest);
        signature.push(0);
        Ok(signature)
    }

    fn public_key(&self) -> Vec<u8> {
        self.public_key.clone()
    }
}
