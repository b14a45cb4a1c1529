//! # Domain Invariants
//!
//! Rules every envelope and derived address must satisfy.

use super::entities::MessageEnvelope;
use super::errors::{ShardId, WalletError};
use super::value_objects::Address;

/// Upper bound on configurable shard counts.
pub const MAX_SHARD_COUNT: u16 = 1024;

/// Invariant: shard id inside the configured range `0..shard_count`.
pub fn invariant_shard_in_range(shard_id: ShardId, shard_count: u16) -> Result<(), WalletError> {
    if shard_id >= shard_count {
        return Err(WalletError::InvalidShardId {
            shard_id,
            shard_count,
        });
    }
    Ok(())
}

/// Invariant: the address embeds the shard it was derived for.
pub fn invariant_shard_embedded(address: &Address, shard_id: ShardId) -> bool {
    address.shard_id() == shard_id
}

/// Invariant: seqnos issued for one account strictly increase.
pub fn invariant_seqno_increasing(seqnos: &[u64]) -> bool {
    seqnos.windows(2).all(|w| w[0] < w[1])
}

/// Invariant: an envelope leaving the client is encodable, i.e. signed
/// whenever it carries a payload or a deploy.
pub fn invariant_submittable(envelope: &MessageEnvelope) -> Result<(), WalletError> {
    if envelope.requires_signature() && !envelope.is_signed() {
        return Err(WalletError::MissingSignature);
    }
    Ok(())
}
