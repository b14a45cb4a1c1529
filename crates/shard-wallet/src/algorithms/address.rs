//! # Deterministic Address Derivation
//!
//! Content-addressed (CREATE2-style) account addresses. The digest is
//!
//! ```text
//! keccak256(shard_id_be16 || keccak256(public_key) || salt || keccak256(init_code))
//! ```
//!
//! and the address is `shard_id_be16 || digest[14..32]`, so routing can read
//! the owning shard without a lookup and the result is the same before and
//! after the account is deployed.

use crate::domain::{
    invariant_shard_in_range, keccak256, Address, DeployPayload, Hash, Salt, ShardId,
    WalletError, ADDRESS_LEN, MAX_SHARD_COUNT, SHARD_PREFIX_LEN,
};

const TAIL_LEN: usize = ADDRESS_LEN - SHARD_PREFIX_LEN;

/// Derive the address of an account that may not exist yet.
pub fn derive_address(
    public_key: &[u8],
    shard_id: ShardId,
    salt: &Salt,
    init_code: &[u8],
    shard_count: u16,
) -> Result<Address, WalletError> {
    invariant_shard_in_range(shard_id, shard_count)?;

    // 2 + 32 + 32 + 32 bytes
    let mut input = [0u8; SHARD_PREFIX_LEN + 96];
    input[..SHARD_PREFIX_LEN].copy_from_slice(&shard_id.to_be_bytes());
    input[2..34].copy_from_slice(&keccak256(public_key));
    input[34..66].copy_from_slice(salt.as_bytes());
    input[66..98].copy_from_slice(&keccak256(init_code));

    let digest: Hash = keccak256(&input);
    let mut tail = [0u8; TAIL_LEN];
    tail.copy_from_slice(&digest[32 - TAIL_LEN..]);
    Ok(Address::from_parts(shard_id, &tail))
}

/// Shard owning `address`.
pub fn shard_of(address: &Address) -> ShardId {
    address.shard_id()
}

/// Address deriver bound to a shard layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressDeriver {
    shard_count: u16,
}

impl AddressDeriver {
    /// Create for `shard_count` shards.
    pub fn new(shard_count: u16) -> Result<Self, WalletError> {
        if shard_count == 0 || shard_count > MAX_SHARD_COUNT {
            return Err(WalletError::Configuration(format!(
                "shard_count must be in 1..={}, got {}",
                MAX_SHARD_COUNT, shard_count
            )));
        }
        Ok(Self { shard_count })
    }

    /// Configured shard count.
    pub fn shard_count(&self) -> u16 {
        self.shard_count
    }

    /// See [`derive_address`].
    pub fn derive(
        &self,
        public_key: &[u8],
        shard_id: ShardId,
        salt: &Salt,
        init_code: &[u8],
    ) -> Result<Address, WalletError> {
        derive_address(public_key, shard_id, salt, init_code, self.shard_count)
    }

    /// Address a deploy payload lands at when deployed by `public_key`.
    pub fn derive_for_payload(
        &self,
        public_key: &[u8],
        shard_id: ShardId,
        payload: &DeployPayload,
    ) -> Result<Address, WalletError> {
        self.derive(public_key, shard_id, &payload.salt, &payload.init_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_SALT;
    use proptest::prelude::*;

    const PUBKEY: [u8; 33] = [0x02; 33];

    #[test]
    fn test_derive_deterministic() {
        let a = derive_address(&PUBKEY, 1, &DEFAULT_SALT, b"code", 4).unwrap();
        let b = derive_address(&PUBKEY, 1, &DEFAULT_SALT, b"code", 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_embeds_shard() {
        for shard in 0..4 {
            let addr = derive_address(&PUBKEY, shard, &DEFAULT_SALT, &[], 4).unwrap();
            assert_eq!(shard_of(&addr), shard);
        }
    }

    #[test]
    fn test_derive_rejects_out_of_range_shard() {
        let result = derive_address(&PUBKEY, 4, &DEFAULT_SALT, &[], 4);
        assert!(matches!(result, Err(WalletError::InvalidShardId { shard_id: 4, .. })));
    }

    #[test]
    fn test_every_input_matters() {
        let base = derive_address(&PUBKEY, 1, &Salt::from(1u64), b"code", 4).unwrap();
        assert_ne!(base, derive_address(&[0x03; 33], 1, &Salt::from(1u64), b"code", 4).unwrap());
        assert_ne!(base, derive_address(&PUBKEY, 2, &Salt::from(1u64), b"code", 4).unwrap());
        assert_ne!(base, derive_address(&PUBKEY, 1, &Salt::from(2u64), b"code", 4).unwrap());
        assert_ne!(base, derive_address(&PUBKEY, 1, &Salt::from(1u64), b"other", 4).unwrap());
    }

    #[test]
    fn test_deriver_validates_layout() {
        assert!(AddressDeriver::new(0).is_err());
        assert!(AddressDeriver::new(MAX_SHARD_COUNT + 1).is_err());
        assert_eq!(AddressDeriver::new(16).unwrap().shard_count(), 16);
    }

    #[test]
    fn test_derive_for_payload_uses_init_code() {
        let deriver = AddressDeriver::new(4).unwrap();
        let payload = DeployPayload::new(vec![1, 2], vec![3], Salt::from(100u64));
        let via_payload = deriver.derive_for_payload(&PUBKEY, 2, &payload).unwrap();
        let direct = deriver
            .derive(&PUBKEY, 2, &Salt::from(100u64), &[1, 2, 3])
            .unwrap();
        assert_eq!(via_payload, direct);
    }

    proptest! {
        #[test]
        fn prop_derivation_deterministic(
            key in proptest::collection::vec(any::<u8>(), 1..65),
            shard in 0u16..16,
            salt in any::<u64>(),
            code in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            let salt = Salt::from(salt);
            let a = derive_address(&key, shard, &salt, &code, 16).unwrap();
            let b = derive_address(&key, shard, &salt, &code, 16).unwrap();
            prop_assert_eq!(a, b);
            prop_assert_eq!(a.shard_id(), shard);
        }
    }
}
