//! # Domain Value Objects
//!
//! Immutable value types: addresses, salts, ABI argument values and the small
//! enums that parameterise sending.

use super::errors::{ShardId, WalletError};
use primitive_types::U256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address width in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Leading address bytes that hold the shard id.
pub const SHARD_PREFIX_LEN: usize = 2;

/// Salt used when the caller supplies none.
///
/// An explicit all-zero constant: accounts created without a salt share this
/// identity slot for a given (public key, shard, init code).
pub const DEFAULT_SALT: Salt = Salt([0u8; 32]);

/// 20-byte account address with the owning shard in its first two bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a shard id and the trailing 18 bytes.
    pub fn from_parts(shard_id: ShardId, tail: &[u8; ADDRESS_LEN - SHARD_PREFIX_LEN]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[..SHARD_PREFIX_LEN].copy_from_slice(&shard_id.to_be_bytes());
        bytes[SHARD_PREFIX_LEN..].copy_from_slice(tail);
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Shard embedded in the leading bytes.
    pub fn shard_id(&self) -> ShardId {
        ShardId::from_be_bytes([self.0[0], self.0[1]])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| WalletError::Encoding(e.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            WalletError::Encoding(format!("address must be {} bytes, got {}", ADDRESS_LEN, v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl Encodable for Address {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.0.to_vec());
    }
}

impl Decodable for Address {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let bytes = rlp.data()?;
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| DecoderError::Custom("address must be 20 bytes"))?;
        Ok(Self(bytes))
    }
}

/// 32-byte derivation salt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt([u8; 32]);

impl Salt {
    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<u64> for Salt {
    fn from(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<[u8; 32]> for Salt {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Block context for state queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockTag {
    /// Latest sealed block.
    Latest,
    /// Including messages not yet sealed.
    #[default]
    Pending,
}

/// Opaque argument handed to the ABI codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    /// Account address.
    Address(Address),
    /// Unsigned integer.
    Uint(U256),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Boolean flag.
    Bool(bool),
}

impl AbiValue {
    fn tag(&self) -> u8 {
        match self {
            AbiValue::Address(_) => 0,
            AbiValue::Uint(_) => 1,
            AbiValue::Bytes(_) => 2,
            AbiValue::Bool(_) => 3,
        }
    }
}

impl Encodable for AbiValue {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.tag());
        match self {
            AbiValue::Address(addr) => s.append(addr),
            AbiValue::Uint(value) => s.append(value),
            AbiValue::Bytes(bytes) => s.append(bytes),
            AbiValue::Bool(flag) => s.append(&u8::from(*flag)),
        };
    }
}

impl Decodable for AbiValue {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        match rlp.val_at::<u8>(0)? {
            0 => Ok(AbiValue::Address(rlp.val_at(1)?)),
            1 => Ok(AbiValue::Uint(rlp.val_at(1)?)),
            2 => Ok(AbiValue::Bytes(rlp.val_at(1)?)),
            3 => Ok(AbiValue::Bool(rlp.val_at::<u8>(1)? != 0)),
            _ => Err(DecoderError::Custom("unknown abi value tag")),
        }
    }
}

/// Lifecycle of an account handled by a wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountState {
    /// Address computed, contract not deployed yet.
    #[default]
    Uninitialized,
    /// Deploy message accepted by the node.
    Deployed,
}

impl AccountState {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: AccountState) -> bool {
        matches!((self, next), (Self::Uninitialized, Self::Deployed))
    }
}

/// How long a send waits after submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwaitPolicy {
    /// Return as soon as the node accepts the message.
    #[default]
    Detached,
    /// Wait for the receipt on the originating shard only.
    OriginHop,
    /// Wait for the whole receipt chain across shards.
    FullChain,
}

/// What the funder does when a receipt reports `success = false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionFailurePolicy {
    /// Treat the failure as transient and try again with a fresh envelope.
    #[default]
    Retry,
    /// Surface the failure immediately.
    Fail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_shard_prefix() {
        let addr = Address::from_parts(0x0102, &[0xAA; 18]);
        assert_eq!(addr.shard_id(), 0x0102);
        assert_eq!(addr.as_bytes()[0], 0x01);
        assert_eq!(addr.as_bytes()[1], 0x02);
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_parts(3, &[0x5A; 18]);
        let text = addr.to_string();
        assert!(text.starts_with("0x0003"));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_parse_wrong_length() {
        assert!("0x0102".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_salt_from_u64() {
        let salt = Salt::from(100u64);
        assert_eq!(salt.as_bytes()[31], 100);
        assert!(salt.as_bytes()[..24].iter().all(|b| *b == 0));
        assert_eq!(Salt::from(0u64), DEFAULT_SALT);
    }

    #[test]
    fn test_abi_value_rlp() {
        let values = vec![
            AbiValue::Address(Address::from_parts(1, &[7; 18])),
            AbiValue::Uint(U256::from(10u64)),
            AbiValue::Bytes(vec![1, 2, 3]),
            AbiValue::Bool(true),
        ];
        let mut stream = RlpStream::new();
        stream.append_list::<AbiValue, AbiValue>(&values);
        let bytes = stream.out();
        let decoded: Vec<AbiValue> = Rlp::new(&bytes).as_list().unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_account_state_transitions() {
        assert!(AccountState::Uninitialized.can_transition_to(AccountState::Deployed));
        assert!(!AccountState::Deployed.can_transition_to(AccountState::Deployed));
        assert!(!AccountState::Deployed.can_transition_to(AccountState::Uninitialized));
    }
}
