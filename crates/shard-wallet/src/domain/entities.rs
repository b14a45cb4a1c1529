//! # Domain Entities
//!
//! The outbound message envelope, the deploy payload it carries, and the
//! receipts the node reports back.

use super::errors::{Hash, ShardId, WalletError};
use super::value_objects::{Address, Salt};
use crate::ports::outbound::Signer;
use primitive_types::U256;
use rlp::{Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Number of fields in an encoded envelope.
const ENVELOPE_FIELDS: usize = 7;

/// keccak256 digest.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Outbound message envelope.
///
/// Wire layout is an RLP list
/// `[is_deploy, to, chain_id, seqno, value, data, auth_data]`. The signing
/// hash covers every field except `auth_data`, so attaching the signature
/// never changes `hash()`.
///
/// There are no setters: once built the only mutation is the single
/// `sign` call, after which the envelope is frozen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEnvelope {
    is_deploy: bool,
    to: Address,
    chain_id: u64,
    seqno: u64,
    value: U256,
    data: Vec<u8>,
    auth_data: Vec<u8>,
}

impl MessageEnvelope {
    /// Call envelope carrying an opaque payload.
    pub fn call(to: Address, chain_id: u64, seqno: u64, data: Vec<u8>) -> Self {
        Self {
            is_deploy: false,
            to,
            chain_id,
            seqno,
            value: U256::zero(),
            data,
            auth_data: Vec::new(),
        }
    }

    /// Deploy envelope for `payload`, addressed to the derived contract address.
    pub fn deploy(to: Address, chain_id: u64, seqno: u64, payload: &DeployPayload) -> Self {
        Self {
            is_deploy: true,
            data: payload.encode(),
            ..Self::call(to, chain_id, seqno, Vec::new())
        }
    }

    /// Attach a value. Only allowed before signing.
    pub fn with_value(mut self, value: U256) -> Result<Self, WalletError> {
        if self.is_signed() {
            return Err(WalletError::AlreadySigned);
        }
        self.value = value;
        Ok(self)
    }

    /// Deploy flag.
    pub fn is_deploy(&self) -> bool {
        self.is_deploy
    }

    /// Destination address.
    pub fn to(&self) -> Address {
        self.to
    }

    /// Chain id.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sender-side sequence number.
    pub fn seqno(&self) -> u64 {
        self.seqno
    }

    /// Attached value.
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Call or deploy payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Signature bytes (empty before signing).
    pub fn auth_data(&self) -> &[u8] {
        &self.auth_data
    }

    /// Whether a signature has been attached.
    pub fn is_signed(&self) -> bool {
        !self.auth_data.is_empty()
    }

    /// Deploys and messages with a payload must be signed; bare value
    /// transfers may travel unsigned.
    pub fn requires_signature(&self) -> bool {
        self.is_deploy || !self.data.is_empty()
    }

    fn append_unsigned(&self, stream: &mut RlpStream) {
        stream.append(&u8::from(self.is_deploy));
        stream.append(&self.to);
        stream.append(&self.chain_id);
        stream.append(&self.seqno);
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// Signing hash over every field except `auth_data`.
    pub fn hash(&self) -> Hash {
        let mut stream = RlpStream::new_list(ENVELOPE_FIELDS - 1);
        self.append_unsigned(&mut stream);
        keccak256(&stream.out())
    }

    /// Sign `hash()` and attach the signature.
    pub fn sign<S: Signer + ?Sized>(&mut self, signer: &S) -> Result<(), WalletError> {
        if self.is_signed() {
            return Err(WalletError::AlreadySigned);
        }
        let signature = signer.sign(&self.hash())?;
        if signature.is_empty() {
            return Err(WalletError::Signer("signer returned an empty signature".into()));
        }
        self.auth_data = signature;
        Ok(())
    }

    /// Canonical wire encoding.
    pub fn encode(&self) -> Result<Vec<u8>, WalletError> {
        if self.requires_signature() && !self.is_signed() {
            return Err(WalletError::MissingSignature);
        }
        let mut stream = RlpStream::new_list(ENVELOPE_FIELDS);
        self.append_unsigned(&mut stream);
        stream.append(&self.auth_data);
        Ok(stream.out().to_vec())
    }

    /// Inverse of `encode`.
    pub fn decode(bytes: &[u8]) -> Result<Self, WalletError> {
        let rlp = Rlp::new(bytes);
        if !rlp.is_list() {
            return Err(WalletError::Encoding("envelope must be an RLP list".into()));
        }
        let fields = rlp.item_count()?;
        if fields != ENVELOPE_FIELDS {
            return Err(WalletError::Encoding(format!(
                "envelope must have {} fields, got {}",
                ENVELOPE_FIELDS, fields
            )));
        }
        let is_deploy = match rlp.val_at::<u8>(0)? {
            0 => false,
            1 => true,
            other => {
                return Err(WalletError::Encoding(format!("invalid deploy flag {}", other)));
            }
        };
        Ok(Self {
            is_deploy,
            to: rlp.val_at(1)?,
            chain_id: rlp.val_at(2)?,
            seqno: rlp.val_at(3)?,
            value: rlp.val_at(4)?,
            data: rlp.val_at(5)?,
            auth_data: rlp.val_at(6)?,
        })
    }
}

/// Data of a deploy envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployPayload {
    /// Contract bytecode.
    pub bytecode: Vec<u8>,
    /// ABI-encoded constructor arguments.
    pub args: Vec<u8>,
    /// Derivation salt.
    pub salt: Salt,
}

impl DeployPayload {
    /// Create a payload.
    pub fn new(bytecode: Vec<u8>, args: Vec<u8>, salt: Salt) -> Self {
        Self {
            bytecode,
            args,
            salt,
        }
    }

    /// Code the address is derived from: `bytecode || args`.
    pub fn init_code(&self) -> Vec<u8> {
        let mut code = Vec::with_capacity(self.bytecode.len() + self.args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(&self.args);
        code
    }

    /// RLP list `[bytecode, args, salt]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(3);
        stream.append(&self.bytecode);
        stream.append(&self.args);
        stream.append(&self.salt.as_bytes().to_vec());
        stream.out().to_vec()
    }

    /// Inverse of `encode`.
    pub fn decode(bytes: &[u8]) -> Result<Self, WalletError> {
        let rlp = Rlp::new(bytes);
        if rlp.item_count()? != 3 {
            return Err(WalletError::Encoding("deploy payload must have 3 fields".into()));
        }
        let salt: Vec<u8> = rlp.val_at(2)?;
        let salt: [u8; 32] = salt
            .try_into()
            .map_err(|_| WalletError::Encoding("salt must be 32 bytes".into()))?;
        Ok(Self {
            bytecode: rlp.val_at(0)?,
            args: rlp.val_at(1)?,
            salt: Salt::from_bytes(salt),
        })
    }
}

/// Message emitted while processing another message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Hash of the emitted message.
    pub hash: Hash,
    /// Destination; its shard is where the receipt will appear.
    pub to: Address,
}

/// Result of one message's processing on one shard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Processed message.
    pub message_hash: Hash,
    /// Shard that processed it.
    pub shard_id: ShardId,
    /// Execution status.
    pub success: bool,
    /// Gas consumed.
    pub gas_used: u64,
    /// Messages emitted by this execution, in emission order.
    pub outgoing: Vec<OutgoingMessage>,
    /// Node-reported failure reason.
    pub error_message: Option<String>,
}

impl Receipt {
    /// Successful receipt with no outgoing messages.
    pub fn success(message_hash: Hash, shard_id: ShardId) -> Self {
        Self {
            message_hash,
            shard_id,
            success: true,
            gas_used: 0,
            outgoing: Vec::new(),
            error_message: None,
        }
    }

    /// Failed receipt.
    pub fn failure(message_hash: Hash, shard_id: ShardId, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(reason.into()),
            ..Self::success(message_hash, shard_id)
        }
    }

    /// Add an outgoing message.
    pub fn with_outgoing(mut self, hash: Hash, to: Address) -> Self {
        self.outgoing.push(OutgoingMessage { hash, to });
        self
    }
}

/// Outcome of waiting for a receipt chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Every hop observed.
    Complete(Vec<Receipt>),
    /// Deadline hit after observing some hops.
    Partial(Vec<Receipt>),
    /// Deadline hit before the first receipt appeared.
    TimedOut,
}

impl Completion {
    /// Receipts collected, in hop order.
    pub fn receipts(&self) -> &[Receipt] {
        match self {
            Completion::Complete(chain) | Completion::Partial(chain) => chain,
            Completion::TimedOut => &[],
        }
    }

    /// Whether every hop was observed.
    pub fn is_complete(&self) -> bool {
        matches!(self, Completion::Complete(_))
    }

    /// Complete and every receipt succeeded.
    pub fn is_success(&self) -> bool {
        self.is_complete() && self.receipts().iter().all(|r| r.success)
    }

    /// First receipt reporting failure.
    pub fn first_failure(&self) -> Option<&Receipt> {
        self.receipts().iter().find(|r| !r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::StaticSigner;
    use proptest::prelude::*;

    fn addr(shard: ShardId) -> Address {
        Address::from_parts(shard, &[0x11; 18])
    }

    #[test]
    fn test_hash_stable_across_signing() {
        let mut env = MessageEnvelope::call(addr(1), 7, 3, vec![0xde, 0xad]);
        let before = env.hash();
        env.sign(&StaticSigner::new(vec![9; 33])).unwrap();
        assert_eq!(before, env.hash());
    }

    #[test]
    fn test_sign_twice_fails() {
        let signer = StaticSigner::new(vec![9; 33]);
        let mut env = MessageEnvelope::call(addr(1), 7, 3, vec![1]);
        env.sign(&signer).unwrap();
        assert!(matches!(env.sign(&signer), Err(WalletError::AlreadySigned)));
    }

    #[test]
    fn test_with_value_after_sign_fails() {
        let mut env = MessageEnvelope::call(addr(1), 7, 3, vec![1]);
        env.sign(&StaticSigner::new(vec![9; 33])).unwrap();
        assert!(matches!(env.with_value(U256::one()), Err(WalletError::AlreadySigned)));
    }

    #[test]
    fn test_encode_requires_signature() {
        let call = MessageEnvelope::call(addr(1), 7, 3, vec![1]);
        assert!(matches!(call.encode(), Err(WalletError::MissingSignature)));

        let payload = DeployPayload::new(vec![0x60], vec![], Salt::default());
        let deploy = MessageEnvelope::deploy(addr(1), 7, 0, &payload);
        assert!(matches!(deploy.encode(), Err(WalletError::MissingSignature)));
    }

    #[test]
    fn test_bare_transfer_may_be_unsigned() {
        let env = MessageEnvelope::call(addr(2), 7, 0, vec![])
            .with_value(U256::from(5u64))
            .unwrap();
        assert!(!env.requires_signature());
        let bytes = env.encode().unwrap();
        assert_eq!(MessageEnvelope::decode(&bytes).unwrap(), env);
    }

    #[test]
    fn test_encode_decode_signed() {
        let mut env = MessageEnvelope::call(addr(1), 7, 3, vec![1, 2, 3])
            .with_value(U256::from(42u64))
            .unwrap();
        env.sign(&StaticSigner::new(vec![9; 33])).unwrap();
        let first = env.encode().unwrap();
        let second = env.encode().unwrap();
        assert_eq!(first, second);
        assert_eq!(MessageEnvelope::decode(&first).unwrap(), env);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(MessageEnvelope::decode(&[0x01, 0x02]).is_err());
        let mut stream = RlpStream::new_list(2);
        stream.append(&1u8);
        stream.append(&2u8);
        assert!(MessageEnvelope::decode(&stream.out()).is_err());
    }

    #[test]
    fn test_hash_depends_on_seqno() {
        let a = MessageEnvelope::call(addr(1), 7, 3, vec![1]);
        let b = MessageEnvelope::call(addr(1), 7, 4, vec![1]);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_deploy_payload_roundtrip() {
        let payload = DeployPayload::new(vec![0x60, 0x80], vec![0xAA, 0xBB], Salt::from(100u64));
        let decoded = DeployPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(payload.init_code(), vec![0x60, 0x80, 0xAA, 0xBB]);
    }

    #[test]
    fn test_completion_success_rules() {
        let ok = Receipt::success([1; 32], 1);
        let bad = Receipt::failure([2; 32], 2, "out of gas");

        assert!(Completion::Complete(vec![ok.clone()]).is_success());
        assert!(!Completion::Complete(vec![ok.clone(), bad.clone()]).is_success());
        assert!(!Completion::Partial(vec![ok.clone()]).is_success());
        assert!(!Completion::TimedOut.is_success());
        assert!(Completion::TimedOut.receipts().is_empty());
        assert_eq!(
            Completion::Complete(vec![ok, bad.clone()]).first_failure(),
            Some(&bad)
        );
    }

    proptest! {
        #[test]
        fn prop_envelope_hash_and_encoding_stable(
            is_deploy in any::<bool>(),
            shard in any::<u16>(),
            tail in any::<[u8; 18]>(),
            chain_id in any::<u64>(),
            seqno in any::<u64>(),
            value in any::<[u8; 32]>(),
            data in proptest::collection::vec(any::<u8>(), 0..96),
        ) {
            let to = Address::from_parts(shard, &tail);
            let envelope = if is_deploy {
                MessageEnvelope::deploy(to, chain_id, seqno, &DeployPayload::new(data, vec![], Salt::default()))
            } else {
                MessageEnvelope::call(to, chain_id, seqno, data)
            };
            let mut envelope = envelope.with_value(U256::from_big_endian(&value)).unwrap();

            if envelope.requires_signature() {
                prop_assert!(matches!(envelope.encode(), Err(WalletError::MissingSignature)));
            }

            let unsigned_hash = envelope.hash();
            envelope.sign(&StaticSigner::new(vec![0x02; 33])).unwrap();
            prop_assert_eq!(envelope.hash(), unsigned_hash);

            let first = envelope.encode().unwrap();
            prop_assert_eq!(&first, &envelope.encode().unwrap());
            prop_assert_eq!(MessageEnvelope::decode(&first).unwrap(), envelope);
        }
    }
}
