//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.

mod in_memory_node;
mod rlp_abi_codec;
mod secp256k1_signer;

pub use in_memory_node::InMemoryNode;
pub use rlp_abi_codec::{selector, RlpAbiCodec, SELECTOR_LEN};
pub use secp256k1_signer::{recover_public_key, Secp256k1Signer, SIGNATURE_LEN};
