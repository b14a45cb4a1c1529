//! RLP ABI Codec Adapter
//!
//! Implements the `AbiCodec` port. A call is a 4-byte selector
//! (`keccak256(name)[..4]`) followed by an RLP list of tagged arguments.

use crate::domain::{keccak256, AbiValue, WalletError};
use crate::ports::outbound::AbiCodec;
use rlp::{Rlp, RlpStream};

/// Function selector length.
pub const SELECTOR_LEN: usize = 4;

/// Selector of `function`.
pub fn selector(function: &str) -> [u8; SELECTOR_LEN] {
    let hash = keccak256(function.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector-prefixed RLP call codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct RlpAbiCodec;

impl RlpAbiCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self
    }

    /// Split call data into selector and arguments.
    pub fn decode_call(
        &self,
        data: &[u8],
    ) -> Result<([u8; SELECTOR_LEN], Vec<AbiValue>), WalletError> {
        if data.len() < SELECTOR_LEN {
            return Err(WalletError::Encoding(format!(
                "call data shorter than selector: {} bytes",
                data.len()
            )));
        }
        let mut sel = [0u8; SELECTOR_LEN];
        sel.copy_from_slice(&data[..SELECTOR_LEN]);
        let args: Vec<AbiValue> = Rlp::new(&data[SELECTOR_LEN..]).as_list()?;
        Ok((sel, args))
    }
}

impl AbiCodec for RlpAbiCodec {
    fn encode_call(&self, function: &str, args: &[AbiValue]) -> Result<Vec<u8>, WalletError> {
        if function.is_empty() {
            return Err(WalletError::Encoding("function name is empty".into()));
        }
        let mut stream = RlpStream::new();
        stream.append_list::<AbiValue, AbiValue>(args);
        let mut out = selector(function).to_vec();
        out.extend_from_slice(&stream.out());
        Ok(out)
    }
}
