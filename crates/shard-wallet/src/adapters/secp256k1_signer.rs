//! secp256k1 Signer Adapter
//!
//! Implements the `Signer` port with recoverable ECDSA over the prehashed
//! envelope digest (RFC 6979 deterministic nonces, low-S).

use crate::domain::{Hash, WalletError};
use crate::ports::outbound::Signer;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

/// Signature length: `r || s || v`.
pub const SIGNATURE_LEN: usize = 65;

/// Local secp256k1 key. `SigningKey` wipes its scalar on drop.
pub struct Secp256k1Signer {
    signing_key: SigningKey,
}

impl Secp256k1Signer {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, WalletError> {
        let signing_key = SigningKey::from_bytes((&bytes).into())
            .map_err(|_| WalletError::Signer("invalid private key".into()))?;
        Ok(Self { signing_key })
    }

    /// Parse a hex secret key, with or without `0x`.
    pub fn from_hex(secret: &str) -> Result<Self, WalletError> {
        let raw = secret.strip_prefix("0x").unwrap_or(secret);
        let mut bytes: [u8; 32] = hex::decode(raw)
            .map_err(|e| WalletError::Signer(e.to_string()))?
            .try_into()
            .map_err(|_| WalletError::Signer("private key must be 32 bytes".into()))?;
        let signer = Self::from_bytes(bytes);
        bytes.zeroize();
        signer
    }

    fn compressed_public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_sec1_bytes().to_vec()
    }
}

impl Signer for Secp256k1Signer {
    fn sign(&self, digest: &Hash) -> Result<Vec<u8>, WalletError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| WalletError::Signer(e.to_string()))?;
        let mut out = Vec::with_capacity(SIGNATURE_LEN);
        out.extend_from_slice(&signature.to_bytes());
        out.push(recovery_id.to_byte());
        Ok(out)
    }

    fn public_key(&self) -> Vec<u8> {
        self.compressed_public_key()
    }
}

/// Recover the compressed public key that produced `signature` over `digest`.
pub fn recover_public_key(digest: &Hash, signature: &[u8]) -> Result<Vec<u8>, WalletError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(WalletError::Signer(format!(
            "signature must be {} bytes, got {}",
            SIGNATURE_LEN,
            signature.len()
        )));
    }
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|_| WalletError::Signer("invalid signature".into()))?;
    let recovery_id = RecoveryId::from_byte(signature[64])
        .ok_or_else(|| WalletError::Signer("invalid recovery id".into()))?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| WalletError::Signer("signature recovery failed".into()))?;
    Ok(key.to_sec1_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_wiped_on_drop() {
        fn assert_zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<SigningKey>();
    }

    #[test]
    fn test_sign_recover() {
        let signer = Secp256k1Signer::generate();
        let digest = [0x42u8; 32];
        let signature = signer.sign(&digest).unwrap();

        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert_eq!(recover_public_key(&digest, &signature).unwrap(), signer.public_key());
    }

    #[test]
    fn test_deterministic_signatures() {
        let signer = Secp256k1Signer::from_bytes([0xABu8; 32]).unwrap();
        let digest = [7u8; 32];
        assert_eq!(signer.sign(&digest).unwrap(), signer.sign(&digest).unwrap());
    }

    #[test]
    fn test_compressed_public_key() {
        let signer = Secp256k1Signer::from_bytes([0x11u8; 32]).unwrap();
        let key = signer.public_key();
        assert_eq!(key.len(), 33);
        assert!(key[0] == 0x02 || key[0] == 0x03);
    }

    #[test]
    fn test_from_hex() {
        let hex_key = format!("0x{}", "11".repeat(32));
        let a = Secp256k1Signer::from_hex(&hex_key).unwrap();
        let b = Secp256k1Signer::from_bytes([0x11u8; 32]).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert!(Secp256k1Signer::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_zero_key_rejected() {
        assert!(Secp256k1Signer::from_bytes([0u8; 32]).is_err());
    }

    #[test]
    fn test_wrong_digest_recovers_other_key() {
        let signer = Secp256k1Signer::generate();
        let signature = signer.sign(&[1u8; 32]).unwrap();
        let recovered = recover_public_key(&[2u8; 32], &signature);
        assert!(recovered.map(|k| k != signer.public_key()).unwrap_or(true));
    }
}
