use alloy::primitives::{Address, B256};
use alloy::signers::k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use alloy_signer_local::LocalSigner;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use error_stack::Report;

use crate::errors::{AccountError, AccountResult, CodecError};

pub type SecretKeySigner = LocalSigner<SigningKey>;

type Blake2b256 = Blake2b<U32>;

pub const SIGNATURE_LENGTH: usize = 65;

/// blake2b with a 256 bit digest over the concatenation of `chunks`.
pub fn blake2b256(chunks: &[&[u8]]) -> B256 {
    let mut hasher = Blake2b256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    B256::from_slice(&hasher.finalize())
}

pub fn secret_key_to_secret_key_signer(secret_key: &[u8]) -> AccountResult<SecretKeySigner> {
    let signing_key = SigningKey::from_slice(secret_key).map_err(|e| {
        Report::new(AccountError::Codec(CodecError::InvalidKey(format!(
            "failed to generate signing key from secret key: {e}"
        ))))
    })?;
    Ok(SecretKeySigner::from_signing_key(signing_key))
}

/// Signs a prehashed message, producing `r ‖ s ‖ v` with `v` in `{0, 1}`.
pub fn sign_hash_recoverable(
    signer: &SecretKeySigner,
    hash: &B256,
) -> AccountResult<[u8; SIGNATURE_LENGTH]> {
    let (signature, recovery_id) =
        signer.credential().sign_prehash_recoverable(hash.as_slice()).map_err(|e| {
            Report::new(AccountError::Codec(CodecError::InvalidSignature(e.to_string())))
        })?;
    let mut out = [0u8; SIGNATURE_LENGTH];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Recovers the signer of a `r ‖ s ‖ v` signature over a prehashed message.
pub fn recover_signer(hash: &B256, signature: &[u8]) -> AccountResult<Address> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(Report::new(AccountError::Codec(CodecError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        )))));
    }
    let parsed = Signature::from_slice(&signature[..64]).map_err(|e| {
        Report::new(AccountError::Codec(CodecError::InvalidSignature(e.to_string())))
    })?;
    let v = signature[64];
    let recovery_id = RecoveryId::from_byte(if v >= 27 { v - 27 } else { v }).ok_or_else(|| {
        Report::new(AccountError::Codec(CodecError::InvalidSignature(format!(
            "invalid recovery id {}",
            v
        ))))
    })?;
    let verifying_key = VerifyingKey::recover_from_prehash(hash.as_slice(), &parsed, recovery_id)
        .map_err(|e| {
            Report::new(AccountError::Codec(CodecError::InvalidSignature(e.to_string())))
        })?;
    Ok(Address::from_public_key(&verifying_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{b256, keccak256};

    #[test]
    fn test_blake2b256_empty_input() {
        assert_eq!(
            blake2b256(&[]),
            b256!("0x0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8")
        );
    }

    #[test]
    fn test_blake2b256_concatenates_chunks() {
        assert_eq!(blake2b256(&[b"hello ", b"world"]), blake2b256(&[b"hello world"]));
        assert_ne!(blake2b256(&[b"hello"]), blake2b256(&[b"world"]));
    }

    #[test]
    fn test_sign_and_recover() {
        let signer = secret_key_to_secret_key_signer(&[0x11; 32]).unwrap();
        let hash = keccak256(b"sponsored");
        let signature = sign_hash_recoverable(&signer, &hash).unwrap();
        assert!(signature[64] <= 1);
        assert_eq!(recover_signer(&hash, &signature).unwrap(), signer.address());
    }

    #[test]
    fn test_invalid_secret_key() {
        assert!(secret_key_to_secret_key_signer(&[0u8; 32]).is_err());
        assert!(secret_key_to_secret_key_signer(&[1u8; 12]).is_err());
    }

    #[test]
    fn test_recover_rejects_short_signature() {
        let hash = keccak256(b"sponsored");
        assert!(recover_signer(&hash, &[0u8; 64]).is_err());
    }
}
