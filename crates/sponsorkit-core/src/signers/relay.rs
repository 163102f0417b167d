use std::fmt;

use alloy::primitives::{Address, B256};

use crate::codec::crypto::{
    secret_key_to_secret_key_signer, sign_hash_recoverable, SecretKeySigner, SIGNATURE_LENGTH,
};
use crate::errors::AccountResult;

lazy_static! {
    static ref PROCESS_RELAY_IDENTITY: RelayIdentity = RelayIdentity::random();
}

/// Disposable key used as transaction origin. Holds no funds; the sponsor pays gas.
#[derive(Clone)]
pub struct RelayIdentity {
    signer: SecretKeySigner,
}

impl RelayIdentity {
    pub fn random() -> Self {
        Self { signer: SecretKeySigner::random() }
    }

    pub fn from_secret_key(secret_key: &[u8]) -> AccountResult<Self> {
        Ok(Self { signer: secret_key_to_secret_key_signer(secret_key)? })
    }

    /// Identity shared by every pipeline of this process, generated on first use.
    pub fn process_wide() -> &'static RelayIdentity {
        &PROCESS_RELAY_IDENTITY
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn sign_hash(&self, hash: &B256) -> AccountResult<[u8; SIGNATURE_LENGTH]> {
        sign_hash_recoverable(&self.signer, hash)
    }
}

impl fmt::Debug for RelayIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayIdentity").field("address", &self.address()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::crypto::recover_signer;

    #[test]
    fn test_process_wide_identity_is_stable() {
        let first = RelayIdentity::process_wide().address();
        let second = RelayIdentity::process_wide().address();
        assert_eq!(first, second);
        assert_ne!(RelayIdentity::random().address(), first);
    }

    #[test]
    fn test_sign_hash_recovers_to_relay_address() {
        let relay = RelayIdentity::from_secret_key(&[0x42; 32]).unwrap();
        let hash = B256::repeat_byte(0x07);
        let signature = relay.sign_hash(&hash).unwrap();
        assert_eq!(recover_signer(&hash, &signature).unwrap(), relay.address());
    }

    #[test]
    fn test_debug_hides_key() {
        let relay = RelayIdentity::from_secret_key(&[0x42; 32]).unwrap();
        let debug = format!("{:?}", relay);
        assert!(debug.contains("address"));
        assert!(!debug.contains("4242424242"));
    }
}
