use alloy::dyn_abi::TypedData;
use alloy::primitives::{Address, Bytes};
use alloy::signers::SignerSync;
use async_trait::async_trait;

use super::{CustodyError, KeyCustody, SignPrompt};
use crate::codec::crypto::{secret_key_to_secret_key_signer, SecretKeySigner};
use crate::errors::AccountResult;

/// Custody backed by an in-process secret key. Signs without prompting.
#[derive(Clone, Debug)]
pub struct SecretKeyCustody {
    signer: SecretKeySigner,
}

impl SecretKeyCustody {
    pub fn new(signer: SecretKeySigner) -> Self {
        Self { signer }
    }

    pub fn from_secret_key(secret_key: &[u8]) -> AccountResult<Self> {
        Ok(Self::new(secret_key_to_secret_key_signer(secret_key)?))
    }
}

#[async_trait]
impl KeyCustody for SecretKeyCustody {
    fn owner_address(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn sign_typed_data(
        &self,
        document: &TypedData,
        prompt: &SignPrompt,
    ) -> Result<Bytes, CustodyError> {
        log::debug!("signing '{}' with local key {}", prompt.title, self.signer.address());
        let hash = document
            .eip712_signing_hash()
            .map_err(|e| CustodyError::Unavailable(format!("unable to hash typed data: {e}")))?;
        let signature = self
            .signer
            .sign_hash_sync(&hash)
            .map_err(|e| CustodyError::Unavailable(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}
