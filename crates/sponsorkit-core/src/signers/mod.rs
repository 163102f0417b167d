pub mod relay;
pub mod secret_key;

use alloy::dyn_abi::TypedData;
use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::constants::{DEFAULT_PROMPT_BUTTON, DEFAULT_PROMPT_DESCRIPTION, DEFAULT_PROMPT_TITLE};

pub use relay::RelayIdentity;
pub use secret_key::SecretKeyCustody;

/// Text shown to the owner while the custody service asks for a signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignPrompt {
    pub title: String,
    pub description: String,
    pub button_text: String,
}

impl Default for SignPrompt {
    fn default() -> Self {
        Self {
            title: DEFAULT_PROMPT_TITLE.to_string(),
            description: DEFAULT_PROMPT_DESCRIPTION.to_string(),
            button_text: DEFAULT_PROMPT_BUTTON.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("signature request rejected: {0}")]
    Rejected(String),
    #[error("key custody unavailable: {0}")]
    Unavailable(String),
}

/// Service holding the owner key. The key itself never leaves it.
#[async_trait]
pub trait KeyCustody: Send + Sync {
    /// Address of the connected owner key, `None` when no wallet is connected.
    fn owner_address(&self) -> Option<Address>;

    /// Signs an EIP-712 document, returning the 65 byte `r ‖ s ‖ v` signature.
    async fn sign_typed_data(
        &self,
        document: &TypedData,
        prompt: &SignPrompt,
    ) -> Result<Bytes, CustodyError>;
}
