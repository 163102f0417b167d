use alloy::dyn_abi::TypedData;
use alloy::hex;
use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use sponsorkit_core::signers::{CustodyError, KeyCustody, SecretKeyCustody, SignPrompt};

use super::env::{get_env_var, OWNER_KEY_KEY};

/// Owner key held by the terminal user; every signature is confirmed interactively.
pub struct TerminalCustody {
    inner: SecretKeyCustody,
    auto_approve: bool,
}

impl TerminalCustody {
    pub fn new(inner: SecretKeyCustody, auto_approve: bool) -> Self {
        Self { inner, auto_approve }
    }

    /// Reads the owner key from `SPONSORKIT_OWNER_KEY`.
    pub fn from_env(auto_approve: bool) -> Result<Self, String> {
        let secret = get_env_var(OWNER_KEY_KEY)
            .ok_or_else(|| format!("missing required value '{}'", OWNER_KEY_KEY))?;
        let bytes = hex::decode(secret.trim())
            .map_err(|e| format!("invalid value for '{}': {}", OWNER_KEY_KEY, e))?;
        let inner = SecretKeyCustody::from_secret_key(&bytes).map_err(|e| e.to_string())?;
        Ok(Self::new(inner, auto_approve))
    }
}

/// One line per message field, in declaration order.
pub fn summarize(document: &TypedData) -> Vec<String> {
    match document.message.as_object() {
        Some(fields) => fields.iter().map(|(name, value)| format!("{}: {}", name, value)).collect(),
        None => vec![document.message.to_string()],
    }
}

#[async_trait]
impl KeyCustody for TerminalCustody {
    fn owner_address(&self) -> Option<Address> {
        self.inner.owner_address()
    }

    async fn sign_typed_data(
        &self,
        document: &TypedData,
        prompt: &SignPrompt,
    ) -> Result<Bytes, CustodyError> {
        if !self.auto_approve {
            println!("\n{}", yellow!("{}", prompt.title));
            if !prompt.description.trim().is_empty() {
                println!("{}", prompt.description);
            }
            for line in summarize(document) {
                println!("  {}", black!("{}", line));
            }

            let question = format!("{}?", prompt.button_text);
            let approved = tokio::task::spawn_blocking(move || {
                Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(question)
                    .default(false)
                    .interact()
            })
            .await
            .map_err(|e| CustodyError::Unavailable(e.to_string()))?
            .map_err(|e| CustodyError::Unavailable(e.to_string()))?;

            if !approved {
                return Err(CustodyError::Rejected("declined in terminal".to_string()));
            }
        }
        self.inner.sign_typed_data(document, prompt).await
    }
}
