use std::borrow::Cow;

use alloy::dyn_abi::TypedData;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};

use crate::account::session::FrozenAccount;
use crate::codec::abi::{CallData, ExecuteWithAuthorization};
use crate::constants::{DEFAULT_VALIDITY_SECS, DEFAULT_VALID_AFTER, DOMAIN_NAME, DOMAIN_VERSION};
use crate::errors::AccountResult;
use crate::signers::SignPrompt;

/// A call the owner asks the account to execute on their behalf.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthorizationRequest {
    pub to: Address,
    pub value: U256,
    pub data: CallData,
    pub valid_after: Option<u64>,
    pub valid_before: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub button_text: Option<String>,
}

impl AuthorizationRequest {
    pub fn new(to: Address, data: impl Into<CallData>) -> Self {
        Self { to, data: data.into(), ..Default::default() }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_validity(mut self, valid_after: Option<u64>, valid_before: Option<u64>) -> Self {
        self.valid_after = valid_after;
        self.valid_before = valid_before;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_button_text(mut self, button_text: impl Into<String>) -> Self {
        self.button_text = Some(button_text.into());
        self
    }

    /// Prompt text, falling back to the encoded function name as description.
    pub fn prompt(&self) -> SignPrompt {
        let defaults = SignPrompt::default();
        SignPrompt {
            title: self.title.clone().unwrap_or(defaults.title),
            description: self
                .description
                .clone()
                .or_else(|| self.data.function_name().map(str::to_string))
                .unwrap_or(defaults.description),
            button_text: self.button_text.clone().unwrap_or(defaults.button_text),
        }
    }
}

/// EIP-712 document presented to the owner key, frozen for the rest of the send.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationDocument {
    pub account: FrozenAccount,
    pub domain: Eip712Domain,
    pub message: ExecuteWithAuthorization,
    pub prompt: SignPrompt,
}

impl AuthorizationDocument {
    pub fn typed_data(&self) -> TypedData {
        TypedData::from_struct(&self.message, Some(self.domain.clone()))
    }

    pub fn signing_hash(&self) -> B256 {
        self.message.eip712_signing_hash(&self.domain)
    }
}

/// An authorization document together with the owner's signature over it.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedAuthorization {
    pub document: AuthorizationDocument,
    pub signature: Bytes,
}

impl SignedAuthorization {
    pub fn account(&self) -> &FrozenAccount {
        &self.document.account
    }
}

/// Domain of the smart account at `account` on the chain identified by `chain_id`.
pub fn account_domain(account: Address, chain_id: U256) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(chain_id),
        Some(account),
        None,
    )
}

/// Builds the document for `request`; `now` is the current unix time in seconds.
///
/// Encoded call data is ABI encoded here, once.
pub fn build_authorization(
    request: &AuthorizationRequest,
    account: &FrozenAccount,
    now: u64,
) -> AccountResult<AuthorizationDocument> {
    let data = request.data.resolve()?;
    let valid_after = request.valid_after.unwrap_or(DEFAULT_VALID_AFTER);
    let valid_before = request.valid_before.unwrap_or(now + DEFAULT_VALIDITY_SECS);

    Ok(AuthorizationDocument {
        account: *account,
        domain: account_domain(account.address, account.chain.chain_id()),
        message: ExecuteWithAuthorization {
            to: request.to,
            value: request.value,
            data,
            validAfter: U256::from(valid_after),
            validBefore: U256::from(valid_before),
        },
        prompt: request.prompt(),
    })
}
