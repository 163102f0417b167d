use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use error_stack::{Report, ResultExt};
use tokio::sync::RwLock;

use crate::codec::abi::{decode_address_word, owner_salt, IAccountFactory};
use crate::codec::transaction::Clause;
use crate::errors::{AccountError, AccountResult, PreconditionError, RpcError};
use crate::rpc::{GasEstimate, ThorNode};

/// Genesis block id of the connected network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainIdentity(B256);

impl ChainIdentity {
    pub fn new(genesis_id: B256) -> Self {
        Self(genesis_id)
    }

    pub fn genesis_id(&self) -> B256 {
        self.0
    }

    /// The genesis id read as a 256-bit integer, used as the EIP-712 `chainId`.
    pub fn chain_id(&self) -> U256 {
        U256::from_be_bytes(self.0 .0)
    }

    /// Last byte of the genesis id, carried by every transaction body.
    pub fn chain_tag(&self) -> u8 {
        self.0[31]
    }
}

/// Account details frozen at the start of a send and reused unchanged until submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrozenAccount {
    pub owner: Address,
    pub address: Address,
    pub chain: ChainIdentity,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub owner: Option<Address>,
    pub account_address: Option<Address>,
    /// Owner the current `account_address` was derived for.
    pub derived_for: Option<Address>,
    pub chain: Option<ChainIdentity>,
}

impl SessionSnapshot {
    pub fn freeze(&self) -> AccountResult<FrozenAccount> {
        let owner = self.owner.ok_or_else(|| {
            Report::new(AccountError::Precondition(PreconditionError::MissingOwner))
        })?;
        let address = self.account_address.ok_or_else(|| {
            Report::new(AccountError::Precondition(PreconditionError::MissingAccountAddress))
        })?;
        match self.derived_for {
            Some(derived_for) if derived_for == owner => {}
            Some(derived_for) => {
                return Err(Report::new(AccountError::Precondition(
                    PreconditionError::StaleAccountAddress { owner, derived_for },
                )))
            }
            None => {
                return Err(Report::new(AccountError::Precondition(
                    PreconditionError::MissingAccountAddress,
                )))
            }
        }
        let chain = self.chain.ok_or_else(|| {
            Report::new(AccountError::Precondition(PreconditionError::ChainIdentityUnresolved))
        })?;
        Ok(FrozenAccount { owner, address, chain })
    }
}

/// Owner, derived account address and chain identity of one connected wallet.
///
/// State only changes through explicit calls made on identity change events.
pub struct AccountSession {
    node: Arc<dyn ThorNode>,
    factory: Address,
    state: RwLock<SessionSnapshot>,
}

impl AccountSession {
    pub fn new(node: Arc<dyn ThorNode>, factory: Address) -> Self {
        Self { node, factory, state: RwLock::new(SessionSnapshot::default()) }
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        *self.state.read().await
    }

    /// Account address, present only when derived for the current owner.
    pub async fn account_address(&self) -> Option<Address> {
        let state = self.state.read().await;
        match (state.owner, state.derived_for) {
            (Some(owner), Some(derived_for)) if owner == derived_for => state.account_address,
            _ => None,
        }
    }

    /// Resolves the chain identity from the genesis block.
    pub async fn refresh_chain_identity(&self) -> AccountResult<ChainIdentity> {
        let genesis_id = self.node.genesis_id().await?;
        let chain = ChainIdentity::new(genesis_id);
        self.state.write().await.chain = Some(chain);
        log::debug!("chain identity resolved, tag {:#04x}", chain.chain_tag());
        Ok(chain)
    }

    /// Records a new owner and derives its account address.
    ///
    /// An absent owner clears the address. A failed derivation is logged and
    /// leaves the previous address in place; sends stay blocked until a later
    /// call succeeds.
    pub async fn set_owner(&self, owner: Option<Address>) -> Option<Address> {
        let Some(owner) = owner else {
            let mut state = self.state.write().await;
            let chain = state.chain;
            *state = SessionSnapshot { chain, ..Default::default() };
            log::debug!("owner disconnected, account address cleared");
            return None;
        };

        self.state.write().await.owner = Some(owner);
        match derive_account_address(self.node.as_ref(), self.factory, owner).await {
            Ok(address) => {
                let mut state = self.state.write().await;
                // the owner may have changed again while deriving
                if state.owner != Some(owner) {
                    return None;
                }
                state.account_address = Some(address);
                state.derived_for = Some(owner);
                log::debug!("account address for owner {} is {}", owner, address);
                Some(address)
            }
            Err(report) => {
                log::warn!("unable to derive account address for owner {}: {:?}", owner, report);
                None
            }
        }
    }
}

/// Reads the counterfactual account address of `owner` from the factory.
pub async fn derive_account_address(
    node: &dyn ThorNode,
    factory: Address,
    owner: Address,
) -> AccountResult<Address> {
    let call = IAccountFactory::getAddressCall { owner, salt: owner_salt(&owner) };
    let outputs = node
        .inspect_clauses(&[Clause::call(factory, call.abi_encode())], None)
        .await
        .attach_printable(format!("Deriving account address for owner {}", owner))?;

    let output = outputs.first().ok_or_else(|| {
        Report::new(AccountError::Rpc(RpcError::InvalidResponse(
            "factory call returned no output".to_string(),
        )))
    })?;
    if output.reverted {
        let reason = GasEstimate::first_revert(&outputs[..1])
            .map(|(_, reason)| reason)
            .unwrap_or_default();
        return Err(Report::new(AccountError::Rpc(RpcError::NodeError(format!(
            "getAddress reverted: {}",
            reason
        )))));
    }
    decode_address_word(&output.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    #[test]
    fn test_chain_identity_from_genesis() {
        let chain = ChainIdentity::new(b256!(
            "0x000000000b2bce3c70bc649a02749e8687721b09ed2e15997f466536b20bb127"
        ));
        assert_eq!(chain.chain_tag(), 0x27);
        assert_eq!(
            chain.chain_id(),
            U256::from_str_radix(
                "000000000b2bce3c70bc649a02749e8687721b09ed2e15997f466536b20bb127",
                16
            )
            .unwrap()
        );
    }

    #[test]
    fn test_freeze_requires_owner_address_and_chain() {
        let owner = address!("0x00000000000000000000000000000000000000a1");
        let account = address!("0x00000000000000000000000000000000000000c1");
        let chain = ChainIdentity::new(B256::repeat_byte(0x27));

        let snapshot = SessionSnapshot::default();
        assert_eq!(
            snapshot.freeze().unwrap_err().current_context(),
            &AccountError::Precondition(PreconditionError::MissingOwner)
        );

        let snapshot = SessionSnapshot { owner: Some(owner), ..Default::default() };
        assert_eq!(
            snapshot.freeze().unwrap_err().current_context(),
            &AccountError::Precondition(PreconditionError::MissingAccountAddress)
        );

        let snapshot = SessionSnapshot {
            owner: Some(owner),
            account_address: Some(account),
            derived_for: Some(owner),
            chain: None,
        };
        assert_eq!(
            snapshot.freeze().unwrap_err().current_context(),
            &AccountError::Precondition(PreconditionError::ChainIdentityUnresolved)
        );

        let frozen = SessionSnapshot { chain: Some(chain), ..snapshot }.freeze().unwrap();
        assert_eq!(frozen, FrozenAccount { owner, address: account, chain });
    }

    #[test]
    fn test_freeze_rejects_address_of_previous_owner() {
        let previous = address!("0x00000000000000000000000000000000000000a1");
        let current = address!("0x00000000000000000000000000000000000000a2");
        let snapshot = SessionSnapshot {
            owner: Some(current),
            account_address: Some(address!("0x00000000000000000000000000000000000000c1")),
            derived_for: Some(previous),
            chain: Some(ChainIdentity::new(B256::ZERO)),
        };
        assert_eq!(
            snapshot.freeze().unwrap_err().current_context(),
            &AccountError::Precondition(PreconditionError::StaleAccountAddress {
                owner: current,
                derived_for: previous
            })
        );
    }
}
