use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use error_stack::{Report, ResultExt};

use crate::account::authorization::SignedAuthorization;
use crate::account::session::FrozenAccount;
use crate::codec::abi::{owner_salt, IAccountFactory, ISmartAccount};
use crate::codec::transaction::Clause;
use crate::errors::{AccountError, AccountResult, EstimationError, PreconditionError, RpcError};
use crate::rpc::ThorNode;

/// Ordered clauses executing one signed authorization, deploying the account first when needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallPlan {
    pub account: FrozenAccount,
    pub clauses: Vec<Clause>,
    pub deploys_account: bool,
}

impl CallPlan {
    /// Assembles the plan from the account code presence.
    pub fn assemble(signed: &SignedAuthorization, factory: Address, has_code: bool) -> Self {
        let account = *signed.account();
        let mut clauses = Vec::with_capacity(2);
        if !has_code {
            clauses.push(deployment_clause(factory, account.owner));
        }
        clauses.push(execution_clause(signed));
        Self { account, clauses, deploys_account: !has_code }
    }

    pub fn execution(&self) -> Option<&Clause> {
        self.clauses.last()
    }
}

/// `createAccount(owner, uint256(owner))` on the factory.
pub fn deployment_clause(factory: Address, owner: Address) -> Clause {
    let call = IAccountFactory::createAccountCall { owner, salt: owner_salt(&owner) };
    Clause::call(factory, call.abi_encode())
}

/// `executeWithAuthorization` on the account, with the signed fields passed verbatim.
///
/// The clause itself carries no value; the account pays `value` out of its own balance.
pub fn execution_clause(signed: &SignedAuthorization) -> Clause {
    let message = &signed.document.message;
    let call = ISmartAccount::executeWithAuthorizationCall {
        to: message.to,
        value: message.value,
        data: message.data.clone(),
        validAfter: message.validAfter,
        validBefore: message.validBefore,
        signature: signed.signature.clone(),
    };
    Clause::call(signed.account().address, call.abi_encode())
}

/// Fails unless `signed` was produced for `target`'s account and chain.
pub fn ensure_same_domain(signed: &SignedAuthorization, target: &FrozenAccount) -> AccountResult<()> {
    let domain = &signed.document.domain;
    let signed_account = domain.verifying_contract.unwrap_or(signed.account().address);
    if signed_account != target.address {
        return Err(Report::new(AccountError::Precondition(PreconditionError::AccountMismatch {
            signed: signed_account,
            planned: target.address,
        })));
    }
    let signed_chain = signed.account().chain;
    if domain.chain_id != Some(target.chain.chain_id()) || signed_chain != target.chain {
        return Err(Report::new(AccountError::Precondition(PreconditionError::ChainMismatch {
            signed: signed_chain.chain_tag(),
            planned: target.chain.chain_tag(),
        })));
    }
    Ok(())
}

/// Reads the account code presence and assembles the plan for `target`.
pub async fn build_call_plan(
    node: &dyn ThorNode,
    factory: Address,
    signed: &SignedAuthorization,
    target: &FrozenAccount,
) -> AccountResult<CallPlan> {
    ensure_same_domain(signed, target)?;

    let account = node
        .get_account(&target.address)
        .await
        .map_err(|report| {
            let cause = match report.current_context() {
                AccountError::Rpc(RpcError::Timeout) => EstimationError::Timeout,
                other => EstimationError::Unavailable(other.to_string()),
            };
            report.change_context(AccountError::EstimationFailed(cause))
        })
        .attach_printable(format!("Checking deployment of account {}", target.address))?;

    let plan = CallPlan::assemble(signed, factory, account.has_code);
    log::debug!(
        "planned {} clause(s) for account {}, deploying: {}",
        plan.clauses.len(),
        target.address,
        plan.deploys_account
    );
    Ok(plan)
}
