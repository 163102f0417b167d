use std::sync::Arc;
use std::time::Duration;

use error_stack::{Report, ResultExt};

use crate::account::call_plan::CallPlan;
use crate::codec::crypto::{recover_signer, SIGNATURE_LENGTH};
use crate::codec::transaction::{BodyOptions, TransactionBody};
use crate::errors::{
    AccountError, AccountResult, PreconditionError, RpcError, SubmissionError, TransactionContext,
};
use crate::rpc::{Delegator, ThorNode, TransactionId};
use crate::signers::RelayIdentity;

/// Wraps call plans into fee delegated transactions and broadcasts them.
///
/// The relay identity is the transaction origin and never holds funds; the
/// delegator co-signs as gas payer.
#[derive(Clone)]
pub struct DelegatedSubmitter {
    node: Arc<dyn ThorNode>,
    delegator: Arc<dyn Delegator>,
    relay: RelayIdentity,
}

impl DelegatedSubmitter {
    pub fn new(node: Arc<dyn ThorNode>, delegator: Arc<dyn Delegator>, relay: RelayIdentity) -> Self {
        Self { node, delegator, relay }
    }

    pub fn with_relay(mut self, relay: RelayIdentity) -> Self {
        self.relay = relay;
        self
    }

    pub fn relay(&self) -> &RelayIdentity {
        &self.relay
    }

    pub async fn submit(
        &self,
        plan: &CallPlan,
        gas: u64,
        timeout: Option<Duration>,
    ) -> AccountResult<TransactionId> {
        let context = TransactionContext {
            origin: self.relay.address(),
            clauses: plan.clauses.len(),
            gas,
            chain_tag: plan.account.chain.chain_tag(),
        };
        let submission = self.sign_and_broadcast(plan, gas);
        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, submission).await.map_err(|_| {
                Report::new(AccountError::SubmissionFailed(SubmissionError::Timeout))
                    .attach_printable(format!("Submission did not complete within {:?}", timeout))
            })?,
            None => submission.await,
        };
        result.attach(context)
    }

    async fn sign_and_broadcast(&self, plan: &CallPlan, gas: u64) -> AccountResult<TransactionId> {
        let origin = self.relay.address();

        let body = self
            .node
            .build_transaction_body(plan.clauses.clone(), gas, &BodyOptions::delegated())
            .await
            .map_err(|report| into_submission_failure(report, Stage::Node))
            .attach_printable("Building transaction body")?;
        let planned_tag = plan.account.chain.chain_tag();
        if body.chain_tag != planned_tag {
            return Err(Report::new(AccountError::Precondition(PreconditionError::ChainMismatch {
                signed: planned_tag,
                planned: body.chain_tag,
            })));
        }

        let gas_payer_signature = self
            .delegator
            .co_sign(&origin, &body.encode_unsigned())
            .await
            .map_err(|report| into_submission_failure(report, Stage::Delegator))
            .attach_printable("Requesting gas payer signature")?;
        let gas_payer = recover_signer(&body.delegator_signing_hash(&origin), &gas_payer_signature)
            .map_err(|report| {
                report.change_context(AccountError::SubmissionFailed(
                    SubmissionError::MalformedResponse(
                        "gas payer signature does not recover".to_string(),
                    ),
                ))
            })?;
        log::debug!("gas payer {} co-signed transaction from {}", gas_payer, origin);

        let raw = self.finalize(&body, &gas_payer_signature)?;

        let id = self
            .node
            .broadcast_raw(&raw)
            .await
            .map_err(|report| into_submission_failure(report, Stage::Node))
            .attach_printable("Broadcasting transaction")?;

        let expected = body.id(&origin);
        if !id.matches(&expected) {
            log::warn!("node returned transaction id {}, expected {:#x}", id, expected);
        }
        log::info!("broadcast transaction {} with {} clause(s)", id, body.clauses.len());
        Ok(id)
    }

    /// Appends `origin signature ‖ gas payer signature` to the body.
    fn finalize(
        &self,
        body: &TransactionBody,
        gas_payer_signature: &[u8; SIGNATURE_LENGTH],
    ) -> AccountResult<Vec<u8>> {
        let origin_signature = self.relay.sign_hash(&body.signing_hash()).map_err(|report| {
            let reason = report.current_context().to_string();
            report.change_context(AccountError::SubmissionFailed(SubmissionError::Signing(reason)))
        })?;
        let mut signature = Vec::with_capacity(2 * SIGNATURE_LENGTH);
        signature.extend_from_slice(&origin_signature);
        signature.extend_from_slice(gas_payer_signature);
        Ok(body.encode_signed(&signature))
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Node,
    Delegator,
}

fn into_submission_failure(report: Report<AccountError>, stage: Stage) -> Report<AccountError> {
    let cause = match (report.current_context(), stage) {
        (AccountError::Rpc(RpcError::StatusCode { body, .. }), Stage::Delegator) => {
            SubmissionError::DelegationRefused(body.clone())
        }
        (AccountError::Rpc(RpcError::StatusCode { status, body }), Stage::Node) => {
            SubmissionError::BroadcastRejected { status: *status, body: body.clone() }
        }
        (AccountError::Rpc(RpcError::InvalidResponse(reason)), _) => {
            SubmissionError::MalformedResponse(reason.clone())
        }
        (AccountError::Rpc(RpcError::Timeout), _) => SubmissionError::Timeout,
        (AccountError::Rpc(RpcError::Transport(reason)), _) => {
            SubmissionError::Transport(reason.clone())
        }
        (AccountError::SubmissionFailed(cause), _) => cause.clone(),
        (AccountError::Precondition(_), _) => return report,
        (other, Stage::Delegator) => SubmissionError::DelegationRefused(other.to_string()),
        (other, Stage::Node) => SubmissionError::Transport(other.to_string()),
    };
    report.change_context(AccountError::SubmissionFailed(cause))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(error: RpcError) -> Report<AccountError> {
        Report::new(AccountError::Rpc(error))
    }

    #[test]
    fn test_delegator_status_is_refusal() {
        let report = into_submission_failure(
            rpc(RpcError::StatusCode { status: 403, body: "quota exceeded".to_string() }),
            Stage::Delegator,
        );
        assert_eq!(
            report.current_context(),
            &AccountError::SubmissionFailed(SubmissionError::DelegationRefused(
                "quota exceeded".to_string()
            ))
        );
    }

    #[test]
    fn test_node_status_is_broadcast_rejection() {
        let report = into_submission_failure(
            rpc(RpcError::StatusCode { status: 400, body: "bad tx: insufficient energy".to_string() }),
            Stage::Node,
        );
        assert_eq!(
            report.current_context(),
            &AccountError::SubmissionFailed(SubmissionError::BroadcastRejected {
                status: 400,
                body: "bad tx: insufficient energy".to_string()
            })
        );
    }

    #[test]
    fn test_transport_failures_keep_their_cause() {
        let report = into_submission_failure(rpc(RpcError::Timeout), Stage::Node);
        assert_eq!(
            report.current_context(),
            &AccountError::SubmissionFailed(SubmissionError::Timeout)
        );
        assert!(report.current_context().is_transient());

        let report =
            into_submission_failure(rpc(RpcError::InvalidResponse("eof".to_string())), Stage::Delegator);
        assert_eq!(
            report.current_context(),
            &AccountError::SubmissionFailed(SubmissionError::MalformedResponse("eof".to_string()))
        );
    }
}
