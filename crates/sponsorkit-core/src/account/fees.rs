use std::time::Duration;

use alloy::primitives::Address;
use error_stack::{Report, ResultExt};

use crate::account::call_plan::CallPlan;
use crate::errors::{AccountError, AccountResult, EstimationError, RpcError};
use crate::rpc::{GasEstimate, ThorNode};

/// Simulates `plan` from `caller` and returns the gas to request.
///
/// Reverted clauses, transport failures and an elapsed `timeout` all fail with
/// `EstimationFailed`.
pub async fn estimate_fee(
    node: &dyn ThorNode,
    plan: &CallPlan,
    caller: Address,
    timeout: Option<Duration>,
) -> AccountResult<GasEstimate> {
    let simulation = node.estimate_gas(&plan.clauses, Some(caller));
    let estimate = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, simulation).await.map_err(|_| {
            Report::new(AccountError::EstimationFailed(EstimationError::Timeout))
                .attach_printable(format!("Simulation did not complete within {:?}", timeout))
        })?,
        None => simulation.await,
    }
    .map_err(|report| {
        let cause = match report.current_context() {
            AccountError::Rpc(RpcError::Timeout) => EstimationError::Timeout,
            other => EstimationError::Unavailable(other.to_string()),
        };
        report.change_context(AccountError::EstimationFailed(cause))
    })
    .attach_printable(format!("Estimating {} clause(s)", plan.clauses.len()))?;

    if let Some((clause_index, reason)) = estimate.first_reverted.clone() {
        return Err(Report::new(AccountError::EstimationFailed(EstimationError::Reverted {
            clause_index,
            reason,
        })));
    }

    log::debug!("estimated {} gas for {} clause(s)", estimate.total_gas, plan.clauses.len());
    Ok(estimate)
}
