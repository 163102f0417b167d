use alloy::primitives::Address;
use error_stack::Report;
use std::fmt;

pub type AccountResult<T> = Result<T, Report<AccountError>>;

/// Top level error kinds surfaced by the account pipeline.
///
/// Every failure leaving a pipeline step is tagged with exactly one of the
/// step kinds (`Precondition`, `AuthorizationDeclined`, `EstimationFailed`,
/// `SubmissionFailed`) or with `Config` at startup. `Rpc` and `Codec` describe
/// the underlying cause and are re-tagged with `change_context` at the step
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("precondition failed: {0}")]
    Precondition(PreconditionError),
    #[error("authorization declined: {0}")]
    AuthorizationDeclined(String),
    #[error("gas estimation failed: {0}")]
    EstimationFailed(EstimationError),
    #[error("submission failed: {0}")]
    SubmissionFailed(SubmissionError),
    #[error("configuration error: {0}")]
    Config(ConfigError),
    #[error("node error: {0}")]
    Rpc(RpcError),
    #[error("codec error: {0}")]
    Codec(CodecError),
}

impl AccountError {
    /// Infrastructure failures worth retrying from the call plan step.
    pub fn is_transient(&self) -> bool {
        match self {
            AccountError::SubmissionFailed(_) => true,
            AccountError::EstimationFailed(EstimationError::Timeout)
            | AccountError::EstimationFailed(EstimationError::Unavailable(_)) => true,
            AccountError::Rpc(RpcError::Transport(_)) | AccountError::Rpc(RpcError::Timeout) => {
                true
            }
            _ => false,
        }
    }

    /// User or logic failures: nothing was broadcast and retrying as-is will not help.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AccountError::AuthorizationDeclined(_)
                | AccountError::EstimationFailed(EstimationError::Reverted { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("no owner key is connected")]
    MissingOwner,
    #[error("account address has not been derived yet")]
    MissingAccountAddress,
    #[error("account address was derived for owner {derived_for}, not {owner}")]
    StaleAccountAddress { owner: Address, derived_for: Address },
    #[error("chain identity has not been resolved")]
    ChainIdentityUnresolved,
    #[error("call data cannot be encoded: {0}")]
    InvalidCallData(String),
    #[error("authorization was signed for account {signed}, plan targets {planned}")]
    AccountMismatch { signed: Address, planned: Address },
    #[error("authorization was signed for chain tag {signed:#04x}, plan targets {planned:#04x}")]
    ChainMismatch { signed: u8, planned: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimationError {
    #[error("clause {clause_index} reverted: {reason}")]
    Reverted { clause_index: usize, reason: String },
    #[error("estimation unavailable: {0}")]
    Unavailable(String),
    #[error("estimation timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("sponsor refused to co-sign: {0}")]
    DelegationRefused(String),
    #[error("node rejected transaction (status {status}): {body}")]
    BroadcastRejected { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("unable to finalize transaction: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required value '{field}'")]
    Missing { field: String },
    #[error("invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("{0}")]
    NodeError(String),
    #[error("status {status}: {body}")]
    StatusCode { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid function signature '{0}'")]
    InvalidFunction(String),
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCountMismatch { expected: usize, got: usize },
    #[error("argument {index} is not a valid {ty}: {reason}")]
    InvalidArgument { index: usize, ty: String, reason: String },
    #[error("ABI encoding failed: {0}")]
    AbiEncodingFailed(String),
    #[error("ABI decoding failed: {0}")]
    AbiDecodingFailed(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Node endpoint details attached to reports produced by the node client.
#[derive(Debug, Clone)]
pub struct RpcContext {
    pub endpoint: String,
    pub method: String,
    pub params: Option<String>,
}

impl fmt::Display for RpcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        if let Some(params) = &self.params {
            write!(f, " params: {}", params)?;
        }
        Ok(())
    }
}

/// Transaction details attached to submission failures.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub origin: Address,
    pub clauses: usize,
    pub gas: u64,
    pub chain_tag: u8,
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction from {} with {} clause(s), gas: {}, chain tag: {:#04x}",
            self.origin, self.clauses, self.gas, self.chain_tag
        )
    }
}

/// Helper macro for creating account errors
#[macro_export]
macro_rules! account_error {
    ($error:expr, $($arg:tt)*) => {{
        error_stack::Report::new($error)
            .attach_printable(format!($($arg)*))
    }};
}
