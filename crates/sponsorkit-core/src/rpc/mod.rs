pub mod delegator;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{DynSolValue, FunctionExt};
use alloy::hex;
use alloy::json_abi::Function;
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::codec::abi::EncodedCall;
use crate::codec::transaction::{BodyOptions, Clause, TransactionBody};
use crate::constants::{
    BEST_BLOCK_PATH, GENESIS_BLOCK_PATH, INSPECT_CLAUSES_PATH, TRANSACTIONS_PATH,
};
use crate::errors::{AccountError, AccountResult, CodecError, ConfigError, RpcContext, RpcError};

pub use delegator::{Delegator, HttpDelegator};
pub use types::{
    AccountInfo, BlockSummary, ClauseRequest, GasEstimate, InspectRequest, InspectResult,
    Receipt, ReceiptMeta, TransactionId,
};

/// Read, simulate and broadcast access to a VeChainThor node.
#[async_trait]
pub trait ThorNode: Send + Sync {
    /// Base URL, used in error context.
    fn endpoint(&self) -> String;

    async fn get_account(&self, address: &Address) -> AccountResult<AccountInfo>;

    /// Id of block 0. Stable for the lifetime of a connection.
    async fn genesis_id(&self) -> AccountResult<B256>;

    async fn best_block(&self) -> AccountResult<BlockSummary>;

    /// Simulates `clauses` against the best block, one result per clause.
    async fn inspect_clauses(
        &self,
        clauses: &[Clause],
        caller: Option<Address>,
    ) -> AccountResult<Vec<InspectResult>>;

    async fn broadcast_raw(&self, raw: &[u8]) -> AccountResult<TransactionId>;

    /// `None` until the transaction is included in a block.
    async fn get_receipt(&self, id: &TransactionId) -> AccountResult<Option<Receipt>>;

    async fn estimate_gas(
        &self,
        clauses: &[Clause],
        caller: Option<Address>,
    ) -> AccountResult<GasEstimate> {
        let outputs = self.inspect_clauses(clauses, caller).await?;
        Ok(GasEstimate::from_inspection(clauses, &outputs))
    }

    /// Builds a body anchored on the current best block, tagged for this chain.
    async fn build_transaction_body(
        &self,
        clauses: Vec<Clause>,
        gas: u64,
        options: &BodyOptions,
    ) -> AccountResult<TransactionBody> {
        let genesis_id = self.genesis_id().await?;
        let best = self.best_block().await?;
        Ok(TransactionBody::new(genesis_id[31], &best.id, clauses, gas, options))
    }

    async fn call_read_only(
        &self,
        contract: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> AccountResult<Vec<DynSolValue>> {
        let data = EncodedCall::new(function.clone(), args.to_vec()).encode()?;
        let outputs = self
            .inspect_clauses(&[Clause::call(contract, data)], None)
            .await
            .attach_printable(format!("Calling {} on {}", function.signature(), contract))?;

        let output = outputs.into_iter().next().ok_or_else(|| {
            Report::new(AccountError::Rpc(RpcError::InvalidResponse(
                "node returned no output for the call".to_string(),
            )))
        })?;
        if output.reverted {
            let reason = GasEstimate::first_revert(std::slice::from_ref(&output))
                .map(|(_, reason)| reason)
                .unwrap_or_default();
            return Err(Report::new(AccountError::Rpc(RpcError::NodeError(format!(
                "call to {} reverted: {}",
                function.name, reason
            )))));
        }

        function.abi_decode_output(&output.data).map_err(|e| {
            crate::account_error!(
                AccountError::Codec(CodecError::AbiDecodingFailed(e.to_string())),
                "Decoding output of {}",
                function.signature()
            )
        })
    }
}

/// REST client for a VeChainThor node.
#[derive(Clone, Debug)]
pub struct ThorClient {
    pub url: Url,
    client: reqwest::Client,
    genesis_id: Arc<OnceCell<B256>>,
}

impl ThorClient {
    pub fn new(url: &str, timeout: Duration) -> AccountResult<Self> {
        let url = parse_url("node_url", url)?;
        let client = http_client(timeout)?;
        Ok(Self { url, client, genesis_id: Arc::new(OnceCell::new()) })
    }

    fn path(&self, path: &str) -> String {
        format!("{}{}", self.url.as_str().trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AccountResult<T> {
        let endpoint = self.path(path);
        let context = RpcContext { endpoint: endpoint.clone(), method: "GET".to_string(), params: None };
        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| Report::new(AccountError::Rpc(transport_error(e))))
            .attach(context.clone())?;
        read_json(response).await.attach(context)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AccountResult<T> {
        let endpoint = self.path(path);
        let context = RpcContext {
            endpoint: endpoint.clone(),
            method: "POST".to_string(),
            params: serde_json::to_string(body).ok(),
        };
        let response = self
            .client
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| Report::new(AccountError::Rpc(transport_error(e))))
            .attach(context.clone())?;
        read_json(response).await.attach(context)
    }
}

#[async_trait]
impl ThorNode for ThorClient {
    fn endpoint(&self) -> String {
        self.url.to_string()
    }

    async fn get_account(&self, address: &Address) -> AccountResult<AccountInfo> {
        self.get_json(&format!("/accounts/{:#x}", address))
            .await
            .attach_printable(format!("Reading account {}", address))
    }

    async fn genesis_id(&self) -> AccountResult<B256> {
        let id = self
            .genesis_id
            .get_or_try_init(|| async {
                let genesis: BlockSummary = self
                    .get_json(GENESIS_BLOCK_PATH)
                    .await
                    .attach_printable("Resolving genesis block")?;
                log::debug!("connected to chain with genesis {:#x}", genesis.id);
                Ok::<_, Report<AccountError>>(genesis.id)
            })
            .await?;
        Ok(*id)
    }

    async fn best_block(&self) -> AccountResult<BlockSummary> {
        self.get_json(BEST_BLOCK_PATH).await
    }

    async fn inspect_clauses(
        &self,
        clauses: &[Clause],
        caller: Option<Address>,
    ) -> AccountResult<Vec<InspectResult>> {
        let request =
            InspectRequest { clauses: clauses.iter().map(ClauseRequest::from).collect(), caller };
        let outputs: Vec<InspectResult> = self.post_json(INSPECT_CLAUSES_PATH, &request).await?;
        if outputs.len() != clauses.len() {
            return Err(Report::new(AccountError::Rpc(RpcError::InvalidResponse(format!(
                "expected {} clause outputs, got {}",
                clauses.len(),
                outputs.len()
            )))));
        }
        Ok(outputs)
    }

    async fn broadcast_raw(&self, raw: &[u8]) -> AccountResult<TransactionId> {
        let request = types::RawTransactionRequest { raw: hex::encode_prefixed(raw) };
        let response: types::TransactionIdResponse =
            self.post_json(TRANSACTIONS_PATH, &request).await?;
        Ok(response.id)
    }

    async fn get_receipt(&self, id: &TransactionId) -> AccountResult<Option<Receipt>> {
        self.get_json(&format!("{}/{}/receipt", TRANSACTIONS_PATH, id)).await
    }
}

pub(crate) fn parse_url(field: &str, url: &str) -> AccountResult<Url> {
    Url::try_from(url).map_err(|e| {
        Report::new(AccountError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("{}: {}", url, e),
        }))
    })
}

pub(crate) fn http_client(timeout: Duration) -> AccountResult<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
        Report::new(AccountError::Config(ConfigError::InvalidValue {
            field: "http_client".to_string(),
            value: e.to_string(),
        }))
    })
}

pub(crate) fn transport_error(error: reqwest::Error) -> RpcError {
    if error.is_timeout() {
        RpcError::Timeout
    } else {
        RpcError::Transport(error.to_string())
    }
}

/// Reads a JSON body, turning non-2xx statuses and undecodable bodies into `RpcError`s.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> AccountResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Report::new(AccountError::Rpc(transport_error(e))))?;
    if !status.is_success() {
        return Err(Report::new(AccountError::Rpc(RpcError::StatusCode {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })));
    }
    serde_json::from_str(&body).map_err(|e| {
        Report::new(AccountError::Rpc(RpcError::InvalidResponse(e.to_string())))
            .attach_printable(format!("Response body: {}", body))
    })
}
