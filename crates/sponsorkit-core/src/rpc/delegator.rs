use std::time::Duration;

use alloy::hex;
use alloy::primitives::Address;
use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use reqwest::Url;

use super::types::{DelegationRequest, DelegationResponse};
use super::{http_client, parse_url, read_json, transport_error};
use crate::codec::crypto::SIGNATURE_LENGTH;
use crate::errors::{AccountError, AccountResult, RpcContext, RpcError};

/// Gas payer co-signing fee delegated transactions (VIP-191).
#[async_trait]
pub trait Delegator: Send + Sync {
    /// Returns the gas payer signature over the delegator hash of `unsigned_raw` sent by `origin`.
    async fn co_sign(
        &self,
        origin: &Address,
        unsigned_raw: &[u8],
    ) -> AccountResult<[u8; SIGNATURE_LENGTH]>;
}

/// Delegation service reached over HTTP: `POST {url}` with `{origin, raw}`.
#[derive(Clone, Debug)]
pub struct HttpDelegator {
    pub url: Url,
    client: reqwest::Client,
}

impl HttpDelegator {
    pub fn new(url: &str, timeout: Duration) -> AccountResult<Self> {
        let url = parse_url("delegator_url", url)?;
        let client = http_client(timeout)?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl Delegator for HttpDelegator {
    async fn co_sign(
        &self,
        origin: &Address,
        unsigned_raw: &[u8],
    ) -> AccountResult<[u8; SIGNATURE_LENGTH]> {
        let request = DelegationRequest { origin: *origin, raw: hex::encode_prefixed(unsigned_raw) };
        let context = RpcContext {
            endpoint: self.url.to_string(),
            method: "POST".to_string(),
            params: Some(format!("origin: {:#x}", origin)),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| Report::new(AccountError::Rpc(transport_error(e))))
            .attach(context.clone())?;
        let response: DelegationResponse = read_json(response).await.attach(context.clone())?;

        let signature: [u8; SIGNATURE_LENGTH] =
            response.signature.as_ref().try_into().map_err(|_| {
                Report::new(AccountError::Rpc(RpcError::InvalidResponse(format!(
                    "expected a {} byte signature, got {} bytes",
                    SIGNATURE_LENGTH,
                    response.signature.len()
                ))))
                .attach(context)
            })?;
        Ok(signature)
    }
}
