use std::fmt;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::decode_revert_reason;

use crate::codec::transaction::{intrinsic_gas, total_gas, Clause};

/// Identifier returned by the broadcast endpoint.
///
/// Kept verbatim: the value is whatever the node answered, and is only
/// compared against the locally computed id for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this id is the 32 byte hash `expected`.
    pub fn matches(&self, expected: &B256) -> bool {
        self.0.parse::<B256>().map(|id| &id == expected).unwrap_or(false)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for TransactionId {
    fn from(id: B256) -> Self {
        Self(format!("{:#x}", id))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub balance: U256,
    pub energy: U256,
    pub has_code: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub id: B256,
    pub number: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRequest {
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl From<&Clause> for ClauseRequest {
    fn from(clause: &Clause) -> Self {
        Self { to: clause.to, value: clause.value, data: clause.data.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectRequest {
    pub clauses: Vec<ClauseRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<Address>,
}

/// Outcome of simulating one clause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectResult {
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
    #[serde(default)]
    pub transfers: Vec<serde_json::Value>,
    pub gas_used: u64,
    pub reverted: bool,
    #[serde(default)]
    pub vm_error: String,
}

/// Gas required by a set of clauses, with the diagnostics of any reverted clause.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GasEstimate {
    pub total_gas: u64,
    pub reverted: bool,
    pub revert_reasons: Vec<String>,
    pub vm_errors: Vec<String>,
    /// Index and reason of the first reverted clause.
    pub first_reverted: Option<(usize, String)>,
}

impl GasEstimate {
    /// Folds per clause simulation outputs into a single estimate.
    pub fn from_inspection(clauses: &[Clause], outputs: &[InspectResult]) -> Self {
        let simulated = outputs.iter().map(|output| output.gas_used).sum();
        let mut estimate = GasEstimate {
            total_gas: total_gas(intrinsic_gas(clauses), simulated),
            first_reverted: Self::first_revert(outputs),
            ..Default::default()
        };
        for output in outputs.iter().filter(|output| output.reverted) {
            estimate.reverted = true;
            estimate.revert_reasons.push(revert_reason(output).unwrap_or_default());
            if !output.vm_error.is_empty() {
                estimate.vm_errors.push(output.vm_error.clone());
            }
        }
        estimate
    }

    /// Index of the first reverted clause with its reason, in simulation order.
    pub fn first_revert(outputs: &[InspectResult]) -> Option<(usize, String)> {
        outputs.iter().position(|output| output.reverted).map(|index| {
            let output = &outputs[index];
            let reason = revert_reason(output)
                .or_else(|| (!output.vm_error.is_empty()).then(|| output.vm_error.clone()))
                .unwrap_or_else(|| "execution reverted".to_string());
            (index, reason)
        })
    }
}

fn revert_reason(output: &InspectResult) -> Option<String> {
    if output.data.is_empty() {
        return None;
    }
    decode_revert_reason(&output.data)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransactionRequest {
    pub raw: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIdResponse {
    pub id: TransactionId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMeta {
    #[serde(rename = "blockID")]
    pub block_id: B256,
    pub block_number: u64,
    pub block_timestamp: u64,
    #[serde(rename = "txID")]
    pub tx_id: B256,
    pub tx_origin: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub gas_used: u64,
    pub gas_payer: Address,
    pub paid: U256,
    pub reward: U256,
    pub reverted: bool,
    pub meta: ReceiptMeta,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub origin: Address,
    pub raw: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationResponse {
    pub signature: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    #[test]
    fn test_deserialize_account() {
        let account: AccountInfo = serde_json::from_str(
            r#"{"balance":"0x0","energy":"0x2386f26fc10000","hasCode":true}"#,
        )
        .unwrap();
        assert!(account.has_code);
        assert_eq!(account.energy, U256::from(10_000_000_000_000_000u64));
    }

    #[test]
    fn test_deserialize_inspect_result_with_missing_fields() {
        let results: Vec<InspectResult> = serde_json::from_str(
            r#"[{"data":"0x","gasUsed":23120,"reverted":false,"vmError":""},{"gasUsed":0,"reverted":true}]"#,
        )
        .unwrap();
        assert_eq!(results[0].gas_used, 23120);
        assert!(results[1].reverted);
        assert!(results[1].vm_error.is_empty());
        assert!(results[1].events.is_empty());
    }

    #[test]
    fn test_inspect_request_omits_absent_caller() {
        let request = InspectRequest {
            clauses: vec![ClauseRequest::from(&Clause::call(Address::ZERO, Bytes::new()))],
            caller: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("caller").is_none());
        assert_eq!(json["clauses"][0]["value"], "0x0");
        assert_eq!(json["clauses"][0]["data"], "0x");
    }

    #[test]
    fn test_deserialize_receipt() {
        let receipt: Receipt = serde_json::from_str(
            r#"{
                "gasUsed": 48000,
                "gasPayer": "0x00000000000000000000000000000000000000aa",
                "paid": "0x1236efcbcbb340000",
                "reward": "0x576e189f04f60000",
                "reverted": false,
                "outputs": [],
                "meta": {
                    "blockID": "0x0004f6cc88bb4626a92907718e82f255b8fa511453a78e8797eb8cea3393b215",
                    "blockNumber": 325324,
                    "blockTimestamp": 1533267900,
                    "txID": "0x284bba50ef777889ff1a367ed0b38d5e5626714477c40de38d71cedd6f9fa477",
                    "txOrigin": "0xdb4027477b2a8fe4c83c6dafe7f86678bb1b8a8d"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(receipt.gas_payer, address!("0x00000000000000000000000000000000000000aa"));
        assert_eq!(
            receipt.meta.tx_id,
            b256!("0x284bba50ef777889ff1a367ed0b38d5e5626714477c40de38d71cedd6f9fa477")
        );
        assert_eq!(receipt.meta.block_number, 325324);
    }

    #[test]
    fn test_gas_estimate_from_inspection() {
        let clauses = vec![Clause::call(Address::ZERO, Bytes::from(vec![1u8]))];
        let outputs: Vec<InspectResult> =
            serde_json::from_str(r#"[{"data":"0x","gasUsed":10000,"reverted":false}]"#).unwrap();
        let estimate = GasEstimate::from_inspection(&clauses, &outputs);
        assert_eq!(estimate.total_gas, 21_068 + 10_000 + 15_000);
        assert!(!estimate.reverted);
        assert_eq!(estimate.first_reverted, None);
    }

    #[test]
    fn test_gas_estimate_decodes_revert_reason() {
        let clauses = vec![Clause::call(Address::ZERO, Bytes::new())];
        // Error("expired")
        let outputs = vec![InspectResult {
            data: Bytes::from(alloy::primitives::hex!(
                "08c379a0"
                "0000000000000000000000000000000000000000000000000000000000000020"
                "0000000000000000000000000000000000000000000000000000000000000007"
                "6578706972656400000000000000000000000000000000000000000000000000"
            )),
            events: vec![],
            transfers: vec![],
            gas_used: 900,
            reverted: true,
            vm_error: "execution reverted".to_string(),
        }];
        let estimate = GasEstimate::from_inspection(&clauses, &outputs);
        assert!(estimate.reverted);
        assert_eq!(estimate.vm_errors, vec!["execution reverted".to_string()]);
        assert!(estimate.revert_reasons[0].contains("expired"));
        assert_eq!(estimate.first_reverted.as_ref().map(|(index, _)| *index), Some(0));
        let (index, reason) = GasEstimate::first_revert(&outputs).unwrap();
        assert_eq!(index, 0);
        assert!(reason.contains("expired"));
    }

    #[test]
    fn test_transaction_id_is_opaque() {
        let id: TransactionIdResponse = serde_json::from_str(r#"{"id":"0x123"}"#).unwrap();
        assert_eq!(id.id.as_str(), "0x123");
        assert!(!id.id.matches(&B256::ZERO));

        let hash = B256::repeat_byte(0x11);
        assert!(TransactionId::from(hash).matches(&hash));
    }
}
