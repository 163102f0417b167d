use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rlp::{BufMut, Encodable, Header, EMPTY_STRING_CODE};
use rand::Rng;

use crate::codec::crypto::blake2b256;
use crate::constants::{DEFAULT_EXPIRATION, DEFAULT_GAS_PRICE_COEF, DELEGATED_FEATURE};

/// One call within a multi-clause transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl Clause {
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self { to: Some(to), value: U256::ZERO, data: data.into() }
    }

    fn payload_length(&self) -> usize {
        let to_length = match &self.to {
            Some(to) => to.length(),
            None => 1,
        };
        to_length + self.value.length() + self.data.length()
    }
}

impl Encodable for Clause {
    fn encode(&self, out: &mut dyn BufMut) {
        Header { list: true, payload_length: self.payload_length() }.encode(out);
        match &self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.data.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy::rlp::length_of_length(payload_length)
    }
}

/// Options applied when turning a call plan into a transaction body.
#[derive(Clone, Debug)]
pub struct BodyOptions {
    pub delegated: bool,
    pub expiration: u32,
    pub gas_price_coef: u8,
    pub depends_on: Option<B256>,
    pub nonce: Option<u64>,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            delegated: false,
            expiration: DEFAULT_EXPIRATION,
            gas_price_coef: DEFAULT_GAS_PRICE_COEF,
            depends_on: None,
            nonce: None,
        }
    }
}

impl BodyOptions {
    pub fn delegated() -> Self {
        Self { delegated: true, ..Self::default() }
    }
}

/// Unsigned VeChainThor transaction body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBody {
    pub chain_tag: u8,
    pub block_ref: u64,
    pub expiration: u32,
    pub clauses: Vec<Clause>,
    pub gas_price_coef: u8,
    pub gas: u64,
    pub depends_on: Option<B256>,
    pub nonce: u64,
    pub features: u32,
}

impl TransactionBody {
    /// Assembles a body anchored on `block_id`; the block ref is the first 8 bytes of that id.
    pub fn new(
        chain_tag: u8,
        block_id: &B256,
        clauses: Vec<Clause>,
        gas: u64,
        options: &BodyOptions,
    ) -> Self {
        let mut block_ref = [0u8; 8];
        block_ref.copy_from_slice(&block_id[..8]);
        Self {
            chain_tag,
            block_ref: u64::from_be_bytes(block_ref),
            expiration: options.expiration,
            clauses,
            gas_price_coef: options.gas_price_coef,
            gas,
            depends_on: options.depends_on,
            nonce: options.nonce.unwrap_or_else(|| rand::thread_rng().gen()),
            features: if options.delegated { DELEGATED_FEATURE } else { 0 },
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.features & DELEGATED_FEATURE == DELEGATED_FEATURE
    }

    pub fn encode_unsigned(&self) -> Vec<u8> {
        let mut payload = vec![];
        self.encode_fields(&mut payload);
        wrap_list(payload)
    }

    /// Encodes the body followed by the signature (`origin ‖ gas payer` when delegated).
    pub fn encode_signed(&self, signature: &[u8]) -> Vec<u8> {
        let mut payload = vec![];
        self.encode_fields(&mut payload);
        signature.encode(&mut payload);
        wrap_list(payload)
    }

    pub fn signing_hash(&self) -> B256 {
        blake2b256(&[&self.encode_unsigned()])
    }

    /// Hash the gas payer signs to sponsor a transaction sent by `origin`.
    pub fn delegator_signing_hash(&self, origin: &Address) -> B256 {
        blake2b256(&[self.signing_hash().as_slice(), origin.as_slice()])
    }

    /// Transaction id as computed by the node once `origin` has signed.
    pub fn id(&self, origin: &Address) -> B256 {
        self.delegator_signing_hash(origin)
    }

    fn reserved(&self) -> Vec<u32> {
        if self.features == 0 {
            vec![]
        } else {
            vec![self.features]
        }
    }

    fn encode_fields(&self, out: &mut Vec<u8>) {
        self.chain_tag.encode(out);
        self.block_ref.encode(out);
        self.expiration.encode(out);
        self.clauses.encode(out);
        self.gas_price_coef.encode(out);
        self.gas.encode(out);
        match &self.depends_on {
            Some(depends_on) => depends_on.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.nonce.encode(out);
        self.reserved().encode(out);
    }
}

fn wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let header = Header { list: true, payload_length: payload.len() };
    let mut out = Vec::with_capacity(header.length() + payload.len());
    header.encode(&mut out);
    out.extend_from_slice(&payload);
    out
}
