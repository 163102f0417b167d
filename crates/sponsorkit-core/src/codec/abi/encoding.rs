use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::{Address, Bytes};
use error_stack::{Report, ResultExt};

use crate::errors::{AccountError, AccountResult, CodecError};

/// Call payload of an authorization request.
///
/// `Raw` bytes are signed verbatim. `Encoded` calls are ABI encoded exactly
/// once, before the authorization document is built.
#[derive(Debug, Clone, PartialEq)]
pub enum CallData {
    Raw(Bytes),
    Encoded(EncodedCall),
}

impl Default for CallData {
    fn default() -> Self {
        CallData::Raw(Bytes::new())
    }
}

impl CallData {
    pub fn resolve(&self) -> AccountResult<Bytes> {
        match self {
            CallData::Raw(bytes) => Ok(bytes.clone()),
            CallData::Encoded(call) => call.encode(),
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            CallData::Raw(_) => None,
            CallData::Encoded(call) => Some(call.function_name()),
        }
    }
}

impl From<Bytes> for CallData {
    fn from(bytes: Bytes) -> Self {
        CallData::Raw(bytes)
    }
}

impl From<EncodedCall> for CallData {
    fn from(call: EncodedCall) -> Self {
        CallData::Encoded(call)
    }
}

/// A function descriptor with its arguments, pending ABI encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCall {
    pub function: Function,
    pub args: Vec<DynSolValue>,
}

impl EncodedCall {
    pub fn new(function: Function, args: Vec<DynSolValue>) -> Self {
        Self { function, args }
    }

    /// Builds a call from a human readable signature and string arguments,
    /// e.g. `function transfer(address to, uint256 amount)` with `["0x…", "1000"]`.
    pub fn parse(signature: &str, args: &[String]) -> AccountResult<Self> {
        let function = parse_function(signature)?;
        let args = coerce_args(&function, args)
            .attach_printable(format!("Coercing arguments for '{}'", function.signature()))?;
        Ok(Self { function, args })
    }

    pub fn function_name(&self) -> &str {
        &self.function.name
    }

    pub fn encode(&self) -> AccountResult<Bytes> {
        if self.args.len() != self.function.inputs.len() {
            return Err(Report::new(AccountError::Codec(CodecError::ArgumentCountMismatch {
                expected: self.function.inputs.len(),
                got: self.args.len(),
            }))
            .attach_printable(format!("Encoding call to '{}'", self.function.signature())));
        }
        let encoded = self
            .function
            .abi_encode_input(&self.args)
            .map_err(|e| {
                Report::new(AccountError::Codec(CodecError::AbiEncodingFailed(e.to_string())))
            })
            .attach_printable(format!("Encoding call to '{}'", self.function.signature()))?;
        Ok(encoded.into())
    }
}

pub fn parse_function(signature: &str) -> AccountResult<Function> {
    let trimmed = signature.trim();
    let normalized = if trimmed.starts_with("function ") {
        trimmed.to_string()
    } else {
        format!("function {}", trimmed)
    };
    Function::parse(&normalized).map_err(|e| {
        Report::new(AccountError::Codec(CodecError::InvalidFunction(signature.to_string())))
            .attach_printable(e.to_string())
    })
}

/// Coerces string arguments into the input types of `function`.
pub fn coerce_args(function: &Function, args: &[String]) -> AccountResult<Vec<DynSolValue>> {
    if args.len() != function.inputs.len() {
        let mut error = Report::new(AccountError::Codec(CodecError::ArgumentCountMismatch {
            expected: function.inputs.len(),
            got: args.len(),
        }));
        for (i, param) in function.inputs.iter().enumerate() {
            error = error.attach_printable(format!(
                "  [{}] {}: {}",
                i,
                if param.name.is_empty() { "arg" } else { &param.name },
                param.ty
            ));
        }
        return Err(error);
    }

    let mut values = Vec::with_capacity(args.len());
    for (index, (param, raw)) in function.inputs.iter().zip(args).enumerate() {
        let ty: DynSolType = param.resolve().map_err(|e| {
            Report::new(AccountError::Codec(CodecError::InvalidArgument {
                index,
                ty: param.ty.clone(),
                reason: e.to_string(),
            }))
        })?;
        let value = ty.coerce_str(raw).map_err(|e| {
            Report::new(AccountError::Codec(CodecError::InvalidArgument {
                index,
                ty: param.ty.clone(),
                reason: e.to_string(),
            }))
            .attach_printable(format!("Received: {}", raw))
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Reads an ABI encoded `address` return value.
pub fn decode_address_word(data: &[u8]) -> AccountResult<Address> {
    if data.len() < 32 {
        return Err(Report::new(AccountError::Codec(CodecError::AbiDecodingFailed(format!(
            "expected a 32 byte word, got {} bytes",
            data.len()
        )))));
    }
    if data[..12].iter().any(|b| *b != 0) {
        return Err(Report::new(AccountError::Codec(CodecError::AbiDecodingFailed(
            "address word has dirty upper bytes".to_string(),
        ))));
    }
    Ok(Address::from_slice(&data[12..32]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, hex, U256};

    #[test]
    fn test_raw_call_data_is_passed_through() {
        let raw = Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]);
        let data = CallData::Raw(raw.clone());
        assert_eq!(data.resolve().unwrap(), raw);
        assert_eq!(data.function_name(), None);
        assert_eq!(CallData::default().resolve().unwrap(), Bytes::new());
    }

    #[test]
    fn test_encoded_call_without_arguments() {
        let call = EncodedCall::parse("increment()", &[]).unwrap();
        assert_eq!(call.function_name(), "increment");
        let encoded = call.encode().unwrap();
        assert_eq!(encoded.len(), 4);
        assert_eq!(encoded.as_ref(), call.function.selector().as_slice());
    }

    #[test]
    fn test_encoded_call_with_arguments() {
        let call = EncodedCall::parse(
            "function transfer(address to, uint256 amount)",
            &["0x00000000000000000000000000000000000000bb".to_string(), "1000".to_string()],
        )
        .unwrap();
        assert_eq!(
            call.args,
            vec![
                DynSolValue::Address(address!("0x00000000000000000000000000000000000000bb")),
                DynSolValue::Uint(U256::from(1000u64), 256),
            ]
        );
        let encoded = CallData::from(call).resolve().unwrap();
        assert_eq!(encoded.len(), 4 + 64);
        assert_eq!(encoded[4 + 31], 0xbb);
        assert_eq!(&encoded[4 + 62..], &hex!("03e8"));
    }

    #[test]
    fn test_argument_count_mismatch() {
        let report = EncodedCall::parse("transfer(address,uint256)", &["0x01".to_string()])
            .unwrap_err();
        assert_eq!(
            report.current_context(),
            &AccountError::Codec(CodecError::ArgumentCountMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_invalid_argument() {
        let report = EncodedCall::parse("setFlag(bool)", &["maybe".to_string()]).unwrap_err();
        assert!(matches!(
            report.current_context(),
            AccountError::Codec(CodecError::InvalidArgument { index: 0, .. })
        ));
    }

    #[test]
    fn test_decode_address_word() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xac; 20]);
        assert_eq!(decode_address_word(&word).unwrap(), Address::from([0xac; 20]));
        assert!(decode_address_word(&word[..16]).is_err());
        word[0] = 1;
        assert!(decode_address_word(&word).is_err());
    }
}
