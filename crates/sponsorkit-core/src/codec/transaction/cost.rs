use crate::codec::transaction::Clause;
use crate::constants::{
    CLAUSE_GAS, CLAUSE_GAS_CONTRACT_CREATION, NON_ZERO_BYTE_GAS, TX_GAS, VM_INVOCATION_GAS,
    ZERO_BYTE_GAS,
};

/// Gas charged before any clause executes.
pub fn intrinsic_gas(clauses: &[Clause]) -> u64 {
    if clauses.is_empty() {
        return TX_GAS + CLAUSE_GAS;
    }
    clauses.iter().fold(TX_GAS, |total, clause| {
        let clause_gas =
            if clause.to.is_some() { CLAUSE_GAS } else { CLAUSE_GAS_CONTRACT_CREATION };
        total + clause_gas + data_gas(&clause.data)
    })
}

/// Intrinsic gas plus simulated execution gas; the VM overhead is only due when code ran.
pub fn total_gas(intrinsic: u64, simulated: u64) -> u64 {
    if simulated == 0 {
        intrinsic
    } else {
        intrinsic + simulated + VM_INVOCATION_GAS
    }
}

fn data_gas(data: &[u8]) -> u64 {
    data.iter().map(|b| if *b == 0 { ZERO_BYTE_GAS } else { NON_ZERO_BYTE_GAS }).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes, U256};
    use test_case::test_case;

    fn clause(to: Option<Address>, data: Vec<u8>) -> Clause {
        Clause { to, value: U256::ZERO, data: Bytes::from(data) }
    }

    #[test]
    fn test_intrinsic_gas_without_clauses() {
        assert_eq!(intrinsic_gas(&[]), 21_000);
    }

    #[test_case(vec![], 21_000 ; "plain transfer")]
    #[test_case(vec![0, 0], 21_008 ; "zero bytes")]
    #[test_case(vec![1, 0, 2], 21_140 ; "mixed bytes")]
    fn test_intrinsic_gas_single_call(data: Vec<u8>, expected: u64) {
        assert_eq!(intrinsic_gas(&[clause(Some(Address::ZERO), data)]), expected);
    }

    #[test]
    fn test_intrinsic_gas_contract_creation() {
        assert_eq!(intrinsic_gas(&[clause(None, vec![])]), 53_000);
    }

    #[test]
    fn test_intrinsic_gas_multiple_clauses() {
        let clauses = vec![clause(Some(Address::ZERO), vec![1]), clause(Some(Address::ZERO), vec![])];
        assert_eq!(intrinsic_gas(&clauses), 5_000 + 16_000 + 68 + 16_000);
    }

    #[test_case(21_000, 0, 21_000 ; "no execution")]
    #[test_case(37_000, 30_000, 82_000 ; "with execution")]
    fn test_total_gas(intrinsic: u64, simulated: u64, expected: u64) {
        assert_eq!(total_gas(intrinsic, simulated), expected);
    }
}
