use alloy::primitives::{Address, U256};
use alloy::sol;

sol! {
    /// Factory deploying smart accounts at deterministic addresses.
    #[derive(Debug)]
    interface IAccountFactory {
        function getAddress(address owner, uint256 salt) external view returns (address);
        function createAccount(address owner, uint256 salt) external;
    }

    /// Smart account entry point executing calls authorized by its owner.
    #[derive(Debug)]
    interface ISmartAccount {
        function executeWithAuthorization(
            address to,
            uint256 value,
            bytes calldata data,
            uint256 validAfter,
            uint256 validBefore,
            bytes calldata signature
        ) external;
    }

    /// Typed message signed by the owner key.
    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct ExecuteWithAuthorization {
        address to;
        uint256 value;
        bytes data;
        uint256 validAfter;
        uint256 validBefore;
    }
}

/// The owner address reused as deployment salt, read as a 160-bit unsigned integer.
pub fn owner_salt(owner: &Address) -> U256 {
    U256::from_be_slice(owner.as_slice())
}
