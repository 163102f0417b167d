use std::time::Duration;

// EIP-712 domain of the smart account, configured on-chain through `__EIP712_init("Wallet", "1")`
pub const DOMAIN_NAME: &str = "Wallet";
pub const DOMAIN_VERSION: &str = "1";
pub const PRIMARY_TYPE: &str = "ExecuteWithAuthorization";

// Authorization validity window
pub const DEFAULT_VALID_AFTER: u64 = 0;
pub const DEFAULT_VALIDITY_SECS: u64 = 3600;

// Signing prompt defaults
pub const DEFAULT_PROMPT_TITLE: &str = "Sign Transaction";
pub const DEFAULT_PROMPT_DESCRIPTION: &str = " ";
pub const DEFAULT_PROMPT_BUTTON: &str = "Sign";

// Transaction body defaults
pub const DEFAULT_EXPIRATION: u32 = 32;
pub const DEFAULT_GAS_PRICE_COEF: u8 = 0;
pub const DELEGATED_FEATURE: u32 = 0b1;

// Intrinsic gas schedule
pub const TX_GAS: u64 = 5_000;
pub const CLAUSE_GAS: u64 = 16_000;
pub const CLAUSE_GAS_CONTRACT_CREATION: u64 = 48_000;
pub const ZERO_BYTE_GAS: u64 = 4;
pub const NON_ZERO_BYTE_GAS: u64 = 68;
pub const VM_INVOCATION_GAS: u64 = 15_000;

// Node REST paths
pub const GENESIS_BLOCK_PATH: &str = "/blocks/0";
pub const BEST_BLOCK_PATH: &str = "/blocks/best";
pub const INSPECT_CLAUSES_PATH: &str = "/accounts/*";
pub const TRANSACTIONS_PATH: &str = "/transactions";

// Environment keys
pub const NODE_URL_KEY: &str = "SPONSORKIT_NODE_URL";
pub const DELEGATOR_URL_KEY: &str = "SPONSORKIT_DELEGATOR_URL";
pub const ACCOUNT_FACTORY_KEY: &str = "SPONSORKIT_ACCOUNT_FACTORY";
pub const TIMEOUT_SECS_KEY: &str = "SPONSORKIT_TIMEOUT_SECS";
pub const SERIALIZE_SENDS_KEY: &str = "SPONSORKIT_SERIALIZE_SENDS";

pub const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
