use std::time::Duration;

use alloy::primitives::Address;
use dotenvy::dotenv;
use error_stack::Report;

use crate::constants::{
    ACCOUNT_FACTORY_KEY, DEFAULT_NETWORK_TIMEOUT, DELEGATOR_URL_KEY, NODE_URL_KEY,
    SERIALIZE_SENDS_KEY, TIMEOUT_SECS_KEY,
};
use crate::errors::{AccountError, AccountResult, ConfigError};
use crate::rpc::parse_url;

/// Endpoints and contract addresses a pipeline needs before it can start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SponsorConfig {
    pub node_url: String,
    pub delegator_url: String,
    pub account_factory: Address,
    pub network_timeout: Duration,
    /// Serialize concurrent sends of one account.
    pub serialize_sends: bool,
}

impl SponsorConfig {
    pub fn new(node_url: &str, delegator_url: &str, account_factory: Address) -> AccountResult<Self> {
        let config = Self {
            node_url: node_url.to_string(),
            delegator_url: delegator_url.to_string(),
            account_factory,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
            serialize_sends: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from the process environment, reading `.env` first.
    pub fn from_env() -> AccountResult<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AccountResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).filter(|value| !value.trim().is_empty()).ok_or_else(|| {
                Report::new(AccountError::Config(ConfigError::Missing { field: key.to_string() }))
            })
        };

        let node_url = required(NODE_URL_KEY)?;
        let delegator_url = required(DELEGATOR_URL_KEY)?;
        let account_factory = parse_address(ACCOUNT_FACTORY_KEY, &required(ACCOUNT_FACTORY_KEY)?)?;

        let network_timeout = match lookup(TIMEOUT_SECS_KEY) {
            Some(value) => Duration::from_secs(
                value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| invalid_value(TIMEOUT_SECS_KEY, &value))?,
            ),
            None => DEFAULT_NETWORK_TIMEOUT,
        };
        let serialize_sends = match lookup(SERIALIZE_SENDS_KEY) {
            Some(value) => parse_flag(&value).ok_or_else(|| invalid_value(SERIALIZE_SENDS_KEY, &value))?,
            None => true,
        };

        let config = Self {
            node_url: node_url.trim().to_string(),
            delegator_url: delegator_url.trim().to_string(),
            account_factory,
            network_timeout,
            serialize_sends,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    pub fn with_serialized_sends(mut self, serialize_sends: bool) -> Self {
        self.serialize_sends = serialize_sends;
        self
    }

    pub fn validate(&self) -> AccountResult<()> {
        parse_url(NODE_URL_KEY, &self.node_url)?;
        parse_url(DELEGATOR_URL_KEY, &self.delegator_url)?;
        if self.account_factory == Address::ZERO {
            return Err(invalid_value(ACCOUNT_FACTORY_KEY, &self.account_factory.to_string()));
        }
        Ok(())
    }
}

pub fn parse_address(field: &str, value: &str) -> AccountResult<Address> {
    value.trim().parse::<Address>().map_err(|e| {
        Report::new(AccountError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("{}: {}", value, e),
        }))
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid_value(field: &str, value: &str) -> Report<AccountError> {
    Report::new(AccountError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }))
}
