use dotenvy::dotenv;
use sponsorkit_core::config::SponsorConfig;
use sponsorkit_core::constants::{
    ACCOUNT_FACTORY_KEY, DELEGATOR_URL_KEY, NODE_URL_KEY, TIMEOUT_SECS_KEY,
};
use sponsorkit_core::AccountResult;

use super::NetworkOpts;

pub const OWNER_KEY_KEY: &str = "SPONSORKIT_OWNER_KEY";

pub fn get_env_var(key: &str) -> Option<String> {
    dotenv().ok();
    std::env::var(key).ok()
}

/// Builds the configuration, command line flags taking precedence over the environment.
pub fn load_config(opts: &NetworkOpts) -> AccountResult<SponsorConfig> {
    load_config_with(opts, get_env_var)
}

pub fn load_config_with<F>(opts: &NetworkOpts, env: F) -> AccountResult<SponsorConfig>
where
    F: Fn(&str) -> Option<String>,
{
    SponsorConfig::from_lookup(|key| {
        let flag = match key {
            NODE_URL_KEY => opts.node_url.clone(),
            DELEGATOR_URL_KEY => opts.delegator_url.clone(),
            ACCOUNT_FACTORY_KEY => opts.account_factory.clone(),
            TIMEOUT_SECS_KEY => opts.timeout_secs.map(|secs| secs.to_string()),
            _ => None,
        };
        flag.or_else(|| env(key))
    })
}
