use clap::{ArgAction, Args, Parser, Subcommand};
use hiro_system_kit::{self, Logger};
use std::process;

mod account;
mod custody;
mod env;

#[derive(Clone)]
pub struct Context {
    pub logger: Option<Logger>,
    pub tracer: bool,
}

#[allow(dead_code)]
impl Context {
    pub fn empty() -> Context {
        Context { logger: None, tracer: false }
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger)
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    #[clap(flatten)]
    network: NetworkOpts,
    #[clap(subcommand)]
    command: Command,
}

/// Endpoints, falling back to the `SPONSORKIT_*` environment variables (and `.env`)
#[derive(Args, PartialEq, Clone, Debug, Default)]
pub struct NetworkOpts {
    /// URL of the VeChainThor node REST API
    #[arg(long = "node-url", global = true)]
    pub node_url: Option<String>,
    /// URL of the fee delegation service
    #[arg(long = "delegator-url", global = true)]
    pub delegator_url: Option<String>,
    /// Address of the account factory contract
    #[arg(long = "factory", global = true)]
    pub account_factory: Option<String>,
    /// Network timeout, in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Display the owner key and the address of its smart account
    #[clap(name = "address", bin_name = "address")]
    Address,
    /// Display balance, energy and deployment status of an account
    #[clap(name = "account", bin_name = "account")]
    Account(AccountInfoCommand),
    /// Execute a call through the smart account, gas paid by the sponsor
    #[clap(name = "send", bin_name = "send")]
    Send(SendCommand),
    /// Call a contract function without sending a transaction
    #[clap(name = "call", bin_name = "call")]
    Call(ReadCommand),
    /// Display the receipt of a transaction
    #[clap(name = "status", bin_name = "status")]
    Status(StatusCommand),
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct AccountInfoCommand {
    /// Account to inspect. Defaults to the smart account of the owner key
    pub address: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct SendCommand {
    /// Contract or account the smart account calls
    #[arg(long = "to")]
    pub to: String,
    /// Amount of VET (in wei) sent along with the call
    #[arg(long = "value", default_value = "0")]
    pub value: String,
    /// Raw call data, hex encoded
    #[arg(long = "data", conflicts_with = "function")]
    pub data: Option<String>,
    /// Function signature to encode, e.g. 'transfer(address,uint256)'
    #[arg(long = "function")]
    pub function: Option<String>,
    /// Function argument, repeated in declaration order
    #[arg(long = "arg", requires = "function")]
    pub args: Vec<String>,
    /// Unix time after which the authorization becomes valid
    #[arg(long = "valid-after")]
    pub valid_after: Option<u64>,
    /// Unix time before which the authorization must be executed
    #[arg(long = "valid-before")]
    pub valid_before: Option<u64>,
    /// Title of the signature prompt
    #[arg(long = "title")]
    pub title: Option<String>,
    /// Description of the signature prompt
    #[arg(long = "description")]
    pub description: Option<String>,
    /// Label of the confirmation of the signature prompt
    #[arg(long = "button")]
    pub button_text: Option<String>,
    /// Wait for the transaction to be included in a block
    #[arg(long = "wait", short = 'w', action=ArgAction::SetTrue)]
    pub wait: bool,
    /// Sign without confirmation
    #[arg(long = "yes", short = 'y', action=ArgAction::SetTrue)]
    pub yes: bool,
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct ReadCommand {
    /// Contract to call
    #[arg(long = "contract")]
    pub contract: String,
    /// Function signature with outputs, e.g. 'counter() returns (uint256)'
    #[arg(long = "function")]
    pub function: String,
    /// Function argument, repeated in declaration order
    #[arg(long = "arg")]
    pub args: Vec<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct StatusCommand {
    /// Transaction id
    pub id: String,
}

pub fn main() {
    let logger = hiro_system_kit::log::setup_logger();
    let _guard = hiro_system_kit::log::setup_global_logger(logger.clone());
    let ctx = Context { logger: Some(logger), tracer: false };

    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            println!("{}", e);
            process::exit(1);
        }
    };

    match hiro_system_kit::nestable_block_on(handle_command(opts, &ctx)) {
        Err(e) => {
            ctx.try_log(|logger| error!(logger, "{e}"));
            std::thread::sleep(std::time::Duration::from_millis(500));
            process::exit(1);
        }
        Ok(_) => {}
    }
}

async fn handle_command(opts: Opts, ctx: &Context) -> Result<(), String> {
    match opts.command {
        Command::Address => {
            account::handle_address_command(&opts.network, ctx).await?;
        }
        Command::Account(cmd) => {
            account::handle_account_command(&cmd, &opts.network, ctx).await?;
        }
        Command::Send(cmd) => {
            account::handle_send_command(&cmd, &opts.network, ctx).await?;
        }
        Command::Call(cmd) => {
            account::handle_call_command(&cmd, &opts.network, ctx).await?;
        }
        Command::Status(cmd) => {
            account::handle_status_command(&cmd, &opts.network, ctx).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parse_send(args: Vec<&str>) -> SendCommand {
        SendCommand::parse_from(args)
    }

    #[test]
    fn test_send_default_values() {
        let result = parse_send(vec!["send", "--to", "0x00000000000000000000000000000000000000bb"]);
        assert_eq!(result.value, "0");
        assert_eq!(result.data, None);
        assert_eq!(result.function, None);
        assert!(result.args.is_empty());
        assert_eq!(result.wait, false);
        assert_eq!(result.yes, false);
    }

    #[test]
    fn test_send_encoded_call() {
        let result = parse_send(vec![
            "send",
            "--to",
            "0x00000000000000000000000000000000000000bb",
            "--function",
            "transfer(address,uint256)",
            "--arg",
            "0x00000000000000000000000000000000000000cc",
            "--arg",
            "1000",
            "--wait",
        ]);
        assert_eq!(result.function.as_deref(), Some("transfer(address,uint256)"));
        assert_eq!(result.args.len(), 2);
        assert!(result.wait);
    }

    #[test]
    fn test_send_rejects_data_with_function() {
        let result = SendCommand::try_parse_from(vec![
            "send",
            "--to",
            "0x00000000000000000000000000000000000000bb",
            "--data",
            "0x01",
            "--function",
            "increment()",
        ]);
        assert!(result.is_err());
    }

    #[test_case(vec!["sponsorkit", "address"] ; "address")]
    #[test_case(vec!["sponsorkit", "account"] ; "account of owner")]
    #[test_case(vec!["sponsorkit", "status", "0x123"] ; "status")]
    #[test_case(vec!["sponsorkit", "call", "--contract", "0x00000000000000000000000000000000000000bb", "--function", "counter() returns (uint256)"] ; "read only call")]
    fn test_commands_parse(args: Vec<&str>) {
        assert!(Opts::try_parse_from(args).is_ok());
    }

    #[test]
    fn test_global_network_flags() {
        let opts = Opts::try_parse_from(vec![
            "sponsorkit",
            "address",
            "--node-url",
            "https://testnet.vechain.org",
            "--timeout",
            "10",
        ])
        .unwrap();
        assert_eq!(opts.network.node_url.as_deref(), Some("https://testnet.vechain.org"));
        assert_eq!(opts.network.timeout_secs, Some(10));
        assert_eq!(opts.command, Command::Address);
    }
}
