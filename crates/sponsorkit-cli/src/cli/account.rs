use std::sync::Arc;
use std::time::Duration;

use alloy::hex;
use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, Bytes, U256};
use error_stack::Report;
use sponsorkit_core::config::{parse_address, SponsorConfig};
use sponsorkit_core::constants::DEFAULT_RECEIPT_POLL_INTERVAL;
use sponsorkit_core::rpc::Receipt;
use sponsorkit_core::{
    AccountError, AccountPipeline, AuthorizationRequest, CallData, EncodedCall, ThorClient,
    ThorNode, TransactionId,
};

use super::custody::TerminalCustody;
use super::env::load_config;
use super::{AccountInfoCommand, Context, NetworkOpts, ReadCommand, SendCommand, StatusCommand};

const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

fn report_to_string(report: Report<AccountError>) -> String {
    format!("{:#}", report)
}

async fn connect_pipeline(
    config: &SponsorConfig,
    auto_approve: bool,
    ctx: &Context,
) -> Result<AccountPipeline, String> {
    let custody = TerminalCustody::from_env(auto_approve)?;
    let pipeline =
        AccountPipeline::from_config(config, Arc::new(custody)).map_err(report_to_string)?;
    let account = pipeline.connect().await.map_err(report_to_string)?;
    ctx.try_log(|logger| {
        debug!(logger, "connected to {}, account: {:?}", config.node_url, account)
    });
    Ok(pipeline)
}

fn node_client(config: &SponsorConfig) -> Result<ThorClient, String> {
    ThorClient::new(&config.node_url, config.network_timeout).map_err(report_to_string)
}

pub async fn handle_address_command(network: &NetworkOpts, ctx: &Context) -> Result<(), String> {
    let config = load_config(network).map_err(report_to_string)?;
    let pipeline = connect_pipeline(&config, true, ctx).await?;
    let snapshot = pipeline.session().snapshot().await;

    if let Some(owner) = snapshot.owner {
        println!("{} {}", black!("owner:  "), owner);
    }
    match pipeline.account_address().await {
        Some(account) => println!("{} {}", black!("account:"), green!("{}", account)),
        None => return Err("unable to derive the account address of the owner key".to_string()),
    }
    Ok(())
}

pub async fn handle_account_command(
    cmd: &AccountInfoCommand,
    network: &NetworkOpts,
    ctx: &Context,
) -> Result<(), String> {
    let config = load_config(network).map_err(report_to_string)?;
    let address = match &cmd.address {
        Some(address) => parse_address("address", address).map_err(report_to_string)?,
        None => connect_pipeline(&config, true, ctx)
            .await?
            .account_address()
            .await
            .ok_or("unable to derive the account address of the owner key")?,
    };

    let account = node_client(&config)?.get_account(&address).await.map_err(report_to_string)?;
    println!("{} {}", black!("address:"), address);
    println!("{} {} VET", black!("balance:"), format_amount(account.balance));
    println!("{} {} VTHO", black!("energy: "), format_amount(account.energy));
    println!(
        "{} {}",
        black!("status: "),
        if account.has_code { green!("deployed") } else { yellow!("not deployed") }
    );
    Ok(())
}

pub async fn handle_send_command(
    cmd: &SendCommand,
    network: &NetworkOpts,
    ctx: &Context,
) -> Result<(), String> {
    let request = build_request(cmd)?;
    let config = load_config(network).map_err(report_to_string)?;
    let pipeline = connect_pipeline(&config, cmd.yes, ctx).await?;

    let sent = pipeline.send_transaction_detailed(request).await.map_err(report_to_string)?;
    println!(
        "{} Transaction {} broadcast ({}, {} gas)",
        green!("✓"),
        sent.id,
        pluralize!(sent.plan.clauses.len(), "clause"),
        sent.gas.total_gas
    );
    if sent.plan.deploys_account {
        println!("{} Account {} deployed in the same transaction", yellow!("→"), sent.plan.account.address);
    }

    if cmd.wait {
        let receipt = pipeline
            .wait_for_transaction(&sent.id, RECEIPT_TIMEOUT, DEFAULT_RECEIPT_POLL_INTERVAL)
            .await
            .map_err(report_to_string)?;
        print_receipt(&sent.id, &receipt);
        if receipt.reverted {
            return Err(format!("transaction {} reverted", sent.id));
        }
    }
    Ok(())
}

pub async fn handle_call_command(
    cmd: &ReadCommand,
    network: &NetworkOpts,
    _ctx: &Context,
) -> Result<(), String> {
    let config = load_config(network).map_err(report_to_string)?;
    let contract = parse_address("contract", &cmd.contract).map_err(report_to_string)?;
    let call = EncodedCall::parse(&cmd.function, &cmd.args).map_err(report_to_string)?;

    let values = node_client(&config)?
        .call_read_only(contract, &call.function, &call.args)
        .await
        .map_err(report_to_string)?;
    for (output, value) in call.function.outputs.iter().zip(values.iter()) {
        let name = if output.name.is_empty() { output.ty.as_str() } else { output.name.as_str() };
        println!("{} {:?}", black!("{}:", name), value);
    }
    Ok(())
}

pub async fn handle_status_command(
    cmd: &StatusCommand,
    network: &NetworkOpts,
    _ctx: &Context,
) -> Result<(), String> {
    let config = load_config(network).map_err(report_to_string)?;
    let id = TransactionId::new(cmd.id.trim());
    match node_client(&config)?.get_receipt(&id).await.map_err(report_to_string)? {
        Some(receipt) => print_receipt(&id, &receipt),
        None => println!("{} Transaction {} is pending", yellow!("…"), id),
    }
    Ok(())
}

fn build_request(cmd: &SendCommand) -> Result<AuthorizationRequest, String> {
    let to: Address = parse_address("to", &cmd.to).map_err(report_to_string)?;
    let value: U256 =
        cmd.value.trim().parse().map_err(|e| format!("invalid value '{}': {}", cmd.value, e))?;
    let data = match (&cmd.data, &cmd.function) {
        (Some(data), _) => CallData::Raw(Bytes::from(
            hex::decode(data.trim()).map_err(|e| format!("invalid call data: {}", e))?,
        )),
        (None, Some(function)) => {
            CallData::Encoded(EncodedCall::parse(function, &cmd.args).map_err(report_to_string)?)
        }
        (None, None) => CallData::default(),
    };

    let mut request = AuthorizationRequest::new(to, data)
        .with_value(value)
        .with_validity(cmd.valid_after, cmd.valid_before);
    if let Some(title) = &cmd.title {
        request = request.with_title(title);
    }
    if let Some(description) = &cmd.description {
        request = request.with_description(description);
    }
    if let Some(button_text) = &cmd.button_text {
        request = request.with_button_text(button_text);
    }
    Ok(request)
}

fn format_amount(amount: U256) -> String {
    format_units(amount, 18u8).unwrap_or_else(|_| amount.to_string())
}

fn print_receipt(id: &TransactionId, receipt: &Receipt) {
    let outcome = if receipt.reverted { red!("reverted") } else { green!("succeeded") };
    println!("{} Transaction {} {}", black!("•"), id, outcome);
    println!("{} {} (#{})", black!("block:    "), receipt.meta.block_id, receipt.meta.block_number);
    println!("{} {}", black!("gas used: "), receipt.gas_used);
    println!("{} {} ({} VTHO)", black!("gas payer:"), receipt.gas_payer, format_amount(receipt.paid));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_build_request_with_raw_data() {
        let cmd = SendCommand::parse_from(vec![
            "send",
            "--to",
            "0x00000000000000000000000000000000000000bb",
            "--data",
            "0xd09de08a",
            "--value",
            "1000",
            "--valid-before",
            "1700003600",
            "--title",
            "Increment",
        ]);
        let request = build_request(&cmd).unwrap();
        assert_eq!(request.data, CallData::Raw(Bytes::from(vec![0xd0, 0x9d, 0xe0, 0x8a])));
        assert_eq!(request.value, U256::from(1000u64));
        assert_eq!(request.valid_before, Some(1_700_003_600));
        assert_eq!(request.prompt().title, "Increment");
        assert_eq!(request.prompt().description, " ");
    }

    #[test]
    fn test_build_request_with_function() {
        let cmd = SendCommand::parse_from(vec![
            "send",
            "--to",
            "0x00000000000000000000000000000000000000bb",
            "--function",
            "increment()",
        ]);
        let request = build_request(&cmd).unwrap();
        assert_eq!(request.data.function_name(), Some("increment"));
        assert_eq!(request.prompt().description, "increment");
    }

    #[test]
    fn test_build_request_rejects_bad_recipient() {
        let cmd = SendCommand::parse_from(vec!["send", "--to", "0x1234"]);
        assert!(build_request(&cmd).is_err());
    }

    #[test]
    fn test_pluralize_clauses() {
        assert_eq!(pluralize!(1, "clause"), "1 clause");
        assert_eq!(pluralize!(2, "clause"), "2 clauses");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::from(1_500_000_000_000_000_000u64)), "1.500000000000000000");
    }
}
