use clap::Parser;
use config::Config as ConfigHelper;
use std::error::Error;
use std::process::ExitCode;

use alloy::primitives::Address;
use backstop_orchestrator::claims::{BridgeApiClient, ClaimResolver};
use backstop_orchestrator::clients::Clients;
use backstop_orchestrator::config::GLOBAL_CONFIG;
use backstop_orchestrator::domain::Domain;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address deposits were sent to
    claim_for: Address,
    /// Bridge contract on the destination chain
    #[arg(short, long)]
    bridge: Address,
    /// Destination chain, as named in the config
    #[arg(short, long, default_value = "backstop-l2")]
    chain: String,
    /// Environment config file
    #[arg(long, default_value = "deployment/configs/local/config")]
    config_path: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let config: backstop_orchestrator::config::Config = ConfigHelper::builder()
        .add_source(config::File::with_name(&args.config_path))
        .build()?
        .try_deserialize()?;
    *GLOBAL_CONFIG.lock().await = config;

    let base_url = GLOBAL_CONFIG.lock().await.get_bridge_api_url();
    if base_url.is_empty() {
        return Err("Missing bridge api url".into());
    }
    println!("using baseURL {base_url}");
    let api = BridgeApiClient::new(base_url);

    let clients = Clients::default();
    let client = clients
        .get_or_create_client(&Domain::EthEvm(args.chain.clone()))
        .await?;

    let resolver = ClaimResolver::new(client.as_ref(), &api, args.bridge);
    let claimable = resolver.wait_for_claimable(args.claim_for).await?;
    let report = resolver.claim_all(&claimable).await;
    report.log_summary();

    // partial failure is reported, not fatal; only a fully failed run is
    if report.claimed.is_empty() && !report.failed.is_empty() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
