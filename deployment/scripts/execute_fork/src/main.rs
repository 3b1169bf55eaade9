use clap::Parser;
use config::Config as ConfigHelper;
use log::info;
use std::error::Error;
use std::fs;

use alloy::primitives::{Address, B256};
use backstop_orchestrator::clients::Clients;
use backstop_orchestrator::config::GLOBAL_CONFIG;
use backstop_orchestrator::domain::Domain;
use backstop_orchestrator::error::OrchestratorError;
use backstop_orchestrator::fork::{DisputeData, ForkDriver, ForkState};
use backstop_orchestrator::output::DeploymentOutput;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Name of the deployment under deployments/
    deployment_name: String,
    /// Chain the instance lives on, as named in the config
    #[arg(short, long, default_value = "sepolia")]
    chain: String,
    /// Environment config file
    #[arg(long, default_value = "deployment/configs/local/config")]
    config_path: String,
    /// Dispute payload recorded with the fork proposal
    #[arg(long, default_value = "0x0000000000000000000000000000000000000000000000000000000000000000")]
    dispute_content: B256,
    /// Contract the dispute is about; defaults to the forking manager itself
    #[arg(long)]
    dispute_contract: Option<Address>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let config: backstop_orchestrator::config::Config = ConfigHelper::builder()
        .add_source(config::File::with_name(&args.config_path))
        .build()?
        .try_deserialize()?;
    *GLOBAL_CONFIG.lock().await = config;

    let output_path = format!(
        "deployments/{}/deploy_output.json",
        args.deployment_name
    );
    let output = DeploymentOutput::read_json(&output_path)?;
    let parent = output.instance_record();

    let clients = Clients::default();
    let client = clients
        .get_or_create_client(&Domain::EthEvm(args.chain.clone()))
        .await?;

    let driver = ForkDriver::new(
        client.as_ref(),
        output.forking_manager,
        output.forkonomic_token_address,
    );

    match driver.state().await? {
        ForkState::Idle => {
            info!("Initiating fork on {}", output.forking_manager);
            let dispute = DisputeData {
                disputeContract: args.dispute_contract.unwrap_or(output.forking_manager),
                disputeContent: args.dispute_content,
                isL1: true,
            };
            driver.initiate_fork(dispute).await?;
        }
        ForkState::ForkProposed => {
            info!("A fork proposal already exists, skipping initiation");
        }
        ForkState::ForkExecuted => {
            return Err(OrchestratorError::ForkAlreadyExecuted.into());
        }
    }

    let (child_one, child_two) = driver.execute_fork(&parent).await?;

    for (index, child) in [(1, &child_one), (2, &child_two)] {
        let path = format!(
            "deployments/{}/fork_output_{}.json",
            args.deployment_name, index
        );
        fs::write(&path, serde_json::to_string_pretty(child)?)?;
        info!("Child {index} instance written to: {path}");
    }

    println!(
        "Fork executed: children on chains {} and {}",
        child_one.chain_id, child_two.chain_id
    );

    Ok(())
}
