use clap::Parser;
use config::Config as ConfigHelper;
use std::error::Error;
use std::fs;

use alloy::primitives::Address;
use backstop_orchestrator::apps::{
    deploy_l1_applications, deploy_l2_applications, update_l2_chain_info, L1Applications,
};
use backstop_orchestrator::artifacts::ArtifactStore;
use backstop_orchestrator::checkpoint::{CheckpointStore, FileCheckpointStore};
use backstop_orchestrator::clients::Clients;
use backstop_orchestrator::config::GLOBAL_CONFIG;
use backstop_orchestrator::domain::Domain;
use backstop_orchestrator::output::DeploymentOutput;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Bridge contract address inside the L2 genesis
    #[arg(long)]
    l2_bridge: Address,
    /// L1 chain, as named in the config
    #[arg(long, default_value = "sepolia")]
    l1_chain: String,
    /// L2 chain, as named in the config
    #[arg(long, default_value = "backstop-l2")]
    l2_chain: String,
    /// Environment config file
    #[arg(long, default_value = "deployment/configs/local/config")]
    config_path: String,
    /// Output of the base system deployment
    #[arg(long, default_value = "deployment/deploy_output.json")]
    system_output_path: String,
    #[arg(long, default_value = "deployment/deploy_ongoing_l1_applications.json")]
    l1_checkpoint_path: String,
    #[arg(long, default_value = "deployment/deploy_ongoing_l2_applications.json")]
    l2_checkpoint_path: String,
    #[arg(long, default_value = "deployment/deploy_output_l1_applications.json")]
    l1_output_path: String,
    #[arg(long, default_value = "deployment/deploy_output_l2_applications.json")]
    l2_output_path: String,
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

    let system_output = DeploymentOutput::read_json(&args.system_output_path)?;

    let artifacts_dir = GLOBAL_CONFIG.lock().await.get_artifacts_dir();
    let artifacts = ArtifactStore::new(artifacts_dir);

    let clients = Clients::default();
    let l1_client = clients
        .get_or_create_client(&Domain::EthEvm(args.l1_chain.clone()))
        .await?;

    let mut l1_store = FileCheckpointStore::open(&args.l1_checkpoint_path)?;
    let l1_applications: L1Applications =
        deploy_l1_applications(l1_client.as_ref(), &mut l1_store, &artifacts).await?;
    fs::write(
        &args.l1_output_path,
        serde_json::to_string_pretty(&l1_applications)?,
    )?;
    l1_store.clear()?;

    let l2_client = clients
        .get_or_create_client(&Domain::EthEvm(args.l2_chain.clone()))
        .await?;
    let mut l2_store = FileCheckpointStore::open(&args.l2_checkpoint_path)?;
    let l2_applications = deploy_l2_applications(
        l2_client.as_ref(),
        &mut l2_store,
        &artifacts,
        &l1_applications,
        args.l2_bridge,
    )
    .await?;
    fs::write(
        &args.l2_output_path,
        serde_json::to_string_pretty(&l2_applications)?,
    )?;
    l2_store.clear()?;

    update_l2_chain_info(
        l1_client.as_ref(),
        &system_output,
        &l1_applications,
        &l2_applications,
    )
    .await?;

    println!(
        "Applications deployed: publisher {}, fork requester {}, l2 chain info {}",
        l1_applications.l1_global_chain_info_publisher,
        l1_applications.l1_global_fork_requester,
        l2_applications.l2_chain_info
    );

    Ok(())
}
