use clap::Parser;
use config::Config as ConfigHelper;
use std::error::Error;
use std::fs;
use std::path::Path;

use alloy::primitives::B256;
use backstop_orchestrator::artifacts::ArtifactStore;
use backstop_orchestrator::checkpoint::{CheckpointStore, FileCheckpointStore};
use backstop_orchestrator::clients::Clients;
use backstop_orchestrator::config::{DeployParameters, GLOBAL_CONFIG};
use backstop_orchestrator::domain::Domain;
use backstop_orchestrator::{deploy_base, spawn_instance};

#[derive(Debug, Clone, clap::ValueEnum, Default)]
pub enum TargetEnv {
    Testnet,
    Mainnet,
    #[default]
    Local,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Enviroment config to use
    #[arg(short, long, default_value = "local")]
    target_env: TargetEnv,
    /// Chain to deploy to, as named in the environment config
    #[arg(short, long, default_value = "sepolia")]
    chain: String,
    /// Path to the deployment parameter document
    #[arg(short, long, default_value = "deployment/deploy_parameters.json")]
    parameters_path: String,
    /// Path to the genesis document of the L2 instance
    #[arg(short, long, default_value = "deployment/genesis.json")]
    genesis_path: String,
    /// Checkpoint file for this run; keeps completed stages across restarts
    #[arg(long, default_value = "deployment/deploy_ongoing.json")]
    checkpoint_path: String,
    /// Where the final deployment output is written
    #[arg(short, long, default_value = "deployment/deploy_output.json")]
    output_path: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    set_orchestrator_config(args.target_env.clone()).await?;

    let params = DeployParameters::load(&args.parameters_path)?;
    let genesis_root = read_genesis_root(&args.genesis_path)?;

    let artifacts_dir = GLOBAL_CONFIG.lock().await.get_artifacts_dir();
    let artifacts = ArtifactStore::new(artifacts_dir);

    let clients = Clients::default();
    let domain = Domain::EthEvm(args.chain.clone());
    let client = clients.get_or_create_client(&domain).await?;

    let mut store = FileCheckpointStore::open(&args.checkpoint_path)?;

    let generated = deploy_base(client.as_ref(), &params, &artifacts, &mut store).await?;
    let output = spawn_instance(client.as_ref(), &params, &generated, genesis_root).await?;

    output.write_json(&args.output_path)?;

    // the in-progress marker only goes away once the whole run succeeded
    store.clear()?;

    println!(
        "Stack was deployed successfully and written to: {}",
        args.output_path
    );

    Ok(())
}

fn read_genesis_root(path: &str) -> Result<B256, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    let genesis: serde_json::Value = serde_json::from_str(&content)?;
    let root = genesis
        .get("root")
        .and_then(|r| r.as_str())
        .ok_or("genesis document is missing its root")?;
    Ok(root.parse()?)
}

pub fn get_config(
    target_env: TargetEnv,
) -> Result<backstop_orchestrator::config::Config, Box<dyn Error>> {
    match target_env {
        TargetEnv::Testnet => config_from_glob("deployment/configs/testnet"),
        TargetEnv::Mainnet => config_from_glob("deployment/configs/mainnet"),
        TargetEnv::Local => ConfigHelper::builder()
            .add_source(config::File::with_name("deployment/configs/local/config"))
            .build()?
            .try_deserialize()
            .map_err(|e| e.into()),
    }
}

fn config_from_glob(dir: &str) -> Result<backstop_orchestrator::config::Config, Box<dyn Error>> {
    ConfigHelper::builder()
        .add_source(
            glob::glob(&format!("{dir}/*"))?
                .filter_map(|path| {
                    let p = path.ok()?;
                    if Path::new(&p).is_dir() {
                        None
                    } else {
                        Some(config::File::from(p))
                    }
                })
                .collect::<Vec<_>>(),
        )
        .add_source(
            glob::glob(&format!("{dir}/**/*"))?
                .filter_map(|path| {
                    let p = path.ok()?;
                    if Path::new(&p).is_dir() {
                        None
                    } else {
                        Some(config::File::from(p))
                    }
                })
                .collect::<Vec<_>>(),
        )
        .build()?
        .try_deserialize()
        .map_err(|e| e.into())
}

async fn set_orchestrator_config(target_env: TargetEnv) -> Result<(), Box<dyn Error>> {
    let config = get_config(target_env)?;

    let mut gc = GLOBAL_CONFIG.lock().await;
    *gc = config;
    Ok(())
}
