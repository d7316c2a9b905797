use std::sync::Arc;

use anyhow::{Context, Result};
use protector::{
    blockchain_manager::{BlockchainManager, ContractBytecode},
    config::LocalConfig,
    controller::Controller,
    server, utils,
};
use tracing::{error, info};

/// Main entry point for the Liquidation Protection Deployer
///
/// This function performs the following steps:
/// 1. Initializes the pre-run environment
/// 2. Loads the configuration, the wallet endpoint and the contract bytecode
/// 3. Starts the control server
/// 4. Stops on Ctrl+C or when the server fails
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_pre_run()?;

    info!("Starting the Liquidation Protection Deployer");

    let local_config = LocalConfig::load_from_env()?;

    let wallet = BlockchainManager::get_wallet(&local_config)?;
    let bytecode = ContractBytecode::load(&local_config).context("Failed to load contract bytecode")?;

    let controller = Arc::new(Controller::new(wallet, bytecode, &local_config));

    let server_handle = tokio::spawn(server::serve(controller, local_config.port));

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Control server stopped"),
                Ok(Err(e)) => {
                    let error_message = e.chain().map(|e| e.to_string()).collect::<Vec<_>>().join(" -> ");
                    error!("Control server failed with error: {}", error_message);
                    return Err(anyhow::anyhow!("Control server failed: {}", error_message));
                }
                Err(e) => {
                    error!("Control server task panicked: {}", e);
                    return Err(anyhow::anyhow!("Control server task panicked: {}", e));
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

/// Initializes the pre-run environment
///
/// This function performs the following steps:
/// 1. Loads environment variables from the `.env` file, if there is one
/// 2. Sets up the logger
///
/// # Returns
/// * `Result<()>` - Success or error if any step fails
fn init_pre_run() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("Failed to load environment variables"),
    }
    utils::logger::setup_logger().context("Failed to setup logger")?;

    Ok(())
}
