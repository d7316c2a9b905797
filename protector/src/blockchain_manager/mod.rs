pub mod token;

use std::{path::Path, str::FromStr, sync::Arc};

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    sol_types::{SolCall, SolConstructor},
};
use anyhow::{Context, Result};
use tracing::{info, warn};
use wallet_bridge::{ChainClient, RpcWallet, Wallet};

use crate::{config::LocalConfig, error::ActionError};

/// Creation bytecode of the two protection contracts.
#[derive(Debug, Clone)]
pub struct ContractBytecode {
    pub callback: Bytes,
    pub reactive: Bytes,
}

impl ContractBytecode {
    pub fn load(local_config: &LocalConfig) -> Result<Self> {
        Ok(Self {
            callback: BlockchainManager::load_bytecode(&local_config.callback_bytecode_path)?,
            reactive: BlockchainManager::load_bytecode(&local_config.reactive_bytecode_path)?,
        })
    }
}

/// BlockchainManager handles wallet creation and typed contract interactions
/// on top of a [`ChainClient`].
pub struct BlockchainManager;

impl BlockchainManager {
    /// Creates the wallet client configured by `WALLET_RPC_URL`.
    ///
    /// # Returns
    /// * `Result<Option<Arc<dyn Wallet>>>` - `None` when no wallet endpoint is configured
    pub fn get_wallet(local_config: &LocalConfig) -> Result<Option<Arc<dyn Wallet>>> {
        let Some(url) = local_config.wallet_rpc_url.as_deref() else {
            warn!("WALLET_RPC_URL is not set, wallet actions are disabled");
            return Ok(None);
        };

        let wallet = RpcWallet::connect(url, local_config.wallet_poll_interval())
            .context("Failed to create the wallet client")?;
        info!("Using wallet endpoint {}", url);

        Ok(Some(Arc::new(wallet)))
    }

    /// Reads hex encoded creation bytecode from a file, with or without `0x`.
    pub fn load_bytecode(path: &Path) -> Result<Bytes> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read bytecode from {}", path.display()))?;

        let bytecode = Bytes::from_str(content.trim())
            .context(format!("{} does not contain hex bytecode", path.display()))?;

        if bytecode.is_empty() {
            anyhow::bail!("{} contains empty bytecode", path.display());
        }

        Ok(bytecode)
    }

    /// Executes a view call and decodes its return values.
    pub async fn read<C: SolCall>(
        client: &dyn ChainClient,
        to: Address,
        call: C,
    ) -> Result<C::Return, ActionError> {
        let output = client.read(to, call.abi_encode().into()).await?;
        Ok(C::abi_decode_returns(output.as_ref(), false)?)
    }

    /// Sends a state changing call and waits for it to be mined.
    pub async fn write<C: SolCall>(
        client: &dyn ChainClient,
        to: Address,
        call: C,
    ) -> Result<TxHash, ActionError> {
        Ok(client.write(to, call.abi_encode().into()).await?)
    }

    /// Deploys `bytecode` with the ABI encoded constructor arguments appended.
    pub async fn deploy<K: SolConstructor>(
        client: &dyn ChainClient,
        bytecode: &Bytes,
        constructor: &K,
        value: U256,
    ) -> Result<Address, ActionError> {
        let mut code = bytecode.to_vec();
        code.extend_from_slice(&constructor.abi_encode());

        Ok(client.deploy(code.into(), value).await?)
    }
}
