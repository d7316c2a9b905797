use std::{path::PathBuf, time::Duration};

use alloy::primitives::U256;
use anyhow::Result;

use super::env_helper::{load_env_var_or, load_optional_env_var};
use crate::utils::constants::{AAVE_SEPOLIA_POOL, DEFAULT_DEPLOYMENT_VALUE_WEI};

#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// EIP-1193 JSON-RPC wallet endpoint. `None` means no wallet is available.
    pub wallet_rpc_url: Option<String>,
    pub port: u16,
    pub callback_bytecode_path: PathBuf,
    pub reactive_bytecode_path: PathBuf,
    pub network_settle_delay_ms: u64,
    pub wallet_poll_interval_ms: u64,
    pub default_lending_pool: String,
    pub deployment_value_wei: U256,
    pub notification_ttl_ms: u64,
}

impl LocalConfig {
    pub fn load_from_env() -> Result<Self> {
        Ok(Self {
            wallet_rpc_url: load_optional_env_var("WALLET_RPC_URL")?,
            port: load_env_var_or("PORT", 8080)?,
            callback_bytecode_path: load_env_var_or(
                "CALLBACK_BYTECODE_PATH",
                PathBuf::from("contracts/callback.bin"),
            )?,
            reactive_bytecode_path: load_env_var_or(
                "REACTIVE_BYTECODE_PATH",
                PathBuf::from("contracts/reactive.bin"),
            )?,
            network_settle_delay_ms: load_env_var_or("NETWORK_SETTLE_DELAY_MS", 1500)?,
            wallet_poll_interval_ms: load_env_var_or("WALLET_POLL_INTERVAL_MS", 2000)?,
            default_lending_pool: load_env_var_or(
                "DEFAULT_LENDING_POOL",
                AAVE_SEPOLIA_POOL.to_string(),
            )?,
            deployment_value_wei: load_env_var_or(
                "DEPLOYMENT_VALUE_WEI",
                U256::from(DEFAULT_DEPLOYMENT_VALUE_WEI),
            )?,
            notification_ttl_ms: load_env_var_or("NOTIFICATION_TTL_MS", 5000)?,
        })
    }

    pub fn network_settle_delay(&self) -> Duration {
        Duration::from_millis(self.network_settle_delay_ms)
    }

    pub fn wallet_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wallet_poll_interval_ms)
    }
}
