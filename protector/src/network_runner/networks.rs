use serde::{Deserialize, Serialize};
use wallet_bridge::{AddChainParameters, NativeCurrency};

use crate::utils::constants::{
    KOPLI_CHAIN_ID, KOPLI_CHAIN_NAME, KOPLI_CURRENCY_DECIMALS, KOPLI_CURRENCY_SYMBOL,
    KOPLI_EXPLORER_URL, KOPLI_NAME, KOPLI_RPC_URL, SEPOLIA_CHAIN_ID, SEPOLIA_NAME,
};

/// The two networks the deployer works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Default network: callback contract, token approval and pool reads.
    Sepolia,
    /// Reactive network hosting the monitoring contract.
    Kopli,
}

impl Network {
    pub fn target(self) -> TargetNetwork {
        match self {
            Network::Sepolia => TargetNetwork {
                chain_id: SEPOLIA_CHAIN_ID,
                name: SEPOLIA_NAME,
                registration: None,
            },
            Network::Kopli => TargetNetwork {
                chain_id: KOPLI_CHAIN_ID,
                name: KOPLI_NAME,
                registration: Some(kopli_registration()),
            },
        }
    }
}

/// A chain an action needs, plus what the wallet must be told to register it.
///
/// Only networks carrying `registration` are added on an "unrecognized chain"
/// switch failure; the default network is assumed to be known to every wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNetwork {
    pub chain_id: u64,
    pub name: &'static str,
    pub registration: Option<AddChainParameters>,
}

pub fn kopli_registration() -> AddChainParameters {
    AddChainParameters {
        chain_id: KOPLI_CHAIN_ID,
        chain_name: KOPLI_CHAIN_NAME.to_string(),
        native_currency: NativeCurrency {
            name: KOPLI_CURRENCY_SYMBOL.to_string(),
            symbol: KOPLI_CURRENCY_SYMBOL.to_string(),
            decimals: KOPLI_CURRENCY_DECIMALS,
        },
        rpc_urls: vec![KOPLI_RPC_URL.to_string()],
        block_explorer_urls: vec![KOPLI_EXPLORER_URL.to_string()],
    }
}

/// Display name for a chain id as shown next to the connected account.
pub fn network_name(chain_id: u64) -> String {
    match chain_id {
        KOPLI_CHAIN_ID => KOPLI_NAME.to_string(),
        SEPOLIA_CHAIN_ID => SEPOLIA_NAME.to_string(),
        other => format!("Chain ID: {}", other),
    }
}

pub fn explorer_address_url(address: &alloy::primitives::Address) -> String {
    format!("{}/address/{}", KOPLI_EXPLORER_URL, address)
}
