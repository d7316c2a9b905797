use alloy::primitives::{address, Address};

// --------- Networks ---------
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
pub const SEPOLIA_NAME: &str = "Sepolia";

pub const KOPLI_CHAIN_ID: u64 = 5318008;
pub const KOPLI_NAME: &str = "Kopli";
pub const KOPLI_CHAIN_NAME: &str = "Reactive Kopli";
pub const KOPLI_RPC_URL: &str = "https://kopli-rpc.rnk.dev/";
pub const KOPLI_EXPLORER_URL: &str = "https://kopli.reactscan.net";
pub const KOPLI_CURRENCY_SYMBOL: &str = "REACT";
pub const KOPLI_CURRENCY_DECIMALS: u8 = 18;

/// Reactive network system contract, the only sender allowed to invoke callbacks.
pub const KOPLI_SYSTEM_CONTRACT: Address = address!("0000000000000000000000000000000000ffffff");

// --------- Lending pool ---------
pub const AAVE_SEPOLIA_POOL: &str = "0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951";
pub const HEALTH_FACTOR_DECIMALS: u8 = 18;
pub const LIQUIDATION_THRESHOLD: f64 = 1.0;

// --------- Form defaults (18 decimals fixed point) ---------
pub const FORM_DECIMALS: u8 = 18;
pub const DEFAULT_HEALTH_FACTOR_THRESHOLD: &str = "1200000000000000000";
pub const DEFAULT_TARGET_HEALTH_FACTOR: &str = "1500000000000000000";
pub const DEFAULT_APPROVAL_AMOUNT: &str = "1000000000000000000";

/// 0.01 ether sent along with each deployment to fund callback gas.
pub const DEFAULT_DEPLOYMENT_VALUE_WEI: u64 = 10_000_000_000_000_000;
