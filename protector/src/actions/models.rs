use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::utils::{
    constants::{FORM_DECIMALS, HEALTH_FACTOR_DECIMALS, LIQUIDATION_THRESHOLD},
    math_helper,
};

/// Constructor inputs of the callback contract taken from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackDeployment {
    pub collateral_token: Address,
    pub price_feed: Address,
}

/// Constructor inputs of the reactive contract taken from the form and the
/// already deployed callback contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveDeployment {
    pub lending_pool: Address,
    pub callback: Address,
    pub uniswap_pair: Address,
    pub health_factor_threshold: U256,
    pub target_health_factor: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthStatus {
    Unknown,
    Liquidatable,
    AtRisk,
    Healthy,
}

impl HealthStatus {
    /// Places a health factor in one of three tiers: below 1.0 is
    /// liquidatable, up to the protection threshold is at risk.
    pub fn classify(health_factor: U256, at_risk_threshold: U256) -> Self {
        let health_factor =
            math_helper::divide_by_precision_f64(health_factor, HEALTH_FACTOR_DECIMALS);
        let at_risk_threshold =
            math_helper::divide_by_precision_f64(at_risk_threshold, FORM_DECIMALS);

        if health_factor < LIQUIDATION_THRESHOLD {
            HealthStatus::Liquidatable
        } else if health_factor <= at_risk_threshold {
            HealthStatus::AtRisk
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Last health factor read for the connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthFactorReading {
    /// Decimal string, e.g. `"1.5"`.
    pub value: String,
    pub status: HealthStatus,
}

impl Default for HealthFactorReading {
    fn default() -> Self {
        Self {
            value: "0".to_string(),
            status: HealthStatus::Unknown,
        }
    }
}

impl HealthFactorReading {
    pub fn new(health_factor: U256, at_risk_threshold: U256) -> Self {
        Self {
            value: math_helper::format_units(health_factor, HEALTH_FACTOR_DECIMALS),
            status: HealthStatus::classify(health_factor, at_risk_threshold),
        }
    }
}
