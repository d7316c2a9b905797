use std::str::FromStr;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    actions::models::{CallbackDeployment, ReactiveDeployment},
    error::ActionError,
    utils::constants::{
        DEFAULT_APPROVAL_AMOUNT, DEFAULT_HEALTH_FACTOR_THRESHOLD, DEFAULT_TARGET_HEALTH_FACTOR,
    },
};

/// Deployment inputs as typed by the user. Fields stay raw strings and are
/// only validated when an action reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentForm {
    pub lending_pool: String,
    pub collateral_token: String,
    pub collateral_price_feed: String,
    pub uniswap_pair: String,
    pub health_factor_threshold: String,
    pub target_health_factor: String,
    pub approval_amount: String,
}

/// Partial form update, absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormUpdate {
    pub lending_pool: Option<String>,
    pub collateral_token: Option<String>,
    pub collateral_price_feed: Option<String>,
    pub uniswap_pair: Option<String>,
    pub health_factor_threshold: Option<String>,
    pub target_health_factor: Option<String>,
    pub approval_amount: Option<String>,
}

fn parse_address(value: &str, field: &'static str) -> Result<Address, ActionError> {
    Address::from_str(value.trim()).map_err(|_| ActionError::InvalidInput { field })
}

fn parse_integer(value: &str, field: &'static str) -> Result<U256, ActionError> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ActionError::InvalidInput { field });
    }
    U256::from_str_radix(value, 10).map_err(|_| ActionError::InvalidInput { field })
}

impl DeploymentForm {
    pub fn new(default_lending_pool: &str) -> Self {
        Self {
            lending_pool: default_lending_pool.to_string(),
            collateral_token: String::new(),
            collateral_price_feed: String::new(),
            uniswap_pair: String::new(),
            health_factor_threshold: DEFAULT_HEALTH_FACTOR_THRESHOLD.to_string(),
            target_health_factor: DEFAULT_TARGET_HEALTH_FACTOR.to_string(),
            approval_amount: DEFAULT_APPROVAL_AMOUNT.to_string(),
        }
    }

    /// Applies `update` and reports whether the lending pool changed.
    pub fn apply(&mut self, update: FormUpdate) -> bool {
        let previous_pool = self.lending_pool.clone();

        let fields = [
            (&mut self.lending_pool, update.lending_pool),
            (&mut self.collateral_token, update.collateral_token),
            (&mut self.collateral_price_feed, update.collateral_price_feed),
            (&mut self.uniswap_pair, update.uniswap_pair),
            (&mut self.health_factor_threshold, update.health_factor_threshold),
            (&mut self.target_health_factor, update.target_health_factor),
            (&mut self.approval_amount, update.approval_amount),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }

        self.lending_pool != previous_pool
    }

    pub fn lending_pool(&self) -> Result<Address, ActionError> {
        parse_address(&self.lending_pool, "lending pool address")
    }

    pub fn collateral_token(&self) -> Result<Address, ActionError> {
        parse_address(&self.collateral_token, "collateral token address")
    }

    pub fn collateral_price_feed(&self) -> Result<Address, ActionError> {
        parse_address(&self.collateral_price_feed, "collateral price feed address")
    }

    pub fn uniswap_pair(&self) -> Result<Address, ActionError> {
        parse_address(&self.uniswap_pair, "Uniswap pair address")
    }

    pub fn health_factor_threshold(&self) -> Result<U256, ActionError> {
        parse_integer(&self.health_factor_threshold, "health factor threshold")
    }

    /// Threshold used to classify the health factor. Falls back to the default
    /// while the field does not hold an integer.
    pub fn at_risk_threshold(&self) -> U256 {
        self.health_factor_threshold()
            .or_else(|_| parse_integer(DEFAULT_HEALTH_FACTOR_THRESHOLD, "health factor threshold"))
            .unwrap_or_default()
    }

    pub fn target_health_factor(&self) -> Result<U256, ActionError> {
        parse_integer(&self.target_health_factor, "target health factor")
    }

    pub fn approval_amount(&self) -> Result<U256, ActionError> {
        parse_integer(&self.approval_amount, "approval amount")
    }

    pub fn callback_deployment(&self) -> Result<CallbackDeployment, ActionError> {
        Ok(CallbackDeployment {
            collateral_token: self.collateral_token()?,
            price_feed: self.collateral_price_feed()?,
        })
    }

    pub fn reactive_deployment(&self, callback: Address) -> Result<ReactiveDeployment, ActionError> {
        Ok(ReactiveDeployment {
            lending_pool: self.lending_pool()?,
            callback,
            uniswap_pair: self.uniswap_pair()?,
            health_factor_threshold: self.health_factor_threshold()?,
            target_health_factor: self.target_health_factor()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::AAVE_SEPOLIA_POOL;

    #[test]
    fn test_defaults() {
        let form = DeploymentForm::new(AAVE_SEPOLIA_POOL);
        assert_eq!(
            form.lending_pool().unwrap(),
            Address::from_str(AAVE_SEPOLIA_POOL).unwrap()
        );
        assert_eq!(
            form.health_factor_threshold().unwrap(),
            U256::from(1_200_000_000_000_000_000u64)
        );
        assert_eq!(
            form.target_health_factor().unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(
            form.collateral_token(),
            Err(ActionError::InvalidInput {
                field: "collateral token address"
            })
        );
    }

    #[test]
    fn test_apply_reports_pool_change() {
        let mut form = DeploymentForm::new(AAVE_SEPOLIA_POOL);

        let changed = form.apply(FormUpdate {
            collateral_token: Some(format!("{}", Address::repeat_byte(7))),
            ..Default::default()
        });
        assert!(!changed);
        assert_eq!(form.collateral_token().unwrap(), Address::repeat_byte(7));

        let changed = form.apply(FormUpdate {
            lending_pool: Some(AAVE_SEPOLIA_POOL.to_string()),
            ..Default::default()
        });
        assert!(!changed);

        let changed = form.apply(FormUpdate {
            lending_pool: Some(format!("{}", Address::repeat_byte(9))),
            ..Default::default()
        });
        assert!(changed);
    }

    #[test]
    fn test_integer_fields_reject_decimals_and_signs() {
        let mut form = DeploymentForm::new(AAVE_SEPOLIA_POOL);
        for bad in ["1.5", "-1", "", "1e18", "abc"] {
            form.apply(FormUpdate {
                approval_amount: Some(bad.to_string()),
                ..Default::default()
            });
            assert_eq!(
                form.approval_amount(),
                Err(ActionError::InvalidInput {
                    field: "approval amount"
                }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_reactive_deployment_needs_every_field() {
        let mut form = DeploymentForm::new(AAVE_SEPOLIA_POOL);
        assert_eq!(
            form.reactive_deployment(Address::repeat_byte(1)),
            Err(ActionError::InvalidInput {
                field: "Uniswap pair address"
            })
        );

        form.apply(FormUpdate {
            uniswap_pair: Some(format!("{}", Address::repeat_byte(3))),
            ..Default::default()
        });
        let deployment = form.reactive_deployment(Address::repeat_byte(1)).unwrap();
        assert_eq!(deployment.callback, Address::repeat_byte(1));
        assert_eq!(deployment.uniswap_pair, Address::repeat_byte(3));
    }

    #[test]
    fn test_update_deserializes_camel_case() {
        let update: FormUpdate =
            serde_json::from_str(r#"{"targetHealthFactor":"2000000000000000000"}"#).unwrap();
        assert_eq!(update.target_health_factor.as_deref(), Some("2000000000000000000"));
        assert!(update.lending_pool.is_none());
    }
}
