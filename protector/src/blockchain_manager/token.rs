use alloy::primitives::{Address, U256};
use futures::try_join;
use wallet_bridge::ChainClient;

use super::BlockchainManager;
use crate::{error::ActionError, utils::contracts::Erc20Contract, utils::math_helper};

/// Display metadata of an ERC20 token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub async fn fetch(client: &dyn ChainClient, token: Address) -> Result<Self, ActionError> {
        let (symbol, decimals) = try_join!(
            BlockchainManager::read(client, token, Erc20Contract::symbolCall {}),
            BlockchainManager::read(client, token, Erc20Contract::decimalsCall {}),
        )?;

        Ok(Self {
            symbol: symbol._0,
            decimals: decimals._0,
        })
    }

    pub fn amount(&self, raw: U256) -> TokenAmount {
        TokenAmount {
            raw,
            decimals: self.decimals,
            symbol: self.symbol.clone(),
        }
    }
}

/// A raw token amount together with what is needed to display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    pub raw: U256,
    pub decimals: u8,
    pub symbol: String,
}

impl TokenAmount {
    pub fn formatted(&self) -> String {
        math_helper::format_units(self.raw, self.decimals)
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.formatted(), self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_amount_display() {
        let info = TokenInfo {
            symbol: "USDC".to_string(),
            decimals: 6,
        };
        assert_eq!(info.amount(U256::from(2_500_000)).to_string(), "2.5 USDC");
    }
}
