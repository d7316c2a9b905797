pub mod models;

use alloy::primitives::{Address, Bytes, U256};

use crate::{
    blockchain_manager::{
        token::{TokenAmount, TokenInfo},
        BlockchainManager,
    },
    error::ActionError,
    network_runner::{networks::Network, NetworkAwareRunner},
    notifications::Notifier,
    utils::{
        constants::{FORM_DECIMALS, KOPLI_SYSTEM_CONTRACT},
        contracts::{
            Erc20Contract, LendingPoolContract, ProtectionCallbackContract,
            ProtectionReactiveContract,
        },
        math_helper,
    },
};
use models::{CallbackDeployment, ReactiveDeployment};

/// Wallet actions of the protection flow.
///
/// Each one runs through the [`NetworkAwareRunner`] on the chain it needs and
/// returns what it produced. None of them touches controller state; committing
/// results is left to the caller so a failed or cancelled action writes nothing.
///
/// Actions that send a transaction call `claim` right before sending it and
/// give up if it fails.
pub struct ProtectionActions;

impl ProtectionActions {
    /// Reads the connected account's raw health factor (18 decimals) from the
    /// lending pool on Sepolia.
    pub async fn fetch_health_factor(
        runner: &NetworkAwareRunner,
        lending_pool: Address,
    ) -> Result<U256, ActionError> {
        runner
            .run(&Network::Sepolia.target(), "", |session| async move {
                let account_data = BlockchainManager::read(
                    session.client.as_ref(),
                    lending_pool,
                    LendingPoolContract::getUserAccountDataCall {
                        user: session.account,
                    },
                )
                .await?;

                Ok(account_data.healthFactor)
            })
            .await
    }

    /// Deploys the callback contract on Sepolia with the Kopli system contract
    /// as the only allowed callback sender.
    pub async fn deploy_callback(
        runner: &NetworkAwareRunner,
        bytecode: &Bytes,
        deployment: &CallbackDeployment,
        value: U256,
        claim: impl FnOnce() -> Result<(), ActionError>,
    ) -> Result<Address, ActionError> {
        let constructor = ProtectionCallbackContract::constructorCall {
            callbackSender: KOPLI_SYSTEM_CONTRACT,
            collateralToken: deployment.collateral_token,
            collateralTokenPriceFeed: deployment.price_feed,
        };

        runner
            .run(
                &Network::Sepolia.target(),
                "for callback contract deployment",
                |session| async move {
                    claim()?;
                    BlockchainManager::deploy(session.client.as_ref(), bytecode, &constructor, value)
                        .await
                },
            )
            .await
    }

    /// Deploys the reactive contract on Kopli, watching the connected account.
    pub async fn deploy_reactive(
        runner: &NetworkAwareRunner,
        bytecode: &Bytes,
        deployment: &ReactiveDeployment,
        value: U256,
        claim: impl FnOnce() -> Result<(), ActionError>,
    ) -> Result<Address, ActionError> {
        runner
            .run(
                &Network::Kopli.target(),
                "for reactive contract deployment",
                |session| async move {
                    let constructor = ProtectionReactiveContract::constructorCall {
                        lendingPool: deployment.lending_pool,
                        protectionManager: deployment.callback,
                        uniswapPair: deployment.uniswap_pair,
                        user: session.account,
                        healthFactorThreshold: deployment.health_factor_threshold,
                        targetHealthFactor: deployment.target_health_factor,
                    };

                    claim()?;
                    BlockchainManager::deploy(session.client.as_ref(), bytecode, &constructor, value)
                        .await
                },
            )
            .await
    }

    /// Approves `spender` to pull `amount` of the collateral token.
    ///
    /// `amount` is an 18 decimals fixed point value and is rescaled to the
    /// token's own decimals before sending.
    pub async fn approve_collateral(
        runner: &NetworkAwareRunner,
        notifier: &Notifier,
        token: Address,
        spender: Address,
        amount: U256,
        claim: impl FnOnce() -> Result<(), ActionError>,
    ) -> Result<TokenAmount, ActionError> {
        runner
            .run(
                &Network::Sepolia.target(),
                "for token approval",
                |session| async move {
                    let client = session.client.as_ref();
                    let token_info = TokenInfo::fetch(client, token).await?;

                    let raw = math_helper::rescale_units(amount, FORM_DECIMALS, token_info.decimals)
                        .ok_or(ActionError::InvalidInput {
                            field: "approval amount",
                        })?;
                    let amount = token_info.amount(raw);

                    claim()?;
                    notifier.info(format!("Approving {}...", amount));

                    BlockchainManager::write(
                        client,
                        token,
                        Erc20Contract::approveCall {
                            spender,
                            amount: raw,
                        },
                    )
                    .await?;

                    Ok(amount)
                },
            )
            .await
    }

    /// Reads how much of the collateral token `spender` may pull from the
    /// connected account.
    pub async fn check_allowance(
        runner: &NetworkAwareRunner,
        token: Address,
        spender: Address,
    ) -> Result<TokenAmount, ActionError> {
        runner
            .run(
                &Network::Sepolia.target(),
                "to check allowance",
                |session| async move {
                    let client = session.client.as_ref();
                    let allowance = BlockchainManager::read(
                        client,
                        token,
                        Erc20Contract::allowanceCall {
                            owner: session.account,
                            spender,
                        },
                    )
                    .await?;

                    let token_info = TokenInfo::fetch(client, token).await?;
                    Ok(token_info.amount(allowance._0))
                },
            )
            .await
    }

    /// Asks the callback contract how much collateral would lift the connected
    /// account back to `target_health_factor`.
    pub async fn calculate_protection(
        runner: &NetworkAwareRunner,
        callback: Address,
        lending_pool: Address,
        token: Address,
        target_health_factor: U256,
    ) -> Result<TokenAmount, ActionError> {
        runner
            .run(
                &Network::Sepolia.target(),
                "to calculate protection",
                |session| async move {
                    let client = session.client.as_ref();
                    let collateral_needed = BlockchainManager::read(
                        client,
                        callback,
                        ProtectionCallbackContract::calculateCollateralNeededCall {
                            user: session.account,
                            lendingPool: lending_pool,
                            targetHealthFactor: target_health_factor,
                        },
                    )
                    .await?;

                    let token_info = TokenInfo::fetch(client, token).await?;
                    Ok(token_info.amount(collateral_needed._0))
                },
            )
            .await
    }
}
