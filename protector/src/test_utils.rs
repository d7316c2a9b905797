//! In-memory wallet double recording every request it receives.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use alloy::{
    primitives::{address, Address, Bytes, TxHash, U256},
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use tokio::sync::broadcast;
use wallet_bridge::{
    AddChainParameters, ChainClient, Wallet, WalletError, WalletEvent, UNRECOGNIZED_CHAIN_CODE,
};

use crate::utils::{
    constants::{KOPLI_CHAIN_ID, SEPOLIA_CHAIN_ID},
    contracts::{Erc20Contract, LendingPoolContract, ProtectionCallbackContract},
};

pub(crate) const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");
pub(crate) const OTHER_ACCOUNT: Address = address!("2222222222222222222222222222222222222222");

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WalletRequest {
    RequestAccounts,
    SwitchChain(u64),
    AddChain(AddChainParameters),
    Read {
        chain_id: u64,
        to: Address,
        calldata: Bytes,
    },
    Write {
        chain_id: u64,
        to: Address,
        calldata: Bytes,
    },
    Deploy {
        chain_id: u64,
        code: Bytes,
        value: U256,
    },
}

struct SimulatedState {
    chain_id: u64,
    accounts: Vec<Address>,
    known_chains: HashSet<u64>,
    honor_switches: bool,
    register_added_chains: bool,
    switch_error: Option<WalletError>,
    deploy_error: Option<WalletError>,
    receipt_delay: Duration,
    health_factor: U256,
    allowance: U256,
    collateral_needed: U256,
    token_symbol: String,
    token_decimals: u8,
    deployments: u8,
    requests: Vec<WalletRequest>,
}

#[derive(Clone)]
pub(crate) struct SimulatedWallet {
    state: Arc<Mutex<SimulatedState>>,
    events: broadcast::Sender<WalletEvent>,
}

impl SimulatedWallet {
    /// Wallet knowing both networks, currently on `chain_id`, accepting every
    /// request.
    pub fn on_chain(chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                chain_id,
                accounts: vec![ACCOUNT],
                known_chains: HashSet::from([SEPOLIA_CHAIN_ID, KOPLI_CHAIN_ID]),
                honor_switches: true,
                register_added_chains: true,
                switch_error: None,
                deploy_error: None,
                receipt_delay: Duration::ZERO,
                health_factor: U256::from(1_500_000_000_000_000_000u64),
                allowance: U256::ZERO,
                collateral_needed: U256::ZERO,
                token_symbol: "WETH".to_string(),
                token_decimals: 18,
                deployments: 0,
                requests: vec![],
            })),
            events,
        }
    }

    pub fn without_chain(self, chain_id: u64) -> Self {
        self.lock().known_chains.remove(&chain_id);
        self
    }

    /// Switch requests succeed but the wallet stays where it was.
    pub fn ignoring_switches(self) -> Self {
        self.lock().honor_switches = false;
        self
    }

    /// Add-chain requests succeed but the chain stays unknown.
    pub fn ignoring_added_chains(self) -> Self {
        self.lock().register_added_chains = false;
        self
    }

    pub fn rejecting_switches(self, error: WalletError) -> Self {
        self.lock().switch_error = Some(error);
        self
    }

    pub fn failing_deployments(self, error: WalletError) -> Self {
        self.lock().deploy_error = Some(error);
        self
    }

    /// Writes and deployments wait this long for their receipt once sent.
    pub fn with_receipt_delay(self, delay: Duration) -> Self {
        self.lock().receipt_delay = delay;
        self
    }

    pub fn with_health_factor(self, health_factor: U256) -> Self {
        self.lock().health_factor = health_factor;
        self
    }

    pub fn with_token(self, symbol: &str, decimals: u8) -> Self {
        {
            let mut state = self.lock();
            state.token_symbol = symbol.to_string();
            state.token_decimals = decimals;
        }
        self
    }

    pub fn with_allowance(self, allowance: U256) -> Self {
        self.lock().allowance = allowance;
        self
    }

    pub fn with_collateral_needed(self, collateral_needed: U256) -> Self {
        self.lock().collateral_needed = collateral_needed;
        self
    }

    /// The user switching networks from the wallet itself.
    pub fn change_chain(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
        let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
    }

    pub fn change_accounts(&self, accounts: Vec<Address>) {
        self.lock().accounts = accounts.clone();
        let _ = self.events.send(WalletEvent::AccountsChanged(accounts));
    }

    pub fn current_chain(&self) -> u64 {
        self.lock().chain_id
    }

    pub fn requests(&self) -> Vec<WalletRequest> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    pub fn switch_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|request| matches!(request, WalletRequest::SwitchChain(_)))
            .count()
    }

    pub fn add_requests(&self) -> Vec<AddChainParameters> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                WalletRequest::AddChain(parameters) => Some(parameters),
                _ => None,
            })
            .collect()
    }

    pub fn deploy_requests(&self) -> Vec<(u64, Bytes, U256)> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                WalletRequest::Deploy {
                    chain_id,
                    code,
                    value,
                } => Some((chain_id, code, value)),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<(u64, Address, Bytes)> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                WalletRequest::Read {
                    chain_id,
                    to,
                    calldata,
                } => Some((chain_id, to, calldata)),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(u64, Address, Bytes)> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                WalletRequest::Write {
                    chain_id,
                    to,
                    calldata,
                } => Some((chain_id, to, calldata)),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Wallet for SimulatedWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let mut state = self.lock();
        state.requests.push(WalletRequest::RequestAccounts);
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.lock().chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let mut state = self.lock();
        state.requests.push(WalletRequest::SwitchChain(chain_id));

        if let Some(error) = state.switch_error.clone() {
            return Err(error);
        }
        if !state.known_chains.contains(&chain_id) {
            return Err(WalletError::Rpc {
                code: UNRECOGNIZED_CHAIN_CODE,
                message: format!("Unrecognized chain ID \"0x{:x}\"", chain_id),
            });
        }
        if state.honor_switches {
            state.chain_id = chain_id;
        }
        Ok(())
    }

    async fn add_chain(&self, parameters: &AddChainParameters) -> Result<(), WalletError> {
        let mut state = self.lock();
        state
            .requests
            .push(WalletRequest::AddChain(parameters.clone()));
        if state.register_added_chains {
            state.known_chains.insert(parameters.chain_id);
        }
        Ok(())
    }

    async fn client(&self) -> Result<Arc<dyn ChainClient>, WalletError> {
        let signer = *self.lock().accounts.first().ok_or(WalletError::NoAccounts)?;
        Ok(Arc::new(SimulatedClient {
            wallet: self.clone(),
            signer,
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// Chain client that follows whatever chain the simulated wallet is on.
struct SimulatedClient {
    wallet: SimulatedWallet,
    signer: Address,
}

fn reverted() -> WalletError {
    WalletError::Rpc {
        code: -32000,
        message: "execution reverted".to_string(),
    }
}

#[async_trait]
impl ChainClient for SimulatedClient {
    fn signer(&self) -> Address {
        self.signer
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.wallet.lock().chain_id)
    }

    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, WalletError> {
        let mut state = self.wallet.lock();
        let chain_id = state.chain_id;
        state.requests.push(WalletRequest::Read {
            chain_id,
            to,
            calldata: calldata.clone(),
        });

        if calldata.len() < 4 {
            return Err(reverted());
        }
        let selector: [u8; 4] = [calldata[0], calldata[1], calldata[2], calldata[3]];

        let output = if selector == LendingPoolContract::getUserAccountDataCall::SELECTOR {
            (
                U256::from(10_000u64),
                U256::from(5_000u64),
                U256::ZERO,
                U256::from(8_250u64),
                U256::from(8_000u64),
                state.health_factor,
            )
                .abi_encode_params()
        } else if selector == Erc20Contract::symbolCall::SELECTOR {
            (state.token_symbol.clone(),).abi_encode_params()
        } else if selector == Erc20Contract::decimalsCall::SELECTOR {
            (U256::from(state.token_decimals),).abi_encode_params()
        } else if selector == Erc20Contract::allowanceCall::SELECTOR {
            (state.allowance,).abi_encode_params()
        } else if selector == ProtectionCallbackContract::calculateCollateralNeededCall::SELECTOR {
            (state.collateral_needed,).abi_encode_params()
        } else {
            return Err(reverted());
        };

        Ok(output.into())
    }

    async fn write(&self, to: Address, calldata: Bytes) -> Result<TxHash, WalletError> {
        let (hash, delay) = {
            let mut state = self.wallet.lock();
            let chain_id = state.chain_id;
            state.requests.push(WalletRequest::Write {
                chain_id,
                to,
                calldata,
            });
            (
                TxHash::with_last_byte(state.requests.len() as u8),
                state.receipt_delay,
            )
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(hash)
    }

    async fn deploy(&self, code: Bytes, value: U256) -> Result<Address, WalletError> {
        let (outcome, delay) = {
            let mut state = self.wallet.lock();
            let chain_id = state.chain_id;
            state.requests.push(WalletRequest::Deploy {
                chain_id,
                code,
                value,
            });

            let outcome = match state.deploy_error.clone() {
                Some(error) => Err(error),
                None => {
                    state.deployments += 1;
                    Ok(Address::with_last_byte(0xC0 + state.deployments))
                }
            };
            (outcome, state.receipt_delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
