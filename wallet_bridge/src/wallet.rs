use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{AddChainParameters, ChainClient, WalletError};

/// Change notifications pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    ChainChanged(u64),
    AccountsChanged(Vec<Address>),
}

/// The wallet injection surface: everything that needs the user's wallet
/// rather than a plain node.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Asks the wallet to expose its accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Chain the wallet is currently pointed at.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// `wallet_addEthereumChain`
    async fn add_chain(&self, parameters: &AddChainParameters) -> Result<(), WalletError>;

    /// Derives a fresh provider/signer pair bound to the wallet's current chain.
    async fn client(&self) -> Result<Arc<dyn ChainClient>, WalletError>;

    /// Subscribes to chain and account changes. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
