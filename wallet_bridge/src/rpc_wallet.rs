use std::{sync::Arc, time::Duration};

use alloy::{
    primitives::{Address, U64},
    providers::ProviderBuilder,
    rpc::client::RpcClient,
    transports::{http::reqwest::Url, layers::RetryBackoffLayer},
};
use async_trait::async_trait;
use serde_json::json;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    chain_id_hex, AddChainParameters, ChainClient, RpcChainClient, Wallet, WalletError,
    WalletEvent,
};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Wallet reached over JSON-RPC at an endpoint that understands the EIP-1193
/// wallet methods (a desktop wallet's local RPC, for instance).
///
/// HTTP offers no push channel, so chain and account changes are detected by
/// polling and re-published on a broadcast channel.
pub struct RpcWallet {
    client: RpcClient,
    events: broadcast::Sender<WalletEvent>,
    watcher: JoinHandle<()>,
}

impl RpcWallet {
    /// Creates the wallet client and starts the change watcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(url: &str, poll_interval: Duration) -> Result<Self, WalletError> {
        let url = Url::parse(url).map_err(|e| WalletError::Transport(e.to_string()))?;

        // Instantiate the RetryBackoffLayer with the configuration
        let retry_layer = RetryBackoffLayer::new(10, 1000, 10000);

        let client = RpcClient::builder().layer(retry_layer).http(url);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let watcher = tokio::spawn(Self::watch_changes(
            client.clone(),
            events.clone(),
            poll_interval,
        ));

        Ok(Self {
            client,
            events,
            watcher,
        })
    }

    async fn accounts(client: &RpcClient) -> Result<Vec<Address>, WalletError> {
        Ok(client.request_noparams("eth_accounts").await?)
    }

    async fn current_chain_id(client: &RpcClient) -> Result<u64, WalletError> {
        let chain_id: U64 = client.request_noparams("eth_chainId").await?;
        Ok(chain_id.to::<u64>())
    }

    async fn watch_changes(
        client: RpcClient,
        events: broadcast::Sender<WalletEvent>,
        poll_interval: Duration,
    ) {
        let mut last_chain_id: Option<u64> = None;
        let mut last_accounts: Option<Vec<Address>> = None;

        loop {
            match Self::current_chain_id(&client).await {
                Ok(chain_id) => {
                    if last_chain_id.is_some_and(|last| last != chain_id) {
                        info!("Wallet chain changed to {}", chain_id);
                        let _ = events.send(WalletEvent::ChainChanged(chain_id));
                    }
                    last_chain_id = Some(chain_id);
                }
                Err(e) => warn!("Failed to poll wallet chain id: {}", e),
            }

            match Self::accounts(&client).await {
                Ok(accounts) => {
                    if last_accounts.as_ref().is_some_and(|last| *last != accounts) {
                        info!("Wallet accounts changed: {:?}", accounts);
                        let _ = events.send(WalletEvent::AccountsChanged(accounts.clone()));
                    }
                    last_accounts = Some(accounts);
                }
                Err(e) => warn!("Failed to poll wallet accounts: {}", e),
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl Drop for RpcWallet {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

#[async_trait]
impl Wallet for RpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.client.request_noparams("eth_requestAccounts").await?)
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Self::current_chain_id(&self.client).await
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let _: serde_json::Value = self
            .client
            .request(
                "wallet_switchEthereumChain",
                (json!({ "chainId": chain_id_hex(chain_id) }),),
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, parameters: &AddChainParameters) -> Result<(), WalletError> {
        let _: serde_json::Value = self
            .client
            .request("wallet_addEthereumChain", (parameters.clone(),))
            .await?;
        Ok(())
    }

    async fn client(&self) -> Result<Arc<dyn ChainClient>, WalletError> {
        let signer = Self::accounts(&self.client)
            .await?
            .into_iter()
            .next()
            .ok_or(WalletError::NoAccounts)?;

        let provider = ProviderBuilder::new().on_client(self.client.clone());

        Ok(Arc::new(RpcChainClient::new(provider, signer)))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
