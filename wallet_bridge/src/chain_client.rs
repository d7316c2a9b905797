use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use tracing::info;

use crate::WalletError;

/// Provider/signer pair bound to one chain.
///
/// Reads go through `eth_call`, writes and deployments through
/// `eth_sendTransaction` so that the wallet does the signing, and both wait for
/// the receipt before returning.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account transactions are sent from.
    fn signer(&self) -> Address;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, WalletError>;

    async fn write(&self, to: Address, calldata: Bytes) -> Result<TxHash, WalletError>;

    /// Sends a contract creation transaction and returns the new address.
    async fn deploy(&self, code: Bytes, value: U256) -> Result<Address, WalletError>;
}

pub struct RpcChainClient<P: Provider<Ethereum>> {
    provider: P,
    signer: Address,
}

impl<P: Provider<Ethereum>> RpcChainClient<P> {
    pub fn new(provider: P, signer: Address) -> Self {
        Self { provider, signer }
    }
}

#[async_trait]
impl<P: Provider<Ethereum> + 'static> ChainClient for RpcChainClient<P> {
    fn signer(&self) -> Address {
        self.signer
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, WalletError> {
        let tx = TransactionRequest::default()
            .from(self.signer)
            .to(to)
            .input(calldata.into());

        Ok(self.provider.call(&tx).await?)
    }

    async fn write(&self, to: Address, calldata: Bytes) -> Result<TxHash, WalletError> {
        let tx = TransactionRequest::default()
            .from(self.signer)
            .to(to)
            .input(calldata.into());

        let pending = self.provider.send_transaction(tx).await?;
        info!("Sent transaction {} to {}", pending.tx_hash(), to);

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(WalletError::Reverted(receipt.transaction_hash));
        }

        Ok(receipt.transaction_hash)
    }

    async fn deploy(&self, code: Bytes, value: U256) -> Result<Address, WalletError> {
        let tx = TransactionRequest::default()
            .from(self.signer)
            .value(value)
            .with_deploy_code(code);

        let pending = self.provider.send_transaction(tx).await?;
        info!("Sent deployment transaction {}", pending.tx_hash());

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(WalletError::Reverted(receipt.transaction_hash));
        }

        receipt
            .contract_address
            .ok_or(WalletError::NoContractAddress(receipt.transaction_hash))
    }
}
