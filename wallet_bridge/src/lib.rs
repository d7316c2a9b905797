//! Wallet-facing seams of the protection deployer.
//!
//! The [`Wallet`] trait mirrors what an injected browser wallet offers
//! (account access, chain switch, chain registration, change notifications),
//! and [`ChainClient`] is the provider/signer pair bound to whatever chain the
//! wallet currently targets. [`RpcWallet`] implements both over EIP-1193
//! JSON-RPC methods.

pub mod chain_client;
pub mod chain_registration;
pub mod error;
pub mod rpc_wallet;
pub mod wallet;

pub use chain_client::{ChainClient, RpcChainClient};
pub use chain_registration::{chain_id_hex, AddChainParameters, NativeCurrency};
pub use error::{WalletError, UNRECOGNIZED_CHAIN_CODE, USER_REJECTED_CODE};
pub use rpc_wallet::RpcWallet;
pub use wallet::{Wallet, WalletEvent};
