use alloy::{
    primitives::TxHash,
    providers::PendingTransactionError,
    transports::{RpcError, TransportError},
};
use thiserror::Error;

/// EIP-1193 / EIP-3085 code returned by `wallet_switchEthereumChain` when the
/// wallet has never seen the requested chain.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// EIP-1193 code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no wallet provider available")]
    NotAvailable,

    #[error("{message} (code {code})")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("wallet did not expose any account")]
    NoAccounts,

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("deployment transaction {0} did not create a contract")]
    NoContractAddress(TxHash),
}

impl WalletError {
    /// Numeric wallet error code, when the wallet supplied one.
    pub fn code(&self) -> Option<i64> {
        match self {
            WalletError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN_CODE)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code() == Some(USER_REJECTED_CODE)
    }
}

impl From<TransportError> for WalletError {
    fn from(error: TransportError) -> Self {
        match &error {
            RpcError::ErrorResp(payload) => WalletError::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            _ => WalletError::Transport(error.to_string()),
        }
    }
}

impl From<PendingTransactionError> for WalletError {
    fn from(error: PendingTransactionError) -> Self {
        match error {
            PendingTransactionError::TransportError(error) => error.into(),
            other => WalletError::Transport(other.to_string()),
        }
    }
}
