use thiserror::Error;
use wallet_bridge::WalletError;

/// Why the network runner gave up before the wrapped action could run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbortReason {
    #[error("Failed to read the wallet network: {0}")]
    ChainCheckFailed(String),

    #[error("Failed to switch to {network} network: {message}")]
    SwitchFailed { network: String, message: String },

    #[error("Failed to refresh the wallet session: {0}")]
    RefreshFailed(String),

    #[error("Network switch did not complete successfully (expected chain {expected}, wallet is on {actual}). Please try again.")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Unexpected event {event} while in state {state}")]
    UnexpectedEvent { state: String, event: String },
}

/// Every way a top-level action can fail. Each one ends up as an error
/// notification; none is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Please install a wallet to use this application")]
    WalletUnavailable,

    #[error("Please connect your wallet first")]
    NotConnected,

    #[error("Please deploy the callback contract first")]
    CallbackNotDeployed,

    #[error("Invalid {field}")]
    InvalidInput { field: &'static str },

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Aborted(#[from] AbortReason),

    #[error("Unexpected contract response: {0}")]
    Decode(String),

    #[error("Action was cancelled before it completed")]
    Cancelled,

    #[error("Action task failed: {0}")]
    TaskFailed(String),
}

impl From<alloy::sol_types::Error> for ActionError {
    fn from(error: alloy::sol_types::Error) -> Self {
        ActionError::Decode(error.to_string())
    }
}

impl ActionError {
    /// Errors raised before any wallet request was made.
    pub fn is_rejected_locally(&self) -> bool {
        matches!(
            self,
            ActionError::WalletUnavailable
                | ActionError::NotConnected
                | ActionError::CallbackNotDeployed
                | ActionError::InvalidInput { .. }
        )
    }
}
