use std::{fmt, sync::Arc};

use alloy::primitives::Address;
use serde::Serialize;
use tokio::sync::RwLock;
use wallet_bridge::ChainClient;

use super::networks::network_name;

/// Immutable snapshot of the connected wallet: account, chain, and the
/// provider/signer pair bound to that chain.
///
/// Snapshots are never edited in place. Any change produces a new snapshot
/// that replaces the previous one in [`SessionHandle`] in a single step.
#[derive(Clone)]
pub struct Session {
    pub account: Address,
    pub chain_id: u64,
    pub chain_name: String,
    pub client: Arc<dyn ChainClient>,
}

impl Session {
    pub fn new(account: Address, chain_id: u64, client: Arc<dyn ChainClient>) -> Self {
        Self {
            account,
            chain_id,
            chain_name: network_name(chain_id),
            client,
        }
    }

    pub fn with_chain(&self, chain_id: u64) -> Self {
        Self::new(self.account, chain_id, self.client.clone())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            account: self.account,
            chain_id: self.chain_id,
            chain_name: self.chain_name.clone(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .field("chain_name", &self.chain_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub account: Address,
    pub chain_id: u64,
    pub chain_name: String,
}

/// Shared slot holding the current session, if any.
#[derive(Clone, Default)]
pub struct SessionHandle {
    current: Arc<RwLock<Option<Arc<Session>>>>,
}

impl SessionHandle {
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        *self.current.write().await = Some(session.clone());
        session
    }

    pub async fn clear(&self) -> Option<Arc<Session>> {
        self.current.write().await.take()
    }

    /// Applies `update` to the current snapshot under the write lock, so a
    /// concurrent replacement cannot be lost. Returns `None` when disconnected.
    pub async fn update<F>(&self, update: F) -> Option<Arc<Session>>
    where
        F: FnOnce(&Session) -> Session,
    {
        let mut current = self.current.write().await;
        let next = Arc::new(update(current.as_ref()?));
        *current = Some(next.clone());
        Some(next)
    }
}
