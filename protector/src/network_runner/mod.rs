pub mod networks;
pub mod session;
pub mod state;

use std::{future::Future, sync::Arc, time::Duration};

use tracing::{debug, info, instrument, warn};
use wallet_bridge::{Wallet, WalletError};

use crate::{
    error::{AbortReason, ActionError},
    notifications::Notifier,
};
use networks::TargetNetwork;
use session::{Session, SessionHandle};
use state::{transition, RunnerEvent, RunnerState};

/// Runs wallet actions against the chain they require.
///
/// The runner owns the session slot: it is the only place that swaps in a
/// fresh provider/signer pair after a chain switch.
pub struct NetworkAwareRunner {
    wallet: Option<Arc<dyn Wallet>>,
    session: SessionHandle,
    notifier: Notifier,
    settle_delay: Duration,
}

impl NetworkAwareRunner {
    pub fn new(
        wallet: Option<Arc<dyn Wallet>>,
        notifier: Notifier,
        settle_delay: Duration,
    ) -> Self {
        Self {
            wallet,
            session: SessionHandle::default(),
            notifier,
            settle_delay,
        }
    }

    pub fn wallet(&self) -> Result<&Arc<dyn Wallet>, ActionError> {
        self.wallet.as_ref().ok_or(ActionError::WalletUnavailable)
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Makes sure the wallet is on `target`, then runs `action` with the
    /// session bound to it.
    ///
    /// `purpose` completes the "Switching to X network ..." notification shown
    /// when a switch is needed; pass an empty string to skip it.
    pub async fn run<T, F, Fut>(
        &self,
        target: &TargetNetwork,
        purpose: &str,
        action: F,
    ) -> Result<T, ActionError>
    where
        F: FnOnce(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, ActionError>>,
    {
        let session = self.ensure_network(target, purpose).await?;

        let result = action(session).await;

        let state = transition(&RunnerState::Execute, RunnerEvent::Finished, target);
        debug_assert!(state.is_terminal());
        debug!("Runner reached {} on {}", state, target.name);

        result
    }

    /// Drives the runner state machine up to `Execute` (returning the session
    /// to act with) or `Aborted`.
    #[instrument("NETWORK_RUNNER", skip_all, fields(target = target.name))]
    pub async fn ensure_network(
        &self,
        target: &TargetNetwork,
        purpose: &str,
    ) -> Result<Arc<Session>, ActionError> {
        let wallet = self.wallet()?.clone();
        let mut session = self
            .session
            .current()
            .await
            .ok_or(ActionError::NotConnected)?;

        let mut state = RunnerState::Idle;
        let mut event = RunnerEvent::Start;

        loop {
            let next = transition(&state, event, target);
            debug!("Runner {} -> {}", state, next);
            state = next;

            event = match &state {
                RunnerState::ChainCheck => match wallet.chain_id().await {
                    Ok(chain_id) => RunnerEvent::ChainReported(chain_id),
                    Err(e) => RunnerEvent::ChainCheckFailed(e.to_string()),
                },

                RunnerState::Proceed => {
                    // Snapshot may lag behind a chain change the listener has not seen yet
                    if session.chain_id != target.chain_id {
                        session = self
                            .session
                            .update(|current| current.with_chain(target.chain_id))
                            .await
                            .ok_or(ActionError::NotConnected)?;
                    }
                    RunnerEvent::Continue
                }

                RunnerState::SwitchRequested => {
                    if !purpose.is_empty() {
                        self.notifier
                            .info(format!("Switching to {} network {}...", target.name, purpose));
                    }
                    Self::request_switch(&wallet, target).await
                }

                RunnerState::ChainUnrecognized => {
                    info!("Wallet does not know {} yet, registering it", target.name);
                    RunnerEvent::Continue
                }

                RunnerState::AddRequested => match target.registration.as_ref() {
                    Some(registration) => match wallet.add_chain(registration).await {
                        Ok(()) => {
                            self.notifier
                                .success(format!("{} network added to wallet", target.name));
                            RunnerEvent::ChainAdded
                        }
                        Err(e) => RunnerEvent::AddRejected(e.to_string()),
                    },
                    None => RunnerEvent::AddRejected(format!(
                        "no registration metadata for {}",
                        target.name
                    )),
                },

                RunnerState::SwitchRetry => Self::request_switch(&wallet, target).await,

                RunnerState::SwitchFailed(message) => {
                    warn!("Switch to {} failed: {}", target.name, message);
                    RunnerEvent::Continue
                }

                RunnerState::ProviderRefresh => {
                    // Wallets publish the new chain asynchronously
                    tokio::time::sleep(self.settle_delay).await;

                    match self.refresh_session(&wallet).await {
                        Ok(refreshed) => {
                            session = refreshed;
                            RunnerEvent::SessionRefreshed
                        }
                        Err(e) => RunnerEvent::RefreshFailed(e.to_string()),
                    }
                }

                RunnerState::Verify => {
                    if session.chain_id == target.chain_id {
                        self.notifier
                            .success(format!("Switched to {} network", target.name));
                    }
                    RunnerEvent::ChainReported(session.chain_id)
                }

                RunnerState::Execute => return Ok(session),

                RunnerState::Aborted(reason) => {
                    warn!("Runner aborted: {}", reason);
                    return Err(reason.clone().into());
                }

                RunnerState::Idle | RunnerState::Done => {
                    return Err(AbortReason::UnexpectedEvent {
                        state: state.to_string(),
                        event: "none".to_string(),
                    }
                    .into())
                }
            };
        }
    }

    async fn request_switch(wallet: &Arc<dyn Wallet>, target: &TargetNetwork) -> RunnerEvent {
        info!("Requesting switch to {} ({})", target.name, target.chain_id);
        match wallet.switch_chain(target.chain_id).await {
            Ok(()) => RunnerEvent::SwitchAccepted,
            Err(e) => {
                if e.is_user_rejection() {
                    info!("Switch to {} rejected by the user", target.name);
                } else if e.is_unrecognized_chain() {
                    info!("{} is not registered in the wallet", target.name);
                }
                RunnerEvent::SwitchRejected {
                    code: e.code(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Re-derives the provider/signer pair from the wallet and replaces the
    /// session with a snapshot of what the wallet reports now.
    async fn refresh_session(&self, wallet: &Arc<dyn Wallet>) -> Result<Arc<Session>, WalletError> {
        let client = wallet.client().await?;
        let chain_id = client.chain_id().await?;
        let account = client.signer();

        let session = self
            .session
            .replace(Session::new(account, chain_id, client))
            .await;
        info!("Session refreshed on {} ({})", session.chain_name, chain_id);

        Ok(session)
    }
}
