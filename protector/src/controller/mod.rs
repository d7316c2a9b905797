pub mod form;
pub mod tasks;

use std::{
    fmt,
    sync::{Arc, Mutex, Weak},
};

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast::error::RecvError, RwLock},
    task::JoinHandle,
};
use tracing::{info, instrument, warn};
use wallet_bridge::{Wallet, WalletError, WalletEvent};

use crate::{
    actions::{models::HealthFactorReading, ProtectionActions},
    blockchain_manager::ContractBytecode,
    config::LocalConfig,
    error::ActionError,
    network_runner::{
        networks::{explorer_address_url, kopli_registration, Network},
        session::{Session, SessionSummary},
        NetworkAwareRunner,
    },
    notifications::{Notification, Notifier},
};
use form::{DeploymentForm, FormUpdate};
use tasks::ActionTasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Connect,
    SwitchNetwork,
    AddNetwork,
    FetchHealthFactor,
    DeployCallback,
    DeployReactive,
    ApproveCollateral,
    CheckAllowance,
    CalculateProtection,
}

impl ActionKind {
    /// Prefix of the error notification raised when the action fails.
    fn failure_prefix(self) -> Option<&'static str> {
        match self {
            ActionKind::Connect => Some("Failed to connect wallet"),
            ActionKind::SwitchNetwork => None,
            ActionKind::AddNetwork => Some("Failed to add Kopli network"),
            ActionKind::FetchHealthFactor => Some("Failed to fetch health factor"),
            ActionKind::DeployCallback | ActionKind::DeployReactive => Some("Deployment failed"),
            ActionKind::ApproveCollateral => Some("Approval failed"),
            ActionKind::CheckAllowance => Some("Failed to check allowance"),
            ActionKind::CalculateProtection => Some("Calculation failed"),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Connect => "connect",
            ActionKind::SwitchNetwork => "network switch",
            ActionKind::AddNetwork => "add network",
            ActionKind::FetchHealthFactor => "health factor fetch",
            ActionKind::DeployCallback => "callback deployment",
            ActionKind::DeployReactive => "reactive deployment",
            ActionKind::ApproveCollateral => "approval",
            ActionKind::CheckAllowance => "allowance check",
            ActionKind::CalculateProtection => "protection calculation",
        };
        f.write_str(name)
    }
}

/// Addresses of the contracts deployed during this run. A redeployment
/// overwrites, nothing clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedContracts {
    pub callback: Option<Address>,
    pub reactive: Option<Address>,
}

/// Outcome of one user-triggered operation, with the notifications raised
/// while it ran.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReport {
    pub action: ActionKind,
    pub succeeded: bool,
    pub error: Option<String>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerState {
    pub wallet_available: bool,
    pub connected: bool,
    pub session: Option<SessionSummary>,
    pub form: DeploymentForm,
    pub deployed: DeployedContracts,
    pub health_factor: HealthFactorReading,
    pub loading: Vec<ActionKind>,
}

/// Owns everything the user interacts with: the session (through the
/// runner), the form, the deployed contract handles and the health factor.
///
/// Results are committed by the action's own task once it succeeded, so a
/// failed or aborted action leaves state untouched and a caller that stops
/// waiting loses nothing.
pub struct Controller {
    runner: Arc<NetworkAwareRunner>,
    notifier: Notifier,
    form: RwLock<DeploymentForm>,
    deployed: Arc<RwLock<DeployedContracts>>,
    health_factor: Arc<RwLock<HealthFactorReading>>,
    bytecode: ContractBytecode,
    deployment_value: U256,
    tasks: ActionTasks,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(
        wallet: Option<Arc<dyn Wallet>>,
        bytecode: ContractBytecode,
        local_config: &LocalConfig,
    ) -> Self {
        let notifier = Notifier::new(chrono::Duration::milliseconds(
            local_config.notification_ttl_ms as i64,
        ));
        let runner = NetworkAwareRunner::new(
            wallet,
            notifier.clone(),
            local_config.network_settle_delay(),
        );

        Self {
            runner: Arc::new(runner),
            notifier,
            form: RwLock::new(DeploymentForm::new(&local_config.default_lending_pool)),
            deployed: Arc::new(RwLock::new(DeployedContracts::default())),
            health_factor: Arc::new(RwLock::new(HealthFactorReading::default())),
            bytecode,
            deployment_value: local_config.deployment_value_wei,
            tasks: ActionTasks::default(),
            listener: Mutex::new(None),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifier.active()
    }

    pub async fn state(&self) -> ControllerState {
        let session = self.runner.session().current().await;

        ControllerState {
            wallet_available: self.runner.wallet().is_ok(),
            connected: session.is_some(),
            session: session.map(|session| session.summary()),
            form: self.form.read().await.clone(),
            deployed: self.deployed.read().await.clone(),
            health_factor: self.health_factor.read().await.clone(),
            loading: self.tasks.in_flight(),
        }
    }

    pub async fn form(&self) -> DeploymentForm {
        self.form.read().await.clone()
    }

    /// Applies a partial form update. A new lending pool re-reads the health
    /// factor when connected.
    pub async fn update_form(&self, update: FormUpdate) -> DeploymentForm {
        let (form, pool_changed) = {
            let mut form = self.form.write().await;
            let pool_changed = form.apply(update);
            (form.clone(), pool_changed)
        };

        if pool_changed {
            info!("Lending pool changed to {}", form.lending_pool);
            self.refresh_health_factor().await;
        }

        form
    }

    // --------- Session ---------

    /// Requests account access, builds the session on whatever chain the
    /// wallet is on and starts following wallet changes.
    pub async fn connect(self: &Arc<Self>) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.open_session().await;
        if result.is_ok() {
            self.refresh_health_factor().await;
        }
        self.conclude(ActionKind::Connect, checkpoint, result)
    }

    async fn open_session(self: &Arc<Self>) -> Result<(), ActionError> {
        let wallet = self.runner.wallet()?.clone();
        let events = wallet.subscribe();

        let accounts = wallet.request_accounts().await?;
        let account = *accounts.first().ok_or(WalletError::NoAccounts)?;
        let client = wallet.client().await?;
        let chain_id = client.chain_id().await?;

        let session = self
            .runner
            .session()
            .replace(Session::new(account, chain_id, client))
            .await;
        info!("Connected {} on {}", session.account, session.chain_name);

        self.start_listener(events);
        Ok(())
    }

    /// Drops the session and stops every in-flight action that has not sent
    /// its transaction yet. Deployed contract handles are kept.
    pub async fn disconnect(&self) -> ControllerState {
        let listener = self.lock_listener().take();
        if let Some(listener) = listener {
            listener.abort();
        }
        self.end_session().await;

        self.state().await
    }

    async fn end_session(&self) {
        self.tasks.abort_all();
        if self.runner.session().clear().await.is_some() {
            info!("Wallet disconnected");
        }
        *self.health_factor.write().await = HealthFactorReading::default();
    }

    fn start_listener(self: &Arc<Self>, events: tokio::sync::broadcast::Receiver<WalletEvent>) {
        let listener = tokio::spawn(watch_wallet(Arc::downgrade(self), events));
        if let Some(previous) = self.lock_listener().replace(listener) {
            previous.abort();
        }
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn handle_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::ChainChanged(chain_id) => {
                if let Some(session) = self
                    .runner
                    .session()
                    .update(|current| current.with_chain(chain_id))
                    .await
                {
                    info!("Wallet switched to {}", session.chain_name);
                }
            }

            WalletEvent::AccountsChanged(accounts) => {
                if self.runner.session().current().await.is_none() {
                    return;
                }

                let Some(account) = accounts.first().copied() else {
                    warn!("Wallet exposes no account anymore, disconnecting");
                    self.end_session().await;
                    return;
                };

                if let Err(e) = self.rebind_account(account).await {
                    self.notify_failure(ActionKind::Connect, &e);
                    return;
                }
                self.refresh_health_factor().await;
            }
        }
    }

    async fn rebind_account(&self, account: Address) -> Result<(), ActionError> {
        let client = self.runner.wallet()?.client().await?;
        let chain_id = client.chain_id().await?;

        self.runner
            .session()
            .replace(Session::new(account, chain_id, client))
            .await;
        info!("Active account changed to {}", account);

        Ok(())
    }

    async fn require_session(&self) -> Result<Arc<Session>, ActionError> {
        self.runner.wallet()?;
        self.runner
            .session()
            .current()
            .await
            .ok_or(ActionError::NotConnected)
    }

    async fn require_callback(&self) -> Result<Address, ActionError> {
        self.deployed
            .read()
            .await
            .callback
            .ok_or(ActionError::CallbackNotDeployed)
    }

    // --------- Networks ---------

    pub async fn switch_network(&self, network: Network) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.try_switch_network(network).await;
        self.conclude(ActionKind::SwitchNetwork, checkpoint, result)
    }

    async fn try_switch_network(&self, network: Network) -> Result<(), ActionError> {
        self.require_session().await?;

        let runner = self.runner.clone();
        let ticket = self.tasks.spawn(ActionKind::SwitchNetwork, move |_| async move {
            let summary = runner
                .run(&network.target(), "", |session| async move { Ok(session.summary()) })
                .await?;
            info!("Wallet is on {}", summary.chain_name);
            Ok(())
        });

        ticket.join().await
    }

    /// Registers Kopli with the wallet without switching to it.
    pub async fn add_kopli_network(&self) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.try_add_kopli_network().await;
        self.conclude(ActionKind::AddNetwork, checkpoint, result)
    }

    async fn try_add_kopli_network(&self) -> Result<(), ActionError> {
        let wallet = self.runner.wallet()?.clone();
        let notifier = self.notifier.clone();

        let ticket = self.tasks.spawn(ActionKind::AddNetwork, move |_| async move {
            wallet
                .add_chain(&kopli_registration())
                .await
                .map_err(ActionError::from)?;
            notifier.success("Kopli network added to wallet");
            Ok(())
        });

        ticket.join().await
    }

    // --------- Actions ---------

    pub async fn fetch_health_factor(&self) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.load_health_factor().await.map(|_| ());
        self.conclude(ActionKind::FetchHealthFactor, checkpoint, result)
    }

    /// Re-reads the health factor in the background of another operation.
    /// Skipped while disconnected, failures only raise a notification.
    async fn refresh_health_factor(&self) {
        if self.require_session().await.is_err() {
            return;
        }
        if let Err(e) = self.load_health_factor().await {
            self.notify_failure(ActionKind::FetchHealthFactor, &e);
        }
    }

    async fn load_health_factor(&self) -> Result<HealthFactorReading, ActionError> {
        self.require_session().await?;
        let (lending_pool, threshold) = {
            let form = self.form.read().await;
            (form.lending_pool()?, form.at_risk_threshold())
        };

        let runner = self.runner.clone();
        let stored = self.health_factor.clone();
        let ticket = self.tasks.spawn(ActionKind::FetchHealthFactor, move |_| async move {
            let health_factor = ProtectionActions::fetch_health_factor(&runner, lending_pool).await?;

            let reading = HealthFactorReading::new(health_factor, threshold);
            info!("Health factor is {} ({:?})", reading.value, reading.status);
            *stored.write().await = reading.clone();

            Ok(reading)
        });

        ticket.join().await
    }

    pub async fn deploy_callback(&self) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.try_deploy_callback().await;
        if result.is_ok() {
            self.refresh_health_factor().await;
        }
        self.conclude(ActionKind::DeployCallback, checkpoint, result)
    }

    async fn try_deploy_callback(&self) -> Result<(), ActionError> {
        self.require_session().await?;
        let deployment = self.form.read().await.callback_deployment()?;

        let runner = self.runner.clone();
        let notifier = self.notifier.clone();
        let deployed = self.deployed.clone();
        let bytecode = self.bytecode.callback.clone();
        let value = self.deployment_value;
        let ticket = self.tasks.spawn(ActionKind::DeployCallback, move |submission| async move {
            let address = ProtectionActions::deploy_callback(
                &runner,
                &bytecode,
                &deployment,
                value,
                || submission.claim(),
            )
            .await?;

            deployed.write().await.callback = Some(address);
            notifier.success(format!("Callback contract deployed at: {} on Sepolia", address));

            Ok(())
        });

        ticket.join().await
    }

    pub async fn deploy_reactive(&self) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.try_deploy_reactive().await;
        self.conclude(ActionKind::DeployReactive, checkpoint, result)
    }

    async fn try_deploy_reactive(&self) -> Result<(), ActionError> {
        self.require_session().await?;
        let callback = self.require_callback().await?;
        let deployment = self.form.read().await.reactive_deployment(callback)?;

        let runner = self.runner.clone();
        let notifier = self.notifier.clone();
        let deployed = self.deployed.clone();
        let bytecode = self.bytecode.reactive.clone();
        let value = self.deployment_value;
        let ticket = self.tasks.spawn(ActionKind::DeployReactive, move |submission| async move {
            let address = ProtectionActions::deploy_reactive(
                &runner,
                &bytecode,
                &deployment,
                value,
                || submission.claim(),
            )
            .await?;

            deployed.write().await.reactive = Some(address);
            notifier.success(format!("Reactive contract deployed at: {} on Kopli", address));
            notifier.info(format!(
                "View your reactive contract on Kopli block explorer: {}",
                explorer_address_url(&address)
            ));

            Ok(())
        });

        ticket.join().await
    }

    pub async fn approve_collateral(&self) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.try_approve_collateral().await;
        self.conclude(ActionKind::ApproveCollateral, checkpoint, result)
    }

    async fn try_approve_collateral(&self) -> Result<(), ActionError> {
        self.require_session().await?;
        let callback = self.require_callback().await?;
        let (token, amount) = {
            let form = self.form.read().await;
            (form.collateral_token()?, form.approval_amount()?)
        };

        let runner = self.runner.clone();
        let notifier = self.notifier.clone();
        let ticket = self.tasks.spawn(ActionKind::ApproveCollateral, move |submission| async move {
            let approved = ProtectionActions::approve_collateral(
                &runner,
                &notifier,
                token,
                callback,
                amount,
                || submission.claim(),
            )
            .await?;

            notifier.success(format!(
                "Successfully approved {} for the protection contract on Sepolia",
                approved.symbol
            ));

            Ok(())
        });

        ticket.join().await
    }

    pub async fn check_allowance(&self) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.try_check_allowance().await;
        self.conclude(ActionKind::CheckAllowance, checkpoint, result)
    }

    async fn try_check_allowance(&self) -> Result<(), ActionError> {
        self.require_session().await?;
        let callback = self.require_callback().await?;
        let token = self.form.read().await.collateral_token()?;

        let runner = self.runner.clone();
        let notifier = self.notifier.clone();
        let ticket = self.tasks.spawn(ActionKind::CheckAllowance, move |_| async move {
            let allowance = ProtectionActions::check_allowance(&runner, token, callback).await?;
            notifier.info(format!("Current allowance on Sepolia: {}", allowance));
            Ok(())
        });

        ticket.join().await
    }

    pub async fn calculate_protection(&self) -> ActionReport {
        let checkpoint = self.notifier.last_id();
        let result = self.try_calculate_protection().await;
        self.conclude(ActionKind::CalculateProtection, checkpoint, result)
    }

    async fn try_calculate_protection(&self) -> Result<(), ActionError> {
        self.require_session().await?;
        let callback = self.require_callback().await?;
        let (lending_pool, token, target) = {
            let form = self.form.read().await;
            (
                form.lending_pool()?,
                form.collateral_token()?,
                form.target_health_factor()?,
            )
        };

        let runner = self.runner.clone();
        let notifier = self.notifier.clone();
        let ticket = self.tasks.spawn(ActionKind::CalculateProtection, move |_| async move {
            let needed = ProtectionActions::calculate_protection(
                &runner,
                callback,
                lending_pool,
                token,
                target,
            )
            .await?;

            if needed.raw > U256::ZERO {
                notifier.info(format!("Protection needed: {}", needed));
            } else {
                notifier.info("No protection needed at this time (health factor above target)");
            }

            Ok(())
        });

        ticket.join().await
    }

    // --------- Reporting ---------

    fn conclude(
        &self,
        action: ActionKind,
        checkpoint: u64,
        result: Result<(), ActionError>,
    ) -> ActionReport {
        let error = match result {
            Ok(()) => None,
            Err(e) => {
                self.notify_failure(action, &e);
                Some(e.to_string())
            }
        };

        ActionReport {
            action,
            succeeded: error.is_none(),
            error,
            notifications: self.notifier.since(checkpoint),
        }
    }

    fn notify_failure(&self, action: ActionKind, error: &ActionError) {
        match (error, action.failure_prefix()) {
            (ActionError::Cancelled, _) => self
                .notifier
                .info(format!("Earlier {} request was cancelled", action)),
            (e, _) if e.is_rejected_locally() => self.notifier.error(e.to_string()),
            (e, Some(prefix)) => self.notifier.error(format!("{}: {}", prefix, e)),
            (e, None) => self.notifier.error(e.to_string()),
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.tasks.abort_all();
        if let Some(listener) = self.lock_listener().take() {
            listener.abort();
        }
    }
}

/// Follows wallet chain and account changes for as long as the controller
/// lives.
#[instrument("WALLET_LISTENER", skip_all)]
async fn watch_wallet(
    controller: Weak<Controller>,
    mut events: tokio::sync::broadcast::Receiver<WalletEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Missed {} wallet events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let Some(active) = controller.upgrade() else {
            break;
        };
        active.handle_wallet_event(event).await;
    }

    info!("Wallet listener stopped");
}
