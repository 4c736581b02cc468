use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{TxHash, U256};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::error::{ensure_positive, VaultError};
use crate::models::{StatusSnapshot, TxStatus};
use crate::traits::{VaultEventHandler, VaultWriter};
use crate::tracker::balance_poller::BalancePoller;
use crate::utils::helper::{parse_token_amount, TOKEN_DECIMALS};

/// How long `SUCCESS` and `ERROR` stay visible before reverting to `IDLE`
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(3);

/// Whole tokens injected by the admin yield simulation
pub const YIELD_SIMULATION_TOKENS: u64 = 1000;

/// Amount the yield simulation injects, in base units
pub fn yield_simulation_amount() -> U256 {
    U256::from(YIELD_SIMULATION_TOKENS) * U256::from(10).pow(U256::from(TOKEN_DECIMALS))
}

/// Runs stake, withdraw and yield-simulation flows one at a time and
/// publishes their progress as [`StatusSnapshot`]s.
///
/// At most one flow is in flight: a second request made while a flow runs,
/// or while the status still forbids it, fails with [`VaultError::Busy`]
/// without touching the status.
pub struct StakeController {
    writer: Arc<dyn VaultWriter>,
    event_handler: Arc<dyn VaultEventHandler>,
    status_tx: Arc<watch::Sender<StatusSnapshot>>,
    in_flight: Arc<Mutex<()>>,
    reset_delay: Duration,
    expected_chain_id: Option<u64>,
    balance_poller: Option<Arc<BalancePoller>>,
}

impl StakeController {
    pub fn new(writer: Arc<dyn VaultWriter>, event_handler: Arc<dyn VaultEventHandler>) -> Self {
        let (status_tx, _) = watch::channel(StatusSnapshot::idle());

        Self {
            writer,
            event_handler,
            status_tx: Arc::new(status_tx),
            in_flight: Arc::new(Mutex::new(())),
            reset_delay: DEFAULT_RESET_DELAY,
            expected_chain_id: None,
            balance_poller: None,
        }
    }

    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    /// Refuse to stake while connected to any other chain
    pub fn with_expected_chain(mut self, chain_id: u64) -> Self {
        self.expected_chain_id = Some(chain_id);
        self
    }

    /// Refresh this poller after every successful flow
    pub fn with_balance_poller(mut self, poller: Arc<BalancePoller>) -> Self {
        self.balance_poller = Some(poller);
        self
    }

    /// Current status snapshot
    pub fn status(&self) -> StatusSnapshot {
        self.status_tx.borrow().clone()
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_tx.subscribe()
    }

    /// Stake a user-entered decimal amount, scaled by the token's own decimals
    pub async fn stake_amount(&self, amount: &str) -> Result<TxHash, VaultError> {
        let decimals = self.writer.token_decimals().await?;
        let amount = parse_token_amount(amount, decimals)?;
        self.stake(amount).await
    }

    /// Approve the vault if needed, then deposit `amount` base units.
    pub async fn stake(&self, amount: U256) -> Result<TxHash, VaultError> {
        let amount = ensure_positive(amount)?;
        let _guard = self.begin("stake", TxStatus::accepts_stake)?;

        let result = self.run_stake(amount).await;
        self.finish(result, "Transaction failed").await
    }

    /// Redeem every share the account holds.
    pub async fn withdraw(&self) -> Result<TxHash, VaultError> {
        let _guard = self.begin("withdraw", TxStatus::accepts_withdraw)?;

        self.transition(TxStatus::Withdrawing, None).await;
        let result = self.run_withdraw().await;
        self.finish(result, "Withdrawal failed").await
    }

    /// Owner-only: inject a fixed amount of assets without minting shares.
    pub async fn simulate_yield(&self) -> Result<TxHash, VaultError> {
        let _guard = self.begin("simulate yield", TxStatus::accepts_stake)?;

        self.transition(TxStatus::Simulating, None).await;
        let result = self.run_simulate_yield().await;
        self.finish(result, "Yield simulation failed").await
    }

    async fn run_stake(&self, amount: U256) -> Result<TxHash, VaultError> {
        self.transition(TxStatus::Checking, None).await;
        self.check_network().await?;

        self.transition(TxStatus::Approving, None).await;
        self.ensure_allowance(amount).await?;

        self.transition(TxStatus::Staking, None).await;
        self.writer.deposit(amount).await
    }

    async fn run_withdraw(&self) -> Result<TxHash, VaultError> {
        let shares = self.writer.share_balance_of(self.writer.account()).await?;
        if shares.is_zero() {
            return Err(VaultError::NoStake);
        }

        info!("Redeeming {} shares", shares);
        self.writer.redeem(shares).await
    }

    async fn run_simulate_yield(&self) -> Result<TxHash, VaultError> {
        let amount = yield_simulation_amount();
        self.ensure_allowance(amount).await?;
        self.writer.simulate_yield(amount).await
    }

    async fn check_network(&self) -> Result<(), VaultError> {
        if let Some(expected) = self.expected_chain_id {
            let actual = self.writer.chain_id().await?;
            if actual != expected {
                return Err(VaultError::WrongNetwork { expected, actual });
            }
        }
        Ok(())
    }

    /// Approve an unbounded allowance unless the current one covers `amount`.
    async fn ensure_allowance(&self, amount: U256) -> Result<(), VaultError> {
        let allowance = self.writer.allowance(self.writer.account()).await?;

        if allowance >= amount {
            debug!("Allowance {} covers {}, skipping approval", allowance, amount);
            return Ok(());
        }

        info!("Allowance {} below {}, approving vault", allowance, amount);
        let tx = self.writer.approve_vault(U256::MAX).await?;
        debug!("Approval mined: {}", tx);
        Ok(())
    }

    /// Take the in-flight guard if the current status allows `operation`.
    fn begin(
        &self,
        operation: &str,
        accepts: fn(&TxStatus) -> bool,
    ) -> Result<OwnedMutexGuard<()>, VaultError> {
        let guard = self.in_flight.clone().try_lock_owned().map_err(|_| {
            warn!("Refusing {}: another flow is in flight", operation);
            VaultError::Busy
        })?;

        let current = self.status_tx.borrow().status;
        if !accepts(&current) {
            warn!("Refusing {} while status is {}", operation, current);
            return Err(VaultError::Busy);
        }

        Ok(guard)
    }

    async fn finish(
        &self,
        result: Result<TxHash, VaultError>,
        fallback: &str,
    ) -> Result<TxHash, VaultError> {
        match &result {
            Ok(tx) => {
                info!("Transaction {} confirmed", tx);
                let snapshot = self.transition(TxStatus::Success, None).await;
                self.schedule_reset(snapshot.epoch);
                self.refresh_balances().await;
            }
            Err(e) => {
                error!("Flow failed: {}", e);
                let snapshot = self
                    .transition(TxStatus::Error, Some(e.user_message(fallback)))
                    .await;
                self.schedule_reset(snapshot.epoch);
            }
        }
        result
    }

    async fn transition(&self, status: TxStatus, error: Option<String>) -> StatusSnapshot {
        self.status_tx
            .send_modify(|current| *current = current.advance(status, error));
        let snapshot = self.status_tx.borrow().clone();

        match &snapshot.error {
            Some(message) => info!("Status -> {} ({})", snapshot.status, message),
            None => info!("Status -> {}", snapshot.status),
        }

        self.event_handler.on_status_change(&snapshot).await;
        snapshot
    }

    /// Revert to `IDLE` after the delay unless another transition happened first.
    fn schedule_reset(&self, epoch: u64) {
        let status_tx = self.status_tx.clone();
        let event_handler = self.event_handler.clone();
        let delay = self.reset_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let reset = status_tx.send_if_modified(|current| {
                if current.epoch != epoch {
                    return false;
                }
                *current = current.advance(TxStatus::Idle, None);
                true
            });

            if reset {
                let snapshot = status_tx.borrow().clone();
                debug!("Status -> {} after {}ms", snapshot.status, delay.as_millis());
                event_handler.on_status_change(&snapshot).await;
            }
        });
    }

    async fn refresh_balances(&self) {
        if let Some(poller) = &self.balance_poller {
            if let Err(e) = poller.poll_once().await {
                debug!("Post-transaction refresh failed: {}", e);
            }
        }
    }
}
