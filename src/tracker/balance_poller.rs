use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::VaultError;
use crate::models::VaultBalances;
use crate::traits::{VaultEventHandler, VaultReader};
use crate::utils::helper::TOKEN_DECIMALS;

/// Periodically reads one account's vault position.
///
/// Each successful poll replaces the previous snapshot wholesale; a failed
/// poll leaves it in place.
pub struct BalancePoller {
    account: Address,
    reader: Arc<dyn VaultReader>,
    event_handler: Arc<dyn VaultEventHandler>,
    expected_chain_id: Option<u64>,
    current_snapshot: Arc<Mutex<Option<VaultBalances>>>,
}

impl BalancePoller {
    pub fn new(
        account: Address,
        reader: Arc<dyn VaultReader>,
        event_handler: Arc<dyn VaultEventHandler>,
    ) -> Self {
        Self {
            account,
            reader,
            event_handler,
            expected_chain_id: None,
            current_snapshot: Arc::new(Mutex::new(None)),
        }
    }

    /// Skip polls while connected to any other chain
    pub fn with_expected_chain(mut self, chain_id: u64) -> Self {
        self.expected_chain_id = Some(chain_id);
        self
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    /// Last successful snapshot, if any
    pub async fn latest(&self) -> Option<VaultBalances> {
        self.current_snapshot.lock().await.clone()
    }

    /// Last snapshot, or the placeholder values if nothing was read yet
    pub async fn display(&self) -> VaultBalances {
        self.latest()
            .await
            .unwrap_or_else(|| VaultBalances::empty(self.account))
    }

    /// Read a fresh snapshot without storing it
    pub async fn take_snapshot(&self) -> Result<VaultBalances, VaultError> {
        if let Some(expected) = self.expected_chain_id {
            let actual = self.reader.chain_id().await?;
            if actual != expected {
                return Err(VaultError::WrongNetwork { expected, actual });
            }
        }

        let one_share = U256::from(10).pow(U256::from(TOKEN_DECIMALS));

        let (token_balance, shares, tvl, share_price) = tokio::try_join!(
            self.reader.token_balance_of(self.account),
            self.reader.share_balance_of(self.account),
            self.reader.total_assets(),
            self.reader.convert_to_assets(one_share),
        )?;

        let staked_balance = self.reader.convert_to_assets(shares).await?;

        Ok(VaultBalances::new(
            self.account,
            token_balance,
            shares,
            staked_balance,
            share_price,
            tvl,
        ))
    }

    /// Poll once, store the result and notify the handler
    pub async fn poll_once(&self) -> Result<VaultBalances, VaultError> {
        match self.take_snapshot().await {
            Ok(snapshot) => {
                let previous = self.current_snapshot.lock().await.replace(snapshot.clone());

                if let Some(old) = previous {
                    for change in snapshot.changes_since(&old) {
                        debug!(
                            "{} moved {:.6} -> {:.6}",
                            change.field, change.old_amount, change.new_amount
                        );
                    }
                }

                self.event_handler.on_balances(&snapshot).await;
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Stats error: {}", e);
                self.event_handler.handle_error(&e).await;
                Err(e)
            }
        }
    }

    /// Poll immediately and then on every interval tick. Never returns.
    pub async fn start_polling(&self, interval: Duration) {
        info!(
            "Polling balances for {} every {}ms",
            self.account,
            interval.as_millis()
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            // Errors are already logged and reported to the handler
            let _ = self.poll_once().await;
        }
    }
}
