use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::VaultError;
use crate::models::{ProtocolStats, SolvencyReport};
use crate::traits::{VaultEventHandler, VaultReader};
use crate::utils::helper::TOKEN_DECIMALS;

/// Display-only pollers for vault-wide figures. Needs no account.
pub struct StatsPoller {
    reader: Arc<dyn VaultReader>,
    event_handler: Arc<dyn VaultEventHandler>,
    latest_stats: Mutex<Option<ProtocolStats>>,
    latest_solvency: Mutex<Option<SolvencyReport>>,
}

impl StatsPoller {
    pub fn new(reader: Arc<dyn VaultReader>, event_handler: Arc<dyn VaultEventHandler>) -> Self {
        Self {
            reader,
            event_handler,
            latest_stats: Mutex::new(None),
            latest_solvency: Mutex::new(None),
        }
    }

    pub async fn latest_stats(&self) -> Option<ProtocolStats> {
        self.latest_stats.lock().await.clone()
    }

    pub async fn latest_solvency(&self) -> Option<SolvencyReport> {
        self.latest_solvency.lock().await.clone()
    }

    async fn ensure_deployed(&self) -> Result<(), VaultError> {
        if self.reader.vault_deployed().await? {
            Ok(())
        } else {
            Err(VaultError::ContractNotFound)
        }
    }

    /// Read TVL, total supply and the price of one share
    pub async fn fetch_stats(&self) -> Result<ProtocolStats, VaultError> {
        self.ensure_deployed().await?;

        let one_share = U256::from(10).pow(U256::from(TOKEN_DECIMALS));
        let (total_assets, total_supply, share_price) = tokio::try_join!(
            self.reader.total_assets(),
            self.reader.total_supply(),
            self.reader.convert_to_assets(one_share),
        )?;

        Ok(ProtocolStats::new(total_assets, total_supply, share_price))
    }

    /// Read totals and derive the backing ratio
    pub async fn check_solvency(&self) -> Result<SolvencyReport, VaultError> {
        self.ensure_deployed().await?;

        let (total_assets, total_supply) =
            tokio::try_join!(self.reader.total_assets(), self.reader.total_supply())?;

        Ok(SolvencyReport::from_totals(total_assets, total_supply))
    }

    pub async fn poll_stats(&self) -> Result<ProtocolStats, VaultError> {
        match self.fetch_stats().await {
            Ok(stats) => {
                *self.latest_stats.lock().await = Some(stats.clone());
                self.event_handler.on_stats(&stats).await;
                Ok(stats)
            }
            Err(e) => {
                warn!("Protocol stats skipped: {}", e);
                self.event_handler.handle_error(&e).await;
                Err(e)
            }
        }
    }

    pub async fn poll_solvency(&self) -> Result<SolvencyReport, VaultError> {
        match self.check_solvency().await {
            Ok(report) => {
                *self.latest_solvency.lock().await = Some(report.clone());
                self.event_handler.on_solvency(&report).await;
                Ok(report)
            }
            Err(e) => {
                warn!("Solvency check skipped: {}", e);
                self.event_handler.handle_error(&e).await;
                Err(e)
            }
        }
    }

    pub async fn start_stats_polling(&self, interval: Duration) {
        info!("Polling protocol stats every {}ms", interval.as_millis());
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let _ = self.poll_stats().await;
        }
    }

    pub async fn start_solvency_polling(&self, interval: Duration) {
        info!("Polling solvency every {}ms", interval.as_millis());
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let _ = self.poll_solvency().await;
        }
    }
}
