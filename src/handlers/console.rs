use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::VaultError;
use crate::models::{ProtocolStats, SolvencyReport, StatusSnapshot, VaultBalances};
use crate::traits::event_handler::VaultEventHandler;
use crate::utils::helper::format_address;

/// Console logging event handler
pub struct ConsoleEventHandler {
    last_balances: Mutex<Option<VaultBalances>>,
}

impl ConsoleEventHandler {
    /// Create a new console event handler
    pub fn new() -> Self {
        Self {
            last_balances: Mutex::new(None),
        }
    }
}

impl Default for ConsoleEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VaultEventHandler for ConsoleEventHandler {
    async fn on_status_change(&self, snapshot: &StatusSnapshot) {
        match &snapshot.error {
            Some(message) => warn!("[{}] {}", snapshot.status, message),
            None => info!("[{}]", snapshot.status),
        }
    }

    async fn on_balances(&self, balances: &VaultBalances) {
        let previous = self.last_balances.lock().await.replace(balances.clone());

        let Some(old) = previous else {
            info!("{}", "=".repeat(60));
            info!("VAULT POSITION {}", format_address(&balances.account));
            info!("{}", "-".repeat(60));
            info!("  Wallet:      {} ZENITH", balances.token_balance_display());
            info!("  Staked:      {} ZENITH", balances.staked_balance_display());
            info!("  Share price: {}", balances.share_price_display());
            info!("  TVL:         {} ZENITH", balances.tvl_display());
            info!("{}", "=".repeat(60));
            return;
        };

        let changes = balances.changes_since(&old);
        if changes.is_empty() {
            return;
        }

        info!("Position changes detected:");
        for change in &changes {
            let indicator = if change.change > 0.0 { "↑" } else { "↓" };
            info!(
                "  {} {}: {:.4} → {:.4} ({:+.4}, {:.2}%)",
                indicator,
                change.field,
                change.old_amount,
                change.new_amount,
                change.change,
                change.percentage_change
            );
        }
    }

    async fn on_stats(&self, stats: &ProtocolStats) {
        info!(
            "TVL {} | supply {} | share price {}",
            stats.tvl_display(),
            stats.total_supply_display(),
            stats.share_price_display()
        );
    }

    async fn on_solvency(&self, report: &SolvencyReport) {
        if report.is_solvent {
            info!(
                "Reserves {} ZENITH, backing {}",
                report.assets_display(),
                report.ratio_percent_display()
            );
        } else {
            warn!(
                "UNDER-COLLATERALIZED: reserves {} ZENITH, backing {}",
                report.assets_display(),
                report.ratio_percent_display()
            );
        }
    }

    async fn handle_error(&self, error: &VaultError) {
        warn!("Vault poll error: {}", error);
    }
}
