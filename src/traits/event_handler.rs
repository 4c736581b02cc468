use async_trait::async_trait;

use crate::error::VaultError;
use crate::models::{ProtocolStats, SolvencyReport, StatusSnapshot, VaultBalances};

/// Observer for controller transitions and poll results
#[async_trait]
pub trait VaultEventHandler: Send + Sync {
    /// Called after every status transition, including automatic resets
    async fn on_status_change(&self, snapshot: &StatusSnapshot);

    /// Called with each successful balance poll
    async fn on_balances(&self, balances: &VaultBalances);

    async fn on_stats(&self, _stats: &ProtocolStats) {}

    async fn on_solvency(&self, _report: &SolvencyReport) {}

    /// Called when a poll fails; the previous values stay in place
    async fn handle_error(&self, error: &VaultError);
}
