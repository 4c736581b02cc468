use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status of the single transaction flow the controller runs at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    #[default]
    Idle,
    Checking,
    Approving,
    Staking,
    Withdrawing,
    Simulating,
    Success,
    Error,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Idle => "IDLE",
            TxStatus::Checking => "CHECKING",
            TxStatus::Approving => "APPROVING",
            TxStatus::Staking => "STAKING",
            TxStatus::Withdrawing => "WITHDRAWING",
            TxStatus::Simulating => "SIMULATING",
            TxStatus::Success => "SUCCESS",
            TxStatus::Error => "ERROR",
        }
    }

    /// Stake and simulate-yield may start from `Idle` or after an `Error`.
    pub fn accepts_stake(&self) -> bool {
        matches!(self, TxStatus::Idle | TxStatus::Error)
    }

    pub fn accepts_withdraw(&self) -> bool {
        matches!(self, TxStatus::Idle)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of the controller status published to observers.
///
/// `epoch` increases on every transition so a delayed reset can tell whether
/// the state it was scheduled for is still current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status: TxStatus,
    pub error: Option<String>,
    pub epoch: u64,
    pub updated_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn idle() -> Self {
        Self {
            status: TxStatus::Idle,
            error: None,
            epoch: 0,
            updated_at: Utc::now(),
        }
    }

    /// Next snapshot in the sequence
    pub fn advance(&self, status: TxStatus, error: Option<String>) -> Self {
        Self {
            status,
            error,
            epoch: self.epoch + 1,
            updated_at: Utc::now(),
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
