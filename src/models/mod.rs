//! Data models for vault state

pub mod balances;
pub mod stats;
pub mod status;

// Re-export for convenience
pub use balances::{BalanceChange, VaultBalances};
pub use stats::{ProtocolStats, SolvencyReport};
pub use status::{StatusSnapshot, TxStatus};
