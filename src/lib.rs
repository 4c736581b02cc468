//! Zenith Vault Client
//!
//! Stakes into and withdraws from the Zenith ERC-4626 vault, polls live
//! position and protocol figures, and answers questions about the deployed
//! contracts.
//!
//! Transaction flows run through [`StakeController`], which allows one flow
//! at a time and publishes its progress as [`StatusSnapshot`]s. Pollers
//! ([`BalancePoller`], [`StatsPoller`]) overwrite their last snapshot on
//! every successful read and keep it when a read fails.

// Public modules - these are the API surface
pub mod config;
pub mod contracts;
pub mod error;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod testing;
pub mod tracker;
pub mod traits;
pub mod utils;

// Re-export commonly used items for easier access
pub use config::VaultConfig;
pub use error::VaultError;
pub use handlers::{CompositeEventHandler, ConsoleEventHandler, JsonLogEventHandler};
pub use models::{
    balances::{BalanceChange, VaultBalances},
    stats::{ProtocolStats, SolvencyReport},
    status::{StatusSnapshot, TxStatus},
};
pub use providers::{GeminiAssistant, RpcVaultReader, RpcVaultSigner};
pub use tracker::{BalancePoller, StakeController, StatsPoller};
pub use traits::{ContractAssistant, VaultEventHandler, VaultReader, VaultWriter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias for library functions
pub type Result<T> = std::result::Result<T, anyhow::Error>;
