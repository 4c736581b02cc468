use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::error::VaultError;

/// Read-only access to the token/vault pair
#[async_trait]
pub trait VaultReader: Send + Sync {
    /// Chain id of the connected network
    async fn chain_id(&self) -> Result<u64, VaultError>;

    /// Whether the vault address has deployed code on this network
    async fn vault_deployed(&self) -> Result<bool, VaultError>;

    /// Underlying token balance of `account`
    async fn token_balance_of(&self, account: Address) -> Result<U256, VaultError>;

    /// Decimals of the underlying token
    async fn token_decimals(&self) -> Result<u8, VaultError>;

    /// Amount `owner` has authorized the vault to pull
    async fn allowance(&self, owner: Address) -> Result<U256, VaultError>;

    /// Vault shares held by `account`
    async fn share_balance_of(&self, account: Address) -> Result<U256, VaultError>;

    async fn total_assets(&self) -> Result<U256, VaultError>;

    async fn total_supply(&self) -> Result<U256, VaultError>;

    async fn convert_to_assets(&self, shares: U256) -> Result<U256, VaultError>;
}

/// Transactions sent from the connected account.
///
/// Every method waits for the transaction to be mined and fails if the
/// receipt reports a revert.
#[async_trait]
pub trait VaultWriter: VaultReader {
    /// Account that signs and receives
    fn account(&self) -> Address;

    /// Authorize the vault to pull `amount` of the underlying token
    async fn approve_vault(&self, amount: U256) -> Result<TxHash, VaultError>;

    /// Deposit `assets`, minting shares to the connected account
    async fn deposit(&self, assets: U256) -> Result<TxHash, VaultError>;

    /// Redeem `shares` owned by and paid to the connected account
    async fn redeem(&self, shares: U256) -> Result<TxHash, VaultError>;

    /// Owner-only: move `amount` into the vault without minting shares
    async fn simulate_yield(&self, amount: U256) -> Result<TxHash, VaultError>;
}
