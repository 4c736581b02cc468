use alloy::primitives::{Address, U256};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::utils::helper::{format_token_amount, to_display_f64, TOKEN_DECIMALS};

/// Snapshot of one account's position in the vault, read in a single poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultBalances {
    pub account: Address,
    /// Underlying tokens held in the wallet
    pub token_balance: U256,
    /// Raw sZENITH shares held
    pub shares: U256,
    /// Shares converted to underlying assets
    pub staked_balance: U256,
    /// Assets redeemable for one whole share
    pub share_price: U256,
    /// Total assets managed by the vault
    pub tvl: U256,
    pub timestamp: DateTime<Utc>,
}

impl VaultBalances {
    /// Create a new snapshot stamped with the current time
    pub fn new(
        account: Address,
        token_balance: U256,
        shares: U256,
        staked_balance: U256,
        share_price: U256,
        tvl: U256,
    ) -> Self {
        Self {
            account,
            token_balance,
            shares,
            staked_balance,
            share_price,
            tvl,
            timestamp: Utc::now(),
        }
    }

    /// Placeholder values shown before the first successful poll.
    pub fn empty(account: Address) -> Self {
        Self::new(
            account,
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
            U256::from(10).pow(U256::from(TOKEN_DECIMALS)),
            U256::ZERO,
        )
    }

    /// Whether this snapshot is older than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(Utc::now(), max_age)
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.timestamp > max_age
    }

    pub fn token_balance_display(&self) -> String {
        format_token_amount(self.token_balance, TOKEN_DECIMALS, 2)
    }

    pub fn staked_balance_display(&self) -> String {
        format_token_amount(self.staked_balance, TOKEN_DECIMALS, 2)
    }

    pub fn share_price_display(&self) -> String {
        format_token_amount(self.share_price, TOKEN_DECIMALS, 3)
    }

    pub fn tvl_display(&self) -> String {
        format_token_amount(self.tvl, TOKEN_DECIMALS, 2)
    }

    /// Fields that moved between `self` and a newer snapshot
    pub fn changes_since(&self, older: &VaultBalances) -> Vec<BalanceChange> {
        let fields = [
            ("token_balance", older.token_balance, self.token_balance),
            ("staked_balance", older.staked_balance, self.staked_balance),
            ("share_price", older.share_price, self.share_price),
            ("tvl", older.tvl, self.tvl),
        ];

        fields
            .into_iter()
            .filter(|(_, old, new)| old != new)
            .map(|(field, old, new)| {
                BalanceChange::new(
                    field,
                    to_display_f64(old, TOKEN_DECIMALS),
                    to_display_f64(new, TOKEN_DECIMALS),
                )
            })
            .collect()
    }
}

/// Change in a single tracked quantity
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    pub field: &'static str,
    pub old_amount: f64,
    pub new_amount: f64,
    pub change: f64,
    pub percentage_change: f64,
}

impl BalanceChange {
    pub fn new(field: &'static str, old_amount: f64, new_amount: f64) -> Self {
        let change = new_amount - old_amount;
        let percentage_change = if old_amount > 0.0 {
            (change / old_amount) * 100.0
        } else {
            100.0
        };

        Self {
            field,
            old_amount,
            new_amount,
            change,
            percentage_change,
        }
    }
}
