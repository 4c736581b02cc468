//! In-memory vault and recording handler for exercising the controller and
//! pollers without a node.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;

use crate::config::SEPOLIA_CHAIN_ID;
use crate::error::VaultError;
use crate::models::{ProtocolStats, SolvencyReport, StatusSnapshot, TxStatus, VaultBalances};
use crate::traits::{VaultEventHandler, VaultReader, VaultWriter};

/// Transaction kinds the mock can record or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    Approve,
    Deposit,
    Redeem,
    SimulateYield,
}

/// A transaction submitted to the mock, with its amount argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCall {
    pub kind: WriteKind,
    pub amount: U256,
}

/// Mutable chain state behind [`MockVault`]
#[derive(Debug, Clone)]
pub struct MockState {
    pub chain_id: u64,
    pub deployed: bool,
    pub decimals: u8,
    pub token_balance: U256,
    pub allowance: U256,
    pub shares: U256,
    pub total_assets: U256,
    pub total_supply: U256,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            deployed: true,
            decimals: 18,
            token_balance: U256::ZERO,
            allowance: U256::ZERO,
            shares: U256::ZERO,
            total_assets: U256::ZERO,
            total_supply: U256::ZERO,
        }
    }
}

/// Single-account ERC-20 + ERC-4626 pair with OpenZeppelin-style share math
pub struct MockVault {
    account: Address,
    state: Mutex<MockState>,
    writes: Mutex<Vec<WriteCall>>,
    write_failures: Mutex<HashMap<WriteKind, VaultError>>,
    read_failure: Mutex<Option<VaultError>>,
    write_delay: Option<Duration>,
}

impl MockVault {
    pub fn new(account: Address, state: MockState) -> Self {
        Self {
            account,
            state: Mutex::new(state),
            writes: Mutex::new(Vec::new()),
            write_failures: Mutex::new(HashMap::new()),
            read_failure: Mutex::new(None),
            write_delay: None,
        }
    }

    /// Make every transaction take `delay` before it is mined
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Fail every future `kind` transaction with `error`
    pub fn fail_write(&self, kind: WriteKind, error: VaultError) {
        lock(&self.write_failures).insert(kind, error);
    }

    /// Fail every read with `error`, or clear with `None`
    pub fn fail_reads(&self, error: Option<VaultError>) {
        *lock(&self.read_failure) = error;
    }

    pub fn state(&self) -> MockState {
        lock(&self.state).clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut lock(&self.state));
    }

    /// Transactions mined so far, in order
    pub fn writes(&self) -> Vec<WriteCall> {
        lock(&self.writes).clone()
    }

    fn check_read(&self) -> Result<(), VaultError> {
        match lock(&self.read_failure).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn submit(
        &self,
        kind: WriteKind,
        amount: U256,
        apply: impl FnOnce(&mut MockState) -> Result<(), VaultError>,
    ) -> Result<TxHash, VaultError> {
        let failure = lock(&self.write_failures).get(&kind).cloned();
        if let Some(error) = failure {
            return Err(error);
        }

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        apply(&mut lock(&self.state))?;

        let mut writes = lock(&self.writes);
        writes.push(WriteCall { kind, amount });
        Ok(B256::with_last_byte(writes.len() as u8))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn to_assets(state: &MockState, shares: U256) -> U256 {
    if state.total_supply.is_zero() {
        shares
    } else {
        shares * state.total_assets / state.total_supply
    }
}

fn to_shares(state: &MockState, assets: U256) -> U256 {
    if state.total_supply.is_zero() || state.total_assets.is_zero() {
        assets
    } else {
        assets * state.total_supply / state.total_assets
    }
}

fn spend_allowance(state: &mut MockState, amount: U256) -> Result<(), VaultError> {
    if state.allowance < amount {
        return Err(VaultError::Transaction {
            reason: Some("ERC20: insufficient allowance".to_string()),
        });
    }
    if state.token_balance < amount {
        return Err(VaultError::Transaction {
            reason: Some("ERC20: transfer amount exceeds balance".to_string()),
        });
    }
    if state.allowance != U256::MAX {
        state.allowance -= amount;
    }
    state.token_balance -= amount;
    Ok(())
}

#[async_trait]
impl VaultReader for MockVault {
    async fn chain_id(&self) -> Result<u64, VaultError> {
        self.check_read()?;
        Ok(self.state().chain_id)
    }

    async fn vault_deployed(&self) -> Result<bool, VaultError> {
        self.check_read()?;
        Ok(self.state().deployed)
    }

    async fn token_balance_of(&self, account: Address) -> Result<U256, VaultError> {
        self.check_read()?;
        Ok(if account == self.account { self.state().token_balance } else { U256::ZERO })
    }

    async fn token_decimals(&self) -> Result<u8, VaultError> {
        self.check_read()?;
        Ok(self.state().decimals)
    }

    async fn allowance(&self, owner: Address) -> Result<U256, VaultError> {
        self.check_read()?;
        Ok(if owner == self.account { self.state().allowance } else { U256::ZERO })
    }

    async fn share_balance_of(&self, account: Address) -> Result<U256, VaultError> {
        self.check_read()?;
        Ok(if account == self.account { self.state().shares } else { U256::ZERO })
    }

    async fn total_assets(&self) -> Result<U256, VaultError> {
        self.check_read()?;
        Ok(self.state().total_assets)
    }

    async fn total_supply(&self) -> Result<U256, VaultError> {
        self.check_read()?;
        Ok(self.state().total_supply)
    }

    async fn convert_to_assets(&self, shares: U256) -> Result<U256, VaultError> {
        self.check_read()?;
        Ok(to_assets(&self.state(), shares))
    }
}

#[async_trait]
impl VaultWriter for MockVault {
    fn account(&self) -> Address {
        self.account
    }

    async fn approve_vault(&self, amount: U256) -> Result<TxHash, VaultError> {
        self.submit(WriteKind::Approve, amount, |state| {
            state.allowance = amount;
            Ok(())
        })
        .await
    }

    async fn deposit(&self, assets: U256) -> Result<TxHash, VaultError> {
        self.submit(WriteKind::Deposit, assets, |state| {
            spend_allowance(state, assets)?;
            let minted = to_shares(state, assets);
            state.shares += minted;
            state.total_supply += minted;
            state.total_assets += assets;
            Ok(())
        })
        .await
    }

    async fn redeem(&self, shares: U256) -> Result<TxHash, VaultError> {
        self.submit(WriteKind::Redeem, shares, |state| {
            if state.shares < shares {
                return Err(VaultError::Transaction {
                    reason: Some("ERC4626: redeem more than max".to_string()),
                });
            }
            let assets = to_assets(state, shares);
            state.shares -= shares;
            state.total_supply -= shares;
            state.total_assets -= assets;
            state.token_balance += assets;
            Ok(())
        })
        .await
    }

    async fn simulate_yield(&self, amount: U256) -> Result<TxHash, VaultError> {
        self.submit(WriteKind::SimulateYield, amount, |state| {
            spend_allowance(state, amount)?;
            state.total_assets += amount;
            Ok(())
        })
        .await
    }
}

/// Handler that keeps every event it receives
#[derive(Default)]
pub struct RecordingEventHandler {
    statuses: Mutex<Vec<StatusSnapshot>>,
    balances: Mutex<Vec<VaultBalances>>,
    stats: Mutex<Vec<ProtocolStats>>,
    solvency: Mutex<Vec<SolvencyReport>>,
    errors: Mutex<Vec<VaultError>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status sequence, starting after the initial `IDLE`
    pub fn statuses(&self) -> Vec<TxStatus> {
        lock(&self.statuses).iter().map(|s| s.status).collect()
    }

    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        lock(&self.statuses).clone()
    }

    pub fn balances(&self) -> Vec<VaultBalances> {
        lock(&self.balances).clone()
    }

    pub fn stats(&self) -> Vec<ProtocolStats> {
        lock(&self.stats).clone()
    }

    pub fn solvency(&self) -> Vec<SolvencyReport> {
        lock(&self.solvency).clone()
    }

    pub fn errors(&self) -> Vec<VaultError> {
        lock(&self.errors).clone()
    }
}

#[async_trait]
impl VaultEventHandler for RecordingEventHandler {
    async fn on_status_change(&self, snapshot: &StatusSnapshot) {
        lock(&self.statuses).push(snapshot.clone());
    }

    async fn on_balances(&self, balances: &VaultBalances) {
        lock(&self.balances).push(balances.clone());
    }

    async fn on_stats(&self, stats: &ProtocolStats) {
        lock(&self.stats).push(stats.clone());
    }

    async fn on_solvency(&self, report: &SolvencyReport) {
        lock(&self.solvency).push(report.clone());
    }

    async fn handle_error(&self, error: &VaultError) {
        lock(&self.errors).push(error.clone());
    }
}

/// `n` whole tokens in 18-decimal base units
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10).pow(U256::from(18))
}
