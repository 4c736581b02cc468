//! Integration tests for the stake/withdraw controller
//!
//! Run against the in-memory vault with a paused clock so the automatic
//! status reset can be observed at exact instants.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use zenith_vault::testing::{tokens, MockState, MockVault, RecordingEventHandler, WriteCall, WriteKind};
use zenith_vault::tracker::controller::yield_simulation_amount;
use zenith_vault::{BalancePoller, StakeController, TxStatus, VaultError};

const SEPOLIA: u64 = 11_155_111;

fn account() -> Address {
    Address::with_last_byte(0xaa)
}

struct Harness {
    vault: Arc<MockVault>,
    handler: Arc<RecordingEventHandler>,
    controller: StakeController,
}

fn harness_with(vault: MockVault) -> Harness {
    let vault = Arc::new(vault);
    let handler = Arc::new(RecordingEventHandler::new());
    let controller = StakeController::new(vault.clone(), handler.clone())
        .with_expected_chain(SEPOLIA);
    Harness { vault, handler, controller }
}

fn harness(state: MockState) -> Harness {
    harness_with(MockVault::new(account(), state))
}

fn funded(allowance: U256) -> MockState {
    MockState {
        token_balance: tokens(1_000_000),
        allowance,
        ..MockState::default()
    }
}

// =========================================================================
// Stake flow
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stake_with_zero_allowance_approves_unbounded_then_deposits() {
    let h = harness(funded(U256::ZERO));

    h.controller.stake(tokens(100)).await.unwrap();

    assert_eq!(
        h.handler.statuses(),
        vec![TxStatus::Checking, TxStatus::Approving, TxStatus::Staking, TxStatus::Success]
    );
    assert_eq!(
        h.vault.writes(),
        vec![
            WriteCall { kind: WriteKind::Approve, amount: U256::MAX },
            WriteCall { kind: WriteKind::Deposit, amount: tokens(100) },
        ]
    );
    assert_eq!(h.vault.state().shares, tokens(100));
    assert_eq!(h.controller.status().status, TxStatus::Success);
    assert!(h.controller.status().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stake_with_sufficient_allowance_skips_approval() {
    let h = harness(funded(tokens(100)));

    h.controller.stake(tokens(100)).await.unwrap();

    // Approving is still reported even though no approval is sent
    assert_eq!(
        h.handler.statuses(),
        vec![TxStatus::Checking, TxStatus::Approving, TxStatus::Staking, TxStatus::Success]
    );
    assert_eq!(
        h.vault.writes(),
        vec![WriteCall { kind: WriteKind::Deposit, amount: tokens(100) }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_approval_sent_only_when_allowance_is_short() {
    let allowance = tokens(100);
    let amounts = [
        U256::from(1),
        tokens(99),
        tokens(100),
        tokens(100) + U256::from(1),
        tokens(5_000),
    ];

    for amount in amounts {
        let h = harness(funded(allowance));
        h.controller.stake(amount).await.unwrap();

        let approvals: Vec<_> = h
            .vault
            .writes()
            .into_iter()
            .filter(|w| w.kind == WriteKind::Approve)
            .collect();

        if allowance >= amount {
            assert!(approvals.is_empty(), "unexpected approval for {}", amount);
        } else {
            assert_eq!(approvals, vec![WriteCall { kind: WriteKind::Approve, amount: U256::MAX }]);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_rejected_approval_reports_user_rejection() {
    let h = harness(funded(U256::ZERO));
    h.vault.fail_write(WriteKind::Approve, VaultError::UserRejected);

    let result = h.controller.stake(tokens(100)).await;

    assert_eq!(result, Err(VaultError::UserRejected));
    assert_eq!(
        h.handler.statuses(),
        vec![TxStatus::Checking, TxStatus::Approving, TxStatus::Error]
    );
    assert_eq!(
        h.controller.status().error.as_deref(),
        Some("Transaction rejected by user")
    );
    assert!(h.vault.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_revert_reason_is_reported() {
    let h = harness(funded(tokens(100)));
    h.vault.fail_write(
        WriteKind::Deposit,
        VaultError::Transaction { reason: Some("ERC4626: deposit more than max".to_string()) },
    );

    assert!(h.controller.stake(tokens(10)).await.is_err());
    assert_eq!(
        h.controller.status().error.as_deref(),
        Some("ERC4626: deposit more than max")
    );
}

#[tokio::test(start_paused = true)]
async fn test_generic_failure_uses_fallback_message() {
    let h = harness(funded(tokens(100)));
    h.vault.fail_write(WriteKind::Deposit, VaultError::Rpc("connection reset".to_string()));

    assert!(h.controller.stake(tokens(10)).await.is_err());
    assert_eq!(h.controller.status().error.as_deref(), Some("Transaction failed"));
}

#[tokio::test(start_paused = true)]
async fn test_stake_on_wrong_network_fails_in_checking() {
    let h = harness(MockState { chain_id: 1, ..funded(U256::MAX) });

    let result = h.controller.stake(tokens(1)).await;

    assert_eq!(result, Err(VaultError::WrongNetwork { expected: SEPOLIA, actual: 1 }));
    assert_eq!(h.handler.statuses(), vec![TxStatus::Checking, TxStatus::Error]);
    assert!(h.vault.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_amount_never_leaves_idle() {
    let h = harness(funded(U256::MAX));

    for amount in ["0", "", "-5", "ten"] {
        let result = h.controller.stake_amount(amount).await;
        assert!(matches!(result, Err(VaultError::InvalidAmount(_))), "{:?}", amount);
    }
    assert!(matches!(
        h.controller.stake(U256::ZERO).await,
        Err(VaultError::InvalidAmount(_))
    ));

    assert!(h.handler.statuses().is_empty());
    assert_eq!(h.controller.status().status, TxStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stake_amount_parses_decimals() {
    let h = harness(funded(U256::MAX));

    h.controller.stake_amount("2.5").await.unwrap();

    assert_eq!(
        h.vault.writes(),
        vec![WriteCall {
            kind: WriteKind::Deposit,
            amount: tokens(2) + tokens(1) / U256::from(2),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stake_amount_uses_token_decimals() {
    let h = harness(MockState { decimals: 6, ..funded(U256::MAX) });

    h.controller.stake_amount("2.5").await.unwrap();

    assert_eq!(
        h.vault.writes(),
        vec![WriteCall { kind: WriteKind::Deposit, amount: U256::from(2_500_000u64) }]
    );
}

// =========================================================================
// Withdraw flow
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_withdraw_without_shares_errors_without_transaction() {
    let h = harness(MockState::default());

    let result = h.controller.withdraw().await;

    assert_eq!(result, Err(VaultError::NoStake));
    assert_eq!(h.handler.statuses(), vec![TxStatus::Withdrawing, TxStatus::Error]);
    assert_eq!(h.controller.status().error.as_deref(), Some("No stake to withdraw"));
    assert!(h.vault.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_withdraw_redeems_all_shares() {
    let h = harness(MockState {
        shares: tokens(40),
        total_supply: tokens(100),
        total_assets: tokens(150),
        ..MockState::default()
    });

    h.controller.withdraw().await.unwrap();

    assert_eq!(h.handler.statuses(), vec![TxStatus::Withdrawing, TxStatus::Success]);
    assert_eq!(
        h.vault.writes(),
        vec![WriteCall { kind: WriteKind::Redeem, amount: tokens(40) }]
    );

    let state = h.vault.state();
    assert_eq!(state.shares, U256::ZERO);
    assert_eq!(state.token_balance, tokens(60));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_redeem_reports_user_rejection() {
    let h = harness(MockState { shares: tokens(1), total_supply: tokens(1), total_assets: tokens(1), ..MockState::default() });
    h.vault.fail_write(WriteKind::Redeem, VaultError::UserRejected);

    assert_eq!(h.controller.withdraw().await, Err(VaultError::UserRejected));
    assert_eq!(h.handler.statuses(), vec![TxStatus::Withdrawing, TxStatus::Error]);
    assert_eq!(
        h.controller.status().error.as_deref(),
        Some("Transaction rejected by user")
    );
    assert_eq!(h.vault.state().shares, tokens(1));
}

#[tokio::test(start_paused = true)]
async fn test_withdraw_failure_uses_withdraw_fallback() {
    let h = harness(MockState { shares: tokens(1), total_supply: tokens(1), total_assets: tokens(1), ..MockState::default() });
    h.vault.fail_write(WriteKind::Redeem, VaultError::Transaction { reason: None });

    assert!(h.controller.withdraw().await.is_err());
    assert_eq!(h.controller.status().error.as_deref(), Some("Withdrawal failed"));
}

// =========================================================================
// Yield simulation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_simulate_yield_approves_then_injects_fixed_amount() {
    let h = harness(MockState {
        token_balance: tokens(5_000),
        shares: tokens(1_000),
        total_supply: tokens(1_000),
        total_assets: tokens(1_000),
        ..MockState::default()
    });

    h.controller.simulate_yield().await.unwrap();

    assert_eq!(yield_simulation_amount(), tokens(1_000));
    assert_eq!(h.handler.statuses(), vec![TxStatus::Simulating, TxStatus::Success]);
    assert_eq!(
        h.vault.writes(),
        vec![
            WriteCall { kind: WriteKind::Approve, amount: U256::MAX },
            WriteCall { kind: WriteKind::SimulateYield, amount: tokens(1_000) },
        ]
    );
    // No shares minted, so every share is now worth two tokens
    let state = h.vault.state();
    assert_eq!(state.total_supply, tokens(1_000));
    assert_eq!(state.total_assets, tokens(2_000));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_yield_simulation_reports_user_rejection() {
    let h = harness(funded(U256::MAX));
    h.vault.fail_write(WriteKind::SimulateYield, VaultError::UserRejected);

    assert_eq!(h.controller.simulate_yield().await, Err(VaultError::UserRejected));
    assert_eq!(h.handler.statuses(), vec![TxStatus::Simulating, TxStatus::Error]);
    assert_eq!(
        h.controller.status().error.as_deref(),
        Some("Transaction rejected by user")
    );
    assert!(h.vault.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_simulate_yield_failure_message() {
    let h = harness(funded(U256::MAX));
    h.vault.fail_write(WriteKind::SimulateYield, VaultError::Rpc("not owner".to_string()));

    assert!(h.controller.simulate_yield().await.is_err());
    assert_eq!(h.controller.status().error.as_deref(), Some("Yield simulation failed"));
}

// =========================================================================
// Automatic reset and blocking
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_success_reverts_to_idle_after_delay_not_before() {
    let h = harness(funded(U256::MAX));

    h.controller.stake(tokens(1)).await.unwrap();
    assert_eq!(h.controller.status().status, TxStatus::Success);

    tokio::time::sleep(Duration::from_millis(2_999)).await;
    assert_eq!(h.controller.status().status, TxStatus::Success);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(h.controller.status().status, TxStatus::Idle);
    assert_eq!(h.handler.statuses().last(), Some(&TxStatus::Idle));
}

#[tokio::test(start_paused = true)]
async fn test_error_reverts_to_idle_and_clears_message() {
    let h = harness(MockState::default());

    let _ = h.controller.withdraw().await;
    assert_eq!(h.controller.status().status, TxStatus::Error);

    tokio::time::sleep(Duration::from_millis(3_001)).await;
    let status = h.controller.status();
    assert_eq!(status.status, TxStatus::Idle);
    assert!(status.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_custom_reset_delay() {
    let vault = Arc::new(MockVault::new(account(), funded(U256::MAX)));
    let handler = Arc::new(RecordingEventHandler::new());
    let controller = StakeController::new(vault, handler).with_reset_delay(Duration::from_millis(500));

    controller.stake(tokens(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(controller.status().status, TxStatus::Success);
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(controller.status().status, TxStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_requests_blocked_while_success_is_shown() {
    let h = harness(MockState { shares: tokens(1), total_supply: tokens(1), total_assets: tokens(1), ..funded(U256::MAX) });

    h.controller.stake(tokens(1)).await.unwrap();
    let writes = h.vault.writes().len();

    assert_eq!(h.controller.stake(tokens(1)).await, Err(VaultError::Busy));
    assert_eq!(h.controller.simulate_yield().await, Err(VaultError::Busy));
    assert_eq!(h.controller.withdraw().await, Err(VaultError::Busy));

    assert_eq!(h.vault.writes().len(), writes);
    assert_eq!(h.controller.status().status, TxStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_error_allows_stake_but_blocks_withdraw() {
    let h = harness(funded(U256::MAX));

    let _ = h.controller.withdraw().await;
    assert_eq!(h.controller.status().status, TxStatus::Error);

    assert_eq!(h.controller.withdraw().await, Err(VaultError::Busy));
    h.controller.stake(tokens(3)).await.unwrap();
    assert_eq!(h.controller.status().status, TxStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_stale_reset_does_not_clobber_newer_flow() {
    let h = harness(funded(U256::MAX));

    // ERROR at t=0 schedules a reset for t=3000
    let _ = h.controller.withdraw().await;
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    // SUCCESS at t=2000 schedules its own reset for t=5000
    h.controller.stake(tokens(1)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(h.controller.status().status, TxStatus::Success);

    tokio::time::sleep(Duration::from_millis(1_600)).await;
    assert_eq!(h.controller.status().status, TxStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_flows_are_refused() {
    let vault = MockVault::new(account(), funded(U256::ZERO)).with_write_delay(Duration::from_secs(1));
    let h = harness_with(vault);

    let (first, second) = tokio::join!(h.controller.stake(tokens(10)), async {
        tokio::task::yield_now().await;
        h.controller.stake(tokens(20)).await
    });

    assert!(first.is_ok());
    assert_eq!(second, Err(VaultError::Busy));
    assert_eq!(
        h.vault.writes(),
        vec![
            WriteCall { kind: WriteKind::Approve, amount: U256::MAX },
            WriteCall { kind: WriteKind::Deposit, amount: tokens(10) },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_latest_status() {
    let h = harness(funded(U256::MAX));
    let rx = h.controller.subscribe();

    h.controller.stake(tokens(1)).await.unwrap();

    let snapshot = rx.borrow().clone();
    assert_eq!(snapshot.status, TxStatus::Success);
    assert_eq!(snapshot.epoch, 4);
}

#[tokio::test(start_paused = true)]
async fn test_success_refreshes_balances() {
    let vault = Arc::new(MockVault::new(account(), funded(U256::MAX)));
    let handler = Arc::new(RecordingEventHandler::new());
    let poller = Arc::new(BalancePoller::new(account(), vault.clone(), handler.clone()));
    let controller = StakeController::new(vault.clone(), handler.clone()).with_balance_poller(poller.clone());

    controller.stake(tokens(100)).await.unwrap();

    let balances = handler.balances();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].staked_balance, tokens(100));
    assert_eq!(balances[0].token_balance, tokens(1_000_000) - tokens(100));
    assert_eq!(poller.latest().await, Some(balances[0].clone()));
}
