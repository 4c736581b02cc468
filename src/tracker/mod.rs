//! Pollers and the transaction controller

pub mod balance_poller;
pub mod controller;
pub mod stats_poller;

pub use balance_poller::BalancePoller;
pub use controller::StakeController;
pub use stats_poller::StatsPoller;
