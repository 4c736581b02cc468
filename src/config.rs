//! Runtime configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::Context;

use crate::utils::helper::parse_address;

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const DEFAULT_TOKEN_ADDRESS: &str = "0x6bc373e3230d6A29C235BFEaF13fE052ad061DE2";
pub const DEFAULT_VAULT_ADDRESS: &str = "0x350091059C8507c8fC3D82201AB09Fe3b251c281";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Connection, account and timing settings
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub token_address: Address,
    pub vault_address: Address,
    pub private_key: Option<String>,
    pub account: Option<Address>,
    pub poll_interval: Duration,
    pub stats_interval: Duration,
    pub solvency_interval: Duration,
    pub status_reset_delay: Duration,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// JSON-lines event log, in addition to console output
    pub events_log: Option<PathBuf>,
}

impl VaultConfig {
    /// Load from process environment (after `.env` has been applied)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset or blank keys use defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // `tokio::time::interval` requires a non-zero period
        let millis = |key: &str, default: u64| -> anyhow::Result<Duration> {
            let Some(raw) = get(key) else {
                return Ok(Duration::from_millis(default));
            };
            let ms = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of milliseconds", key))?;
            if ms == 0 {
                anyhow::bail!("{} must be greater than zero", key);
            }
            Ok(Duration::from_millis(ms))
        };

        let chain_id = match get("CHAIN_ID") {
            Some(raw) => raw.trim().parse().context("CHAIN_ID must be an integer")?,
            None => SEPOLIA_CHAIN_ID,
        };

        let token_address = parse_address(&get("TOKEN_ADDRESS").unwrap_or_else(|| DEFAULT_TOKEN_ADDRESS.to_string()))
            .context("TOKEN_ADDRESS")?;
        let vault_address = parse_address(&get("VAULT_ADDRESS").unwrap_or_else(|| DEFAULT_VAULT_ADDRESS.to_string()))
            .context("VAULT_ADDRESS")?;

        let account = get("ACCOUNT_ADDRESS")
            .map(|raw| parse_address(&raw))
            .transpose()
            .context("ACCOUNT_ADDRESS")?;

        Ok(Self {
            rpc_url: get("VAULT_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            chain_id,
            token_address,
            vault_address,
            private_key: get("PRIVATE_KEY"),
            account,
            poll_interval: millis("POLL_INTERVAL_MS", 10_000)?,
            stats_interval: millis("STATS_INTERVAL_MS", 15_000)?,
            solvency_interval: millis("SOLVENCY_INTERVAL_MS", 30_000)?,
            status_reset_delay: millis("STATUS_RESET_MS", 3_000)?,
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            events_log: get("EVENTS_LOG").map(PathBuf::from),
        })
    }

    /// Whether transactions can be sent without discovering an account
    pub fn has_signer(&self) -> bool {
        self.private_key.is_some() || self.account.is_some()
    }
}
