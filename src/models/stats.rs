use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::helper::{format_token_amount, to_display_f64, TOKEN_DECIMALS};

/// Vault-wide figures shown to every visitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolStats {
    pub total_assets: U256,
    pub total_supply: U256,
    /// Assets redeemable for one whole share
    pub share_price: U256,
    pub timestamp: DateTime<Utc>,
}

impl ProtocolStats {
    pub fn new(total_assets: U256, total_supply: U256, share_price: U256) -> Self {
        Self {
            total_assets,
            total_supply,
            share_price,
            timestamp: Utc::now(),
        }
    }

    pub fn tvl_display(&self) -> String {
        format_token_amount(self.total_assets, TOKEN_DECIMALS, 2)
    }

    pub fn total_supply_display(&self) -> String {
        format_token_amount(self.total_supply, TOKEN_DECIMALS, 2)
    }

    pub fn share_price_display(&self) -> String {
        format_token_amount(self.share_price, TOKEN_DECIMALS, 4)
    }

    pub fn solvency(&self) -> SolvencyReport {
        SolvencyReport::from_totals(self.total_assets, self.total_supply)
    }
}

/// Backing of outstanding shares by vault assets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvencyReport {
    /// `total_assets / total_supply`, exactly 1.0 when no shares exist
    pub ratio: f64,
    pub is_solvent: bool,
    pub total_assets: U256,
    pub total_supply: U256,
    pub timestamp: DateTime<Utc>,
}

impl SolvencyReport {
    pub fn from_totals(total_assets: U256, total_supply: U256) -> Self {
        let ratio = backing_ratio(total_assets, total_supply);
        Self {
            ratio,
            is_solvent: ratio >= 1.0,
            total_assets,
            total_supply,
            timestamp: Utc::now(),
        }
    }

    pub fn assets_display(&self) -> String {
        format_token_amount(self.total_assets, TOKEN_DECIMALS, 2)
    }

    pub fn ratio_percent_display(&self) -> String {
        format!("{:.2}%", self.ratio * 100.0)
    }
}

/// Assets per share on 18-decimal values.
pub fn backing_ratio(total_assets: U256, total_supply: U256) -> f64 {
    let supply = to_display_f64(total_supply, TOKEN_DECIMALS);
    if supply == 0.0 {
        return 1.0;
    }
    to_display_f64(total_assets, TOKEN_DECIMALS) / supply
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10).pow(U256::from(18))
    }

    #[test]
    fn test_ratio_is_one_with_zero_supply() {
        assert_eq!(backing_ratio(U256::ZERO, U256::ZERO), 1.0);
        assert_eq!(backing_ratio(ether(1_000_000), U256::ZERO), 1.0);
        assert!(SolvencyReport::from_totals(ether(7), U256::ZERO).is_solvent);
    }

    #[test]
    fn test_ratio_and_solvency_flag() {
        let report = SolvencyReport::from_totals(ether(1100), ether(1000));
        assert!((report.ratio - 1.1).abs() < 1e-12);
        assert!(report.is_solvent);
        assert_eq!(report.ratio_percent_display(), "110.00%");

        let report = SolvencyReport::from_totals(ether(900), ether(1000));
        assert!(!report.is_solvent);
    }

    #[test]
    fn test_exactly_backed_is_solvent() {
        let report = SolvencyReport::from_totals(ether(1000), ether(1000));
        assert_eq!(report.ratio, 1.0);
        assert!(report.is_solvent);
    }

    #[test]
    fn test_stats_display() {
        let stats = ProtocolStats::new(ether(2500), ether(2000), ether(1));
        assert_eq!(stats.tvl_display(), "2500.00");
        assert_eq!(stats.total_supply_display(), "2000.00");
        assert_eq!(stats.share_price_display(), "1.0000");
        assert!((stats.solvency().ratio - 1.25).abs() < 1e-12);
    }
}
