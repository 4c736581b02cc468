//! Error types for vault reads and transaction flows

use alloy::primitives::U256;

/// EIP-1193 code a wallet returns when the user declines to sign.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors surfaced by vault providers and the stake controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Transaction rejected by user")]
    UserRejected,

    #[error("No stake to withdraw")]
    NoStake,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Another transaction is already in progress")]
    Busy,

    #[error("No wallet account connected")]
    NotConnected,

    #[error("Wrong network: expected chain {expected}, connected to {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Contract not found on this network")]
    ContractNotFound,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transaction failed{}", reason_suffix(.reason))]
    Transaction { reason: Option<String> },
}

impl VaultError {
    /// Classify a JSON-RPC error payload returned by a node or wallet.
    ///
    /// The rejection code may appear at the top level or nested inside the
    /// payload's `data` object, depending on the wallet in front of the node.
    pub fn from_rpc_payload(code: i64, message: &str, data: Option<&str>) -> Self {
        if code == USER_REJECTED_CODE || data.map(nested_rejection).unwrap_or(false) {
            return VaultError::UserRejected;
        }

        if let Some(rest) = message.strip_prefix("execution reverted") {
            let reason = rest.trim_start_matches(':').trim();
            return VaultError::Transaction {
                reason: (!reason.is_empty()).then(|| reason.to_string()),
            };
        }

        VaultError::Rpc(format!("{} (code {})", message, code))
    }

    /// Message shown to the user when a flow ends in `ERROR`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            VaultError::UserRejected
            | VaultError::NoStake
            | VaultError::InvalidAmount(_)
            | VaultError::Busy
            | VaultError::NotConnected
            | VaultError::WrongNetwork { .. } => self.to_string(),
            VaultError::Transaction { reason: Some(reason) } => reason.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Error for a mined transaction whose receipt reports failure.
    pub fn reverted() -> Self {
        VaultError::Transaction { reason: None }
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default()
}

fn nested_rejection(data: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
        return false;
    };

    let is_rejection = |v: &serde_json::Value| {
        v.get("code").and_then(|c| c.as_i64()) == Some(USER_REJECTED_CODE)
    };

    is_rejection(&value)
        || value.get("error").map(is_rejection).unwrap_or(false)
        || value
            .get("info")
            .and_then(|info| info.get("error"))
            .map(is_rejection)
            .unwrap_or(false)
}

/// Reject zero amounts before any transaction flow starts.
pub fn ensure_positive(amount: U256) -> Result<U256, VaultError> {
    if amount.is_zero() {
        return Err(VaultError::InvalidAmount("amount must be greater than zero".to_string()));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection_top_level_code() {
        let err = VaultError::from_rpc_payload(4001, "User denied transaction signature", None);
        assert_eq!(err, VaultError::UserRejected);
        assert_eq!(err.user_message("Transaction failed"), "Transaction rejected by user");
    }

    #[test]
    fn test_user_rejection_nested_in_data() {
        let data = r#"{"info":{"error":{"code":4001,"message":"denied"}}}"#;
        let err = VaultError::from_rpc_payload(-32603, "Internal error", Some(data));
        assert_eq!(err, VaultError::UserRejected);

        let data = r#"{"code":4001}"#;
        assert_eq!(
            VaultError::from_rpc_payload(-32000, "wallet error", Some(data)),
            VaultError::UserRejected
        );
    }

    #[test]
    fn test_revert_reason_is_surfaced() {
        let err = VaultError::from_rpc_payload(
            3,
            "execution reverted: ERC20: insufficient allowance",
            None,
        );
        assert_eq!(err.user_message("Transaction failed"), "ERC20: insufficient allowance");
    }

    #[test]
    fn test_bare_revert_uses_fallback() {
        let err = VaultError::from_rpc_payload(3, "execution reverted", None);
        assert_eq!(err, VaultError::Transaction { reason: None });
        assert_eq!(err.user_message("Withdrawal failed"), "Withdrawal failed");
    }

    #[test]
    fn test_generic_rpc_error_uses_fallback() {
        let err = VaultError::from_rpc_payload(-32000, "nonce too low", Some("not json"));
        assert!(matches!(err, VaultError::Rpc(_)));
        assert_eq!(err.user_message("Yield simulation failed"), "Yield simulation failed");
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive(U256::ZERO).is_err());
        assert_eq!(ensure_positive(U256::from(5)).unwrap(), U256::from(5));
    }
}
