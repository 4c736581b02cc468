//! Concrete providers for chain access and the contract assistant

pub mod gemini_provider;
pub mod rpc_provider;

// Re-export for convenience
pub use gemini_provider::GeminiAssistant;
pub use rpc_provider::{RpcVaultReader, RpcVaultSigner};
