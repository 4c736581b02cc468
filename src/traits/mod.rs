//! Core traits for the vault client

pub mod assistant;
pub mod event_handler;
pub mod vault_provider;

// Re-export for convenience
pub use assistant::ContractAssistant;
pub use event_handler::VaultEventHandler;
pub use vault_provider::{VaultReader, VaultWriter};
