use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VaultError;
use crate::models::{ProtocolStats, SolvencyReport, StatusSnapshot, VaultBalances};
use crate::traits::event_handler::VaultEventHandler;

/// Forwards every event to each handler in insertion order
#[derive(Default)]
pub struct CompositeEventHandler {
    handlers: Vec<Arc<dyn VaultEventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler to the composite
    pub fn add_handler(&mut self, handler: Arc<dyn VaultEventHandler>) {
        self.handlers.push(handler);
    }
}

#[async_trait]
impl VaultEventHandler for CompositeEventHandler {
    async fn on_status_change(&self, snapshot: &StatusSnapshot) {
        for handler in &self.handlers {
            handler.on_status_change(snapshot).await;
        }
    }

    async fn on_balances(&self, balances: &VaultBalances) {
        for handler in &self.handlers {
            handler.on_balances(balances).await;
        }
    }

    async fn on_stats(&self, stats: &ProtocolStats) {
        for handler in &self.handlers {
            handler.on_stats(stats).await;
        }
    }

    async fn on_solvency(&self, report: &SolvencyReport) {
        for handler in &self.handlers {
            handler.on_solvency(report).await;
        }
    }

    async fn handle_error(&self, error: &VaultError) {
        for handler in &self.handlers {
            handler.handle_error(error).await;
        }
    }
}
