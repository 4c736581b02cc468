use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::VaultError;
use crate::models::{ProtocolStats, SolvencyReport, StatusSnapshot, VaultBalances};
use crate::traits::event_handler::VaultEventHandler;

/// One line of the event log
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EventRecord<'a> {
    Status(&'a StatusSnapshot),
    Balances(&'a VaultBalances),
    Stats(&'a ProtocolStats),
    Solvency(&'a SolvencyReport),
    Error { message: String },
}

/// Appends every event as a JSON line to a file (`EVENTS_LOG`)
pub struct JsonLogEventHandler {
    path: PathBuf,
    // Serializes appends so lines from concurrent pollers never interleave
    write_lock: Mutex<()>,
}

impl JsonLogEventHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: EventRecord<'_>) {
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode event: {}", e);
                return;
            }
        };
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;

        match file {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    warn!("Failed to write event log {}: {}", self.path.display(), e);
                } else {
                    debug!("Logged event to {}", self.path.display());
                }
            }
            Err(e) => warn!("Failed to open event log {}: {}", self.path.display(), e),
        }
    }
}

#[async_trait]
impl VaultEventHandler for JsonLogEventHandler {
    async fn on_status_change(&self, snapshot: &StatusSnapshot) {
        self.append(EventRecord::Status(snapshot)).await;
    }

    async fn on_balances(&self, balances: &VaultBalances) {
        self.append(EventRecord::Balances(balances)).await;
    }

    async fn on_stats(&self, stats: &ProtocolStats) {
        self.append(EventRecord::Stats(stats)).await;
    }

    async fn on_solvency(&self, report: &SolvencyReport) {
        self.append(EventRecord::Solvency(report)).await;
    }

    async fn handle_error(&self, error: &VaultError) {
        self.append(EventRecord::Error { message: error.to_string() }).await;
    }
}
