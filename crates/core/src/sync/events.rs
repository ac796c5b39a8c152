//! Structured per-operation events for observability collaborators.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::outcome::SyncErrorKind;

/// Public operations a sync backend performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    FullSync,
    Insert,
    Update,
    Delete,
    Clear,
    CheckConnection,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::FullSync => "full_sync",
            SyncOperation::Insert => "insert",
            SyncOperation::Update => "update",
            SyncOperation::Delete => "delete",
            SyncOperation::Clear => "clear",
            SyncOperation::CheckConnection => "check_connection",
        }
    }
}

/// Lightweight metrics emitted once per finished operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperationMetrics {
    pub operation: SyncOperation,
    /// Remote records the operation tried to write or remove.
    pub attempted: usize,
    /// Of those, how many the remote rejected.
    pub failed: usize,
    pub duration_ms: i64,
    /// `"ok"` or the failure kind (`"api_error"`, ...).
    pub status: String,
}

impl SyncOperationMetrics {
    pub fn status_for(error: Option<SyncErrorKind>) -> String {
        error
            .map(|kind| kind.as_str().to_string())
            .unwrap_or_else(|| "ok".to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Receives operation metrics. Implementations must not block.
pub trait SyncEventSink: Send + Sync {
    fn emit(&self, metrics: SyncOperationMetrics);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSyncEventSink;

impl SyncEventSink for NoopSyncEventSink {
    fn emit(&self, _metrics: SyncOperationMetrics) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSyncEventSink;

impl SyncEventSink for LogSyncEventSink {
    fn emit(&self, metrics: SyncOperationMetrics) {
        if metrics.is_ok() {
            info!(
                "[Sync] {} ok (attempted={}, duration={}ms)",
                metrics.operation.as_str(),
                metrics.attempted,
                metrics.duration_ms
            );
        } else {
            warn!(
                "[Sync] {} {} (attempted={}, failed={}, duration={}ms)",
                metrics.operation.as_str(),
                metrics.status,
                metrics.attempted,
                metrics.failed,
                metrics.duration_ms
            );
        }
    }
}
