//! Capability contract implemented by every sync backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::outcome::SyncOutcome;
use crate::measurements::Measurement;

/// Operations a host application can drive against a remote backend.
///
/// Implementations trap all internal errors and report them as a
/// [`SyncFailure`](super::SyncFailure); nothing panics across this boundary.
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Short identifier of the backend (e.g. `"athlyze"`).
    fn name(&self) -> &str;

    /// Push every measurement to the remote.
    async fn sync(&self, measurements: &[Measurement]) -> SyncOutcome;

    async fn insert(&self, measurement: &Measurement) -> SyncOutcome;

    /// Overwrite the remote record whose date matches the measurement.
    async fn update(&self, measurement: &Measurement) -> SyncOutcome;

    /// Remove the remote record recorded at `date`.
    async fn delete(&self, date: DateTime<Utc>) -> SyncOutcome;

    /// Remove every remote record.
    async fn clear(&self) -> SyncOutcome;
}
