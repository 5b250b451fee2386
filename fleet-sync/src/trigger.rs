//! Sync triggers and the background retry hook

use crate::error::SyncResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Why a sync cycle was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSignal {
    /// Connectivity went from offline to online
    ConnectivityRegained,
    /// The request interceptor asked for a sync (background-sync message)
    BackgroundSync,
    /// User pressed "sync now"
    Manual,
}

/// Platform scheduler that can re-attempt a sync opportunistically, even
/// when the app is closed. Absence of the capability only affects
/// timeliness.
#[async_trait]
pub trait BackgroundSyncHook: Send + Sync {
    async fn register(&self, tag: &str) -> SyncResult<()>;
}

/// Used when the platform offers no background scheduler
pub struct NoopBackgroundHook;

#[async_trait]
impl BackgroundSyncHook for NoopBackgroundHook {
    async fn register(&self, tag: &str) -> SyncResult<()> {
        tracing::trace!(tag, "No background scheduler available");
        Ok(())
    }
}
