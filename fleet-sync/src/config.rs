//! Engine configuration

use crate::store::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};

/// What happens to queue entries whose submission failed in a cycle that
/// otherwise completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueRetention {
    /// Clear the processed backlog wholesale; a failed item gets one attempt
    #[default]
    DropFailed,
    /// Keep failed items queued, in order, until the remote acknowledges them
    RetainFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Key of the persisted snapshot record
    pub storage_key: String,
    pub queue_retention: QueueRetention,
    /// Rewrite provisional foreign ids with authoritative ones during replay
    pub remap_foreign_ids: bool,
    /// Tag used when registering the background retry hook
    pub background_sync_tag: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            queue_retention: QueueRetention::DropFailed,
            remap_foreign_ids: true,
            background_sync_tag: "background-sync".to_string(),
        }
    }
}
