//! Sync status, cycle reports and the offline indicator model

use crate::entity::Collection;
use crate::queue::PendingCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Message retained after a cycle aborts, until the next cycle starts
pub const SYNC_ERROR_MESSAGE: &str = "Failed to synchronize data. Will retry.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
}

/// Coordinator state. An `Idle` status with `last_error` set is the error
/// state of the previous cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        self.state == SyncState::Syncing
    }
}

/// Outcome counters for one collection in one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub submitted: usize,
    pub failed: usize,
}

/// Summary of a completed cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub collections: BTreeMap<Collection, CollectionReport>,
    /// Foreign-key values rewritten from provisional to authoritative ids
    pub remapped_ids: usize,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl SyncReport {
    pub fn record_submitted(&mut self, collection: Collection) {
        self.collections.entry(collection).or_default().submitted += 1;
    }

    pub fn record_failed(&mut self, collection: Collection) {
        self.collections.entry(collection).or_default().failed += 1;
    }

    pub fn submitted(&self) -> usize {
        self.collections.values().map(|r| r.submitted).sum()
    }

    pub fn failed(&self) -> usize {
        self.collections.values().map(|r| r.failed).sum()
    }
}

// Serialize Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Everything the offline/sync banner shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncIndicator {
    pub online: bool,
    pub syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub pending: PendingCounts,
}

impl SyncIndicator {
    /// The banner is hidden only when everything is settled
    pub fn visible(&self) -> bool {
        !(self.online && !self.syncing && self.pending.is_empty() && self.error.is_none())
    }

    /// Whether the manual "sync now" trigger is offered
    pub fn can_sync_now(&self) -> bool {
        self.online && !self.syncing && !self.pending.is_empty()
    }
}
