//! Durable local store
//!
//! Holds one serialized record: the mirror of all three collections plus the
//! pending-mutation queue, so both are always read and written together.
//!
//! Reads never fail: missing or unreadable state is the empty snapshot.
//! Writes are advisory: a failure is logged and swallowed so that losing the
//! local mirror never blocks the operation being completed.

use crate::entity::{Collection, Entity};
use crate::error::{SyncError, SyncResult};
use crate::queue::PendingSync;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default key of the persisted record
pub const DEFAULT_STORAGE_KEY: &str = "offlineData";

/// Everything the client keeps locally
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSnapshot {
    #[serde(default)]
    pub responsibles: Vec<Entity>,
    #[serde(default)]
    pub vehicles: Vec<Entity>,
    #[serde(default)]
    pub fuel_records: Vec<Entity>,
    #[serde(default)]
    pub pending_sync: PendingSync,
}

impl OfflineSnapshot {
    /// Entities of one collection, newest first
    pub fn collection(&self, collection: Collection) -> &[Entity] {
        match collection {
            Collection::Responsibles => &self.responsibles,
            Collection::Vehicles => &self.vehicles,
            Collection::FuelRecords => &self.fuel_records,
        }
    }

    pub fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Entity> {
        match collection {
            Collection::Responsibles => &mut self.responsibles,
            Collection::Vehicles => &mut self.vehicles,
            Collection::FuelRecords => &mut self.fuel_records,
        }
    }
}

/// Raw key/value persistence under the local store
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Load the serialized record stored under `key`, if any
    async fn load(&self, key: &str) -> SyncResult<Option<String>>;

    /// Replace the serialized record stored under `key`
    async fn save(&self, key: &str, value: &str) -> SyncResult<()>;
}

/// Process-local backend, used for tests and dry runs
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent load fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent save fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.records.lock().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, value: &str) {
        self.records.lock().insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn load(&self, key: &str) -> SyncResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::Internal("memory backend read failure".to_string()));
        }
        Ok(self.raw(key))
    }

    async fn save(&self, key: &str, value: &str) -> SyncResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::Internal("memory backend write failure".to_string()));
        }
        self.put_raw(key, value);
        Ok(())
    }
}

/// Snapshot reader/writer with the best-effort policy applied
pub struct LocalStore {
    backend: Arc<dyn SnapshotBackend>,
    key: String,
    // Serializes read-modify-write cycles
    write_lock: tokio::sync::Mutex<()>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn SnapshotBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current snapshot, or the empty default if nothing usable is stored
    pub async fn read(&self) -> OfflineSnapshot {
        let raw = match self.backend.load(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return OfflineSnapshot::default(),
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Failed to read offline data");
                return OfflineSnapshot::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Stored offline data is unreadable, starting empty");
                OfflineSnapshot::default()
            }
        }
    }

    /// Persist a snapshot. Failures are logged, never returned.
    pub async fn write(&self, snapshot: &OfflineSnapshot) {
        let raw = match serde_json::to_string(snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Failed to serialize offline data");
                return;
            }
        };

        if let Err(e) = self.backend.save(&self.key, &raw).await {
            tracing::error!(key = %self.key, error = %e, "Failed to save offline data");
        }
    }

    /// Read, modify and write back the snapshot as one step.
    ///
    /// A failed read starts from the empty snapshot, so a transient backend
    /// error followed by a successful write replaces the persisted state.
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut OfflineSnapshot) -> R,
    {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.read().await;
        let result = f(&mut snapshot);
        self.write(&snapshot).await;
        result
    }

    /// Entities of one collection from the last persisted snapshot
    pub async fn collection(&self, collection: Collection) -> Vec<Entity> {
        self.read().await.collection(collection).to_vec()
    }
}
