//! Pending mutation queue
//!
//! Per-collection FIFO backlog of creates made while offline. Entries are
//! appended while offline and only removed by the sync coordinator once a
//! cycle has processed them.

use crate::entity::{Collection, Payload};
use crate::id::EntityId;
use crate::store::LocalStore;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One queued create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    /// Provisional id the entity was created under locally
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_local_id"
    )]
    pub local_id: Option<EntityId>,
    /// Create body as submitted to the remote service
    #[serde(flatten)]
    pub payload: Payload,
}

// A non-string tag is ignored rather than failing the whole snapshot
fn lenient_local_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(EntityId::from(id)),
        _ => None,
    })
}

impl PendingEntry {
    pub fn new(payload: Payload, local_id: Option<EntityId>) -> Self {
        Self { local_id, payload }
    }
}

/// Backlog of all three collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSync {
    #[serde(default)]
    pub responsibles: Vec<PendingEntry>,
    #[serde(default)]
    pub vehicles: Vec<PendingEntry>,
    #[serde(default)]
    pub fuel_records: Vec<PendingEntry>,
}

impl PendingSync {
    pub fn entries(&self, collection: Collection) -> &[PendingEntry] {
        match collection {
            Collection::Responsibles => &self.responsibles,
            Collection::Vehicles => &self.vehicles,
            Collection::FuelRecords => &self.fuel_records,
        }
    }

    fn entries_mut(&mut self, collection: Collection) -> &mut Vec<PendingEntry> {
        match collection {
            Collection::Responsibles => &mut self.responsibles,
            Collection::Vehicles => &mut self.vehicles,
            Collection::FuelRecords => &mut self.fuel_records,
        }
    }

    /// Append to the tail of a collection's backlog
    pub fn enqueue(&mut self, collection: Collection, entry: PendingEntry) {
        self.entries_mut(collection).push(entry);
    }

    pub fn clear(&mut self, collection: Collection) {
        self.entries_mut(collection).clear();
    }

    /// Settle a processed prefix of a collection's backlog.
    ///
    /// Removes the first `processed` entries (those that were drained for the
    /// cycle) and puts `keep` back at the head, preserving order. Entries
    /// appended after the drain are left in place.
    pub fn settle(&mut self, collection: Collection, processed: usize, keep: Vec<PendingEntry>) {
        let entries = self.entries_mut(collection);
        let processed = processed.min(entries.len());
        entries.splice(..processed, keep);
    }

    pub fn counts(&self) -> PendingCounts {
        PendingCounts {
            responsibles: self.responsibles.len(),
            vehicles: self.vehicles.len(),
            fuel_records: self.fuel_records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().is_empty()
    }
}

/// Number of pending items per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCounts {
    pub responsibles: usize,
    pub vehicles: usize,
    pub fuel_records: usize,
}

impl PendingCounts {
    pub fn get(&self, collection: Collection) -> usize {
        match collection {
            Collection::Responsibles => self.responsibles,
            Collection::Vehicles => self.vehicles,
            Collection::FuelRecords => self.fuel_records,
        }
    }

    pub fn total(&self) -> usize {
        self.responsibles + self.vehicles + self.fuel_records
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Queue operations against the durable store
pub struct PendingQueue<'a> {
    store: &'a LocalStore,
}

impl<'a> PendingQueue<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    pub async fn enqueue(&self, collection: Collection, entry: PendingEntry) {
        let depth = self
            .store
            .update(|snapshot| {
                snapshot.pending_sync.enqueue(collection, entry);
                snapshot.pending_sync.entries(collection).len()
            })
            .await;

        tracing::debug!(collection = %collection, depth, "Queued create for sync");
    }

    /// Current backlog in replay order, without removing anything.
    /// Collections with nothing pending are omitted.
    pub async fn drain_all(&self) -> Vec<(Collection, Vec<PendingEntry>)> {
        let pending = self.store.read().await.pending_sync;

        Collection::REPLAY_ORDER
            .into_iter()
            .map(|collection| (collection, pending.entries(collection).to_vec()))
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }

    pub async fn clear(&self, collection: Collection) {
        self.store
            .update(|snapshot| snapshot.pending_sync.clear(collection))
            .await;
    }

    pub async fn counts(&self) -> PendingCounts {
        self.store.read().await.pending_sync.counts()
    }
}
