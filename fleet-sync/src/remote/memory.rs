//! In-process authoritative store
//!
//! Stands in for the remote data service in tests and dry runs. Assigns
//! sequential ids, lists newest first, records every call it receives and
//! can be scripted to reject or to become unreachable.

use super::RemoteService;
use crate::entity::{Collection, Entity, Payload};
use crate::error::{SyncError, SyncResult};
use crate::id::EntityId;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// A call received by [`InMemoryRemote`]
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    GetAll(Collection),
    Add(Collection, Payload),
    Update(Collection, EntityId, Payload),
    Delete(Collection, EntityId),
}

#[derive(Default)]
struct RemoteState {
    next_id: u64,
    records: HashMap<Collection, Vec<Entity>>,
    calls: Vec<RemoteCall>,
    unreachable: bool,
    /// Adds whose payload has `field == value` are rejected
    rejections: Vec<(String, Value)>,
    latency: Option<Duration>,
}

#[derive(Default)]
pub struct InMemoryRemote {
    state: Mutex<RemoteState>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate total loss of the service
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    /// Reject every create whose payload has `field` equal to `value`
    pub fn reject_adds_where(&self, field: &str, value: Value) {
        self.state.lock().rejections.push((field.to_string(), value));
    }

    /// Accept everything again
    pub fn clear_rejections(&self) {
        self.state.lock().rejections.clear();
    }

    /// Delay every call, letting tests observe work in flight
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = Some(latency);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    /// Payloads of all create calls received, accepted or not
    pub fn add_calls(&self, collection: Collection) -> Vec<Payload> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Add(c, payload) if *c == collection => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn records(&self, collection: Collection) -> Vec<Entity> {
        self.state
            .lock()
            .records
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Put a record straight into the store, bypassing call recording
    pub fn seed(&self, collection: Collection, fields: Payload) -> EntityId {
        let mut state = self.state.lock();
        Self::insert(&mut state, collection, fields)
    }

    fn insert(state: &mut RemoteState, collection: Collection, fields: Payload) -> EntityId {
        state.next_id += 1;
        let id = EntityId::remote(format!("rem-{:06}", state.next_id));
        let entity = Entity::new(id.clone(), Utc::now(), fields);
        state.records.entry(collection).or_default().insert(0, entity);
        id
    }

    /// Record the call and apply the shared failure rules
    async fn enter(&self, call: RemoteCall) -> SyncResult<()> {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        state.calls.push(call);
        if state.unreachable {
            return Err(SyncError::Unreachable("in-memory remote is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteService for InMemoryRemote {
    async fn get_all(&self, collection: Collection) -> SyncResult<Vec<Entity>> {
        self.enter(RemoteCall::GetAll(collection)).await?;
        Ok(self.records(collection))
    }

    async fn add(&self, collection: Collection, payload: Payload) -> SyncResult<EntityId> {
        self.enter(RemoteCall::Add(collection, payload.clone())).await?;

        let mut state = self.state.lock();
        let rejected = state
            .rejections
            .iter()
            .any(|(field, value)| payload.get(field) == Some(value));
        if rejected {
            return Err(SyncError::Remote(format!("{} create rejected", collection)));
        }

        Ok(Self::insert(&mut state, collection, payload))
    }

    async fn update(&self, collection: Collection, id: &EntityId, patch: Payload) -> SyncResult<()> {
        self.enter(RemoteCall::Update(collection, id.clone(), patch.clone()))
            .await?;

        let mut state = self.state.lock();
        let entity = state
            .records
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|e| e.id == *id))
            .ok_or_else(|| SyncError::NotFound(format!("{}/{}", collection, id)))?;
        entity.apply_patch(patch);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &EntityId) -> SyncResult<()> {
        self.enter(RemoteCall::Delete(collection, id.clone())).await?;

        let mut state = self.state.lock();
        let records = state.records.entry(collection).or_default();
        let before = records.len();
        records.retain(|e| e.id != *id);
        if records.len() == before {
            return Err(SyncError::NotFound(format!("{}/{}", collection, id)));
        }
        Ok(())
    }
}
