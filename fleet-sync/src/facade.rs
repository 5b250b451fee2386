//! Entity access façades
//!
//! One façade per collection. Every call checks connectivity and routes to
//! the remote service (then refreshes the local mirror from the
//! authoritative response) or to the local snapshot (queueing creates for
//! later replay). Identifiers decide routing too: a provisional id has no
//! remote counterpart, so it is always handled locally.

use crate::context::SyncContext;
use crate::entity::{strip_reserved, Collection, Entity, Payload};
use crate::error::{SyncError, SyncResult};
use crate::id::EntityId;
use crate::queue::PendingEntry;
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;

/// Binds a façade to one collection
pub trait CollectionKind: Send + Sync + 'static {
    const COLLECTION: Collection;
}

/// Collections whose records can be edited after creation
pub trait Updatable: CollectionKind {}

pub mod kind {
    use super::{CollectionKind, Updatable};
    use crate::entity::Collection;

    pub struct Responsible;
    pub struct Vehicle;
    pub struct FuelRecord;

    impl CollectionKind for Responsible {
        const COLLECTION: Collection = Collection::Responsibles;
    }

    impl CollectionKind for Vehicle {
        const COLLECTION: Collection = Collection::Vehicles;
    }

    impl CollectionKind for FuelRecord {
        const COLLECTION: Collection = Collection::FuelRecords;
    }

    impl Updatable for FuelRecord {}
}

pub type ResponsibleFacade = EntityFacade<kind::Responsible>;
pub type VehicleFacade = EntityFacade<kind::Vehicle>;
pub type FuelRecordFacade = EntityFacade<kind::FuelRecord>;

/// Result of a list call. A remote read failure is recovered from the local
/// snapshot and reported alongside it rather than returned as an error.
#[derive(Debug)]
pub struct Loaded {
    pub entities: Vec<Entity>,
    pub error: Option<SyncError>,
}

impl Loaded {
    fn fresh(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            error: None,
        }
    }

    /// Whether the entities came from the local fallback after a failed read
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

pub struct EntityFacade<K> {
    ctx: Arc<SyncContext>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for EntityFacade<K> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: CollectionKind> EntityFacade<K> {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self {
            ctx,
            _kind: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        K::COLLECTION
    }

    /// Current contents of the collection.
    ///
    /// Online, the remote result replaces the local slice. If the remote read
    /// fails the last local slice is returned with the error attached.
    /// Offline, the local slice is returned without touching the remote.
    pub async fn list(&self) -> Loaded {
        let collection = K::COLLECTION;
        let store = self.ctx.store();

        if !self.ctx.network().is_online() {
            return Loaded::fresh(store.collection(collection).await);
        }

        match self.ctx.remote().get_all(collection).await {
            Ok(entities) => {
                let mirror = entities.clone();
                store
                    .update(move |snapshot| *snapshot.collection_mut(collection) = mirror)
                    .await;
                Loaded::fresh(entities)
            }
            Err(e) => {
                tracing::error!(
                    collection = %collection,
                    error = %e,
                    "Failed to load collection, falling back to local snapshot"
                );
                Loaded {
                    entities: store.collection(collection).await,
                    error: Some(e),
                }
            }
        }
    }

    /// Create a record.
    ///
    /// Online, the remote assigns the id and the collection is refreshed.
    /// Offline, the record gets a provisional id, is prepended to the local
    /// slice and its payload is queued for replay.
    pub async fn create(&self, payload: Payload) -> SyncResult<Entity> {
        let collection = K::COLLECTION;
        let payload = strip_reserved(payload);

        if self.ctx.network().is_online() {
            let id = self
                .ctx
                .remote()
                .add(collection, payload.clone())
                .await
                .map_err(|e| {
                    tracing::error!(collection = %collection, error = %e, "Failed to create record");
                    e
                })?;

            let refreshed = self.list().await;
            let created = refreshed
                .entities
                .into_iter()
                .find(|entity| entity.id == id)
                .unwrap_or_else(|| Entity::new(id, Utc::now(), payload));
            return Ok(created);
        }

        let entity = Entity::provisional(payload.clone());
        let local = entity.clone();
        self.ctx
            .store()
            .update(move |snapshot| {
                let entry = PendingEntry::new(payload, Some(local.id.clone()));
                snapshot.collection_mut(collection).insert(0, local);
                snapshot.pending_sync.enqueue(collection, entry);
            })
            .await;

        tracing::info!(collection = %collection, id = %entity.id, "Created record offline, queued for sync");

        Ok(entity)
    }

    /// Delete a record. Provisional records are only dropped locally; their
    /// queued create stays in the backlog.
    pub async fn delete(&self, id: &EntityId) -> SyncResult<()> {
        let collection = K::COLLECTION;

        match id {
            EntityId::Remote(_) if self.ctx.network().is_online() => {
                self.ctx
                    .remote()
                    .delete(collection, id)
                    .await
                    .map_err(|e| {
                        tracing::error!(collection = %collection, id = %id, error = %e, "Failed to delete record");
                        e
                    })?;
                self.list().await;
            }
            EntityId::Remote(_) | EntityId::Local(_) => {
                let target = id.clone();
                let removed = self
                    .ctx
                    .store()
                    .update(move |snapshot| {
                        let entities = snapshot.collection_mut(collection);
                        let before = entities.len();
                        entities.retain(|entity| entity.id != target);
                        before != entities.len()
                    })
                    .await;

                tracing::debug!(collection = %collection, id = %id, removed, "Deleted record locally");
            }
        }

        Ok(())
    }
}

impl<K: Updatable> EntityFacade<K> {
    /// Patch a record.
    ///
    /// Applied locally when offline or when the id is provisional. The local
    /// merge never changes `createdAt` and keeps `date` unless the patch
    /// supplies one. Returns the record as it stands afterwards, or `None` if
    /// no such record is known.
    pub async fn update(&self, id: &EntityId, patch: Payload) -> SyncResult<Option<Entity>> {
        let collection = K::COLLECTION;

        match id {
            EntityId::Remote(_) if self.ctx.network().is_online() => {
                self.ctx
                    .remote()
                    .update(collection, id, patch)
                    .await
                    .map_err(|e| {
                        tracing::error!(collection = %collection, id = %id, error = %e, "Failed to update record");
                        e
                    })?;

                let refreshed = self.list().await;
                Ok(refreshed.entities.into_iter().find(|entity| entity.id == *id))
            }
            EntityId::Remote(_) | EntityId::Local(_) => {
                let target = id.clone();
                let updated = self
                    .ctx
                    .store()
                    .update(move |snapshot| {
                        let entity = snapshot
                            .collection_mut(collection)
                            .iter_mut()
                            .find(|entity| entity.id == target)?;
                        entity.apply_patch(patch);
                        Some(entity.clone())
                    })
                    .await;

                if updated.is_none() {
                    tracing::debug!(collection = %collection, id = %id, "No local record to update");
                }
                Ok(updated)
            }
        }
    }
}
