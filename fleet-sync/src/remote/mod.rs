//! Remote data service interface
//!
//! The remote service is authoritative and reachable only while online.
//! Every call may fail; the engine only distinguishes "unreachable" from
//! "rejected" (see [`SyncError::is_unreachable`]).
//!
//! [`SyncError::is_unreachable`]: crate::error::SyncError::is_unreachable

pub mod http;
pub mod memory;

pub use http::{HttpRemote, HttpRemoteConfig};
pub use memory::{InMemoryRemote, RemoteCall};

use crate::entity::{Collection, Entity, Payload};
use crate::error::SyncResult;
use crate::id::EntityId;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Full current contents of a collection
    async fn get_all(&self, collection: Collection) -> SyncResult<Vec<Entity>>;

    /// Create a record, returning its authoritative id
    async fn add(&self, collection: Collection, payload: Payload) -> SyncResult<EntityId>;

    async fn update(&self, collection: Collection, id: &EntityId, patch: Payload) -> SyncResult<()>;

    async fn delete(&self, collection: Collection, id: &EntityId) -> SyncResult<()>;
}
