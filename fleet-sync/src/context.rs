//! Shared engine context
//!
//! Connectivity, the local store and the remote service are owned by one
//! context object handed to every façade and to the coordinator, so
//! independent engines can coexist in one process.

use crate::config::SyncConfig;
use crate::network::NetworkMonitor;
use crate::queue::PendingQueue;
use crate::remote::RemoteService;
use crate::store::{LocalStore, SnapshotBackend};
use std::sync::Arc;

pub struct SyncContext {
    network: NetworkMonitor,
    store: LocalStore,
    remote: Arc<dyn RemoteService>,
    config: SyncConfig,
}

impl SyncContext {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        backend: Arc<dyn SnapshotBackend>,
        network: NetworkMonitor,
        config: SyncConfig,
    ) -> Self {
        let store = LocalStore::new(backend, config.storage_key.clone());

        Self {
            network,
            store,
            remote,
            config,
        }
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn queue(&self) -> PendingQueue<'_> {
        PendingQueue::new(&self.store)
    }

    pub fn remote(&self) -> &dyn RemoteService {
        self.remote.as_ref()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}
