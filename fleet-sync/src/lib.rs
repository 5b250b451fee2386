//! Offline-first synchronization engine for the fleet fuel tracker
//!
//! Provides:
//! - A durable local mirror of responsibles, vehicles and fuel records
//! - A pending-mutation queue for creates made while offline
//! - Per-collection façades that route between remote and local storage
//! - A sync coordinator that replays the queue once connectivity returns

pub mod config;
pub mod context;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod facade;
pub mod id;
pub mod local_db;
pub mod models;
pub mod network;
pub mod queue;
pub mod remote;
pub mod status;
pub mod store;
pub mod trigger;

pub use config::{QueueRetention, SyncConfig};
pub use context::SyncContext;
pub use coordinator::{SkipReason, SyncCoordinator, SyncOutcome};
pub use entity::{Collection, Entity, Payload};
pub use error::{SyncError, SyncResult};
pub use facade::{FuelRecordFacade, Loaded, ResponsibleFacade, VehicleFacade};
pub use id::EntityId;
pub use local_db::{LocalDatabase, LocalDbConfig};
pub use models::{FuelRecordPayload, ResponsiblePayload, VehiclePayload};
pub use network::{Connectivity, NetworkMonitor};
pub use queue::{PendingCounts, PendingEntry};
pub use remote::{HttpRemote, HttpRemoteConfig, InMemoryRemote, RemoteService};
pub use status::{SyncIndicator, SyncReport, SyncState, SyncStatus};
pub use store::{LocalStore, MemoryBackend, OfflineSnapshot, SnapshotBackend};
pub use trigger::{BackgroundSyncHook, NoopBackgroundHook, SyncSignal};

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sync engine for offline-first operations
pub struct SyncEngine {
    ctx: Arc<SyncContext>,
    coordinator: Arc<SyncCoordinator>,
}

impl SyncEngine {
    /// Create an engine over a SQLite-backed local store
    pub async fn new(
        db_config: LocalDbConfig,
        config: SyncConfig,
        remote: Arc<dyn RemoteService>,
        connectivity: Connectivity,
    ) -> SyncResult<Self> {
        let local_db = LocalDatabase::new(db_config).await?;

        Ok(Self::with_backend(
            Arc::new(local_db),
            config,
            remote,
            connectivity,
            Arc::new(NoopBackgroundHook),
        ))
    }

    /// Create an engine over any snapshot backend
    pub fn with_backend(
        backend: Arc<dyn SnapshotBackend>,
        config: SyncConfig,
        remote: Arc<dyn RemoteService>,
        connectivity: Connectivity,
        hook: Arc<dyn BackgroundSyncHook>,
    ) -> Self {
        let ctx = Arc::new(SyncContext::new(
            remote,
            backend,
            NetworkMonitor::new(connectivity),
            config,
        ));
        let coordinator = Arc::new(SyncCoordinator::new(ctx.clone(), hook));

        Self { ctx, coordinator }
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    pub fn network(&self) -> &NetworkMonitor {
        self.ctx.network()
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn responsibles(&self) -> ResponsibleFacade {
        ResponsibleFacade::new(self.ctx.clone())
    }

    pub fn vehicles(&self) -> VehicleFacade {
        VehicleFacade::new(self.ctx.clone())
    }

    pub fn fuel_records(&self) -> FuelRecordFacade {
        FuelRecordFacade::new(self.ctx.clone())
    }

    /// Start the coordinator loop. Returns the sender for external sync
    /// signals and the loop's task handle.
    pub fn spawn_coordinator<F>(&self, shutdown: F) -> (mpsc::Sender<SyncSignal>, JoinHandle<()>)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(self.coordinator.clone().run(rx, shutdown));
        (tx, handle)
    }
}
