//! Sync coordinator
//!
//! Drains the pending-mutation queue against the remote service.
//!
//! Cycle flow:
//! 1. Guard: only while online, and never two cycles at once
//! 2. Drain: snapshot the backlog (nothing is removed yet)
//! 3. Replay: submit every entry, collection by collection in dependency
//!    order, isolating per-item failures
//! 4. Settle: remove the processed backlog, stamp the last-sync time
//!
//! A failure that concerns the link itself (remote unreachable, connectivity
//! lost mid-cycle) aborts the cycle and leaves the queue untouched, so the
//! next cycle retries the same backlog from the start.

use crate::config::QueueRetention;
use crate::context::SyncContext;
use crate::entity::{Collection, Payload};
use crate::error::{SyncError, SyncResult};
use crate::id::EntityId;
use crate::queue::PendingEntry;
use crate::status::{SyncIndicator, SyncReport, SyncState, SyncStatus, SYNC_ERROR_MESSAGE};
use crate::trigger::{BackgroundSyncHook, SyncSignal};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Why a sync request did not start a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadySyncing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    Skipped(SkipReason),
    /// The cycle was abandoned; the queue is unchanged
    Aborted(String),
}

/// Provisional id -> authoritative id, filled as creates are acknowledged
#[derive(Default)]
struct IdRemap {
    ids: HashMap<String, String>,
    rewritten: usize,
}

impl IdRemap {
    fn record(&mut self, local: &EntityId, remote: &EntityId) {
        self.ids
            .insert(local.as_str().to_string(), remote.as_str().to_string());
    }

    /// Replace top-level string fields that hold a remapped provisional id
    fn rewrite(&mut self, mut payload: Payload) -> Payload {
        for value in payload.values_mut() {
            if let Value::String(s) = value {
                if let Some(remote) = self.ids.get(s.as_str()) {
                    *s = remote.clone();
                    self.rewritten += 1;
                }
            }
        }
        payload
    }
}

/// Marks a cycle in flight; releases the guard even if the cycle is dropped
struct InFlight<'a> {
    flag: &'a AtomicBool,
    status: &'a RwLock<SyncStatus>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.status.write().state = SyncState::Idle;
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    ctx: Arc<SyncContext>,
    hook: Arc<dyn BackgroundSyncHook>,
    in_flight: AtomicBool,
    status: RwLock<SyncStatus>,
}

impl SyncCoordinator {
    pub fn new(ctx: Arc<SyncContext>, hook: Arc<dyn BackgroundSyncHook>) -> Self {
        Self {
            ctx,
            hook,
            in_flight: AtomicBool::new(false),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.read().clone()
    }

    /// Snapshot for the offline/sync banner
    pub async fn indicator(&self) -> SyncIndicator {
        let status = self.status();
        SyncIndicator {
            online: self.ctx.network().is_online(),
            syncing: status.is_syncing(),
            last_sync: status.last_sync,
            error: status.last_error,
            pending: self.ctx.queue().counts().await,
        }
    }

    /// Manual "sync now"
    pub async fn force_sync(&self) -> SyncOutcome {
        self.request_sync(SyncSignal::Manual).await
    }

    /// Run one cycle unless offline or a cycle is already in flight
    pub async fn request_sync(&self, signal: SyncSignal) -> SyncOutcome {
        if !self.ctx.network().is_online() {
            tracing::debug!(?signal, "Sync requested while offline, ignoring");
            return SyncOutcome::Skipped(SkipReason::Offline);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(?signal, "Sync already in progress, ignoring request");
            return SyncOutcome::Skipped(SkipReason::AlreadySyncing);
        }
        let _in_flight = InFlight {
            flag: &self.in_flight,
            status: &self.status,
        };

        {
            let mut status = self.status.write();
            status.state = SyncState::Syncing;
            status.last_error = None;
        }

        tracing::info!(?signal, "Starting sync cycle");
        let started = Instant::now();

        match self.run_cycle().await {
            Ok(mut report) => {
                report.duration = started.elapsed();
                self.status.write().last_sync = Some(Utc::now());

                tracing::info!(
                    submitted = report.submitted(),
                    failed = report.failed(),
                    remapped = report.remapped_ids,
                    duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
                    "Sync completed"
                );

                let tag = &self.ctx.config().background_sync_tag;
                if let Err(e) = self.hook.register(tag).await {
                    tracing::warn!(tag = %tag, error = %e, "Failed to register background sync");
                }

                SyncOutcome::Completed(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "Sync cycle aborted, queue kept for retry");
                self.status.write().last_error = Some(SYNC_ERROR_MESSAGE.to_string());
                SyncOutcome::Aborted(e.to_string())
            }
        }
    }

    async fn run_cycle(&self) -> SyncResult<SyncReport> {
        let config = self.ctx.config();
        let drained = self.ctx.queue().drain_all().await;

        let mut report = SyncReport::default();
        let mut remap = IdRemap::default();
        let mut settlements: Vec<(Collection, usize, Vec<PendingEntry>)> = Vec::new();

        for (collection, entries) in drained {
            let mut failed = Vec::new();

            for entry in &entries {
                if !self.ctx.network().is_online() {
                    return Err(SyncError::Offline);
                }

                let payload = if config.remap_foreign_ids {
                    remap.rewrite(entry.payload.clone())
                } else {
                    entry.payload.clone()
                };

                match self.ctx.remote().add(collection, payload.clone()).await {
                    Ok(id) => {
                        if let Some(local_id) = &entry.local_id {
                            remap.record(local_id, &id);
                        }
                        report.record_submitted(collection);
                        tracing::info!(collection = %collection, id = %id, "Synchronized record");
                    }
                    Err(e) if e.is_unreachable() => return Err(e),
                    Err(e) => {
                        tracing::error!(collection = %collection, error = %e, "Failed to synchronize record");
                        report.record_failed(collection);
                        // Retained with remapped ids; the remap table ends with the cycle
                        failed.push(PendingEntry::new(payload, entry.local_id.clone()));
                    }
                }
            }

            settlements.push((collection, entries.len(), failed));
        }

        let retention = config.queue_retention;
        self.ctx
            .store()
            .update(move |snapshot| {
                for (collection, processed, failed) in settlements {
                    let keep = match retention {
                        QueueRetention::DropFailed => Vec::new(),
                        QueueRetention::RetainFailed => failed,
                    };
                    snapshot.pending_sync.settle(collection, processed, keep);
                }
            })
            .await;

        report.remapped_ids = remap.rewritten;
        Ok(report)
    }

    /// Drive the coordinator from connectivity transitions and external
    /// signals until `shutdown` resolves. Each trigger runs in its own task;
    /// the in-flight guard drops triggers that arrive mid-cycle.
    pub async fn run<F>(self: Arc<Self>, mut signals: mpsc::Receiver<SyncSignal>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut connectivity = self.ctx.network().subscribe();
        tokio::pin!(shutdown);

        tracing::info!("Sync coordinator started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now = *connectivity.borrow_and_update();
                    if now.is_online() {
                        self.spawn_sync(SyncSignal::ConnectivityRegained);
                    }
                }
                Some(signal) = signals.recv() => self.spawn_sync(signal),
            }
        }

        tracing::info!("Sync coordinator stopped");
    }

    fn spawn_sync(self: &Arc<Self>, signal: SyncSignal) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.request_sync(signal).await;
        });
    }
}
