use crate::cli::Command;
use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use colored::*;
use fleet_sync::{
    Collection, Connectivity, EntityId, HttpRemote, InMemoryRemote, LocalDatabase, MemoryBackend,
    NoopBackgroundHook, Payload, SkipReason, SnapshotBackend, SyncEngine, SyncIndicator,
    SyncOutcome, SyncSignal,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::info;

/// Pick the façade for a runtime collection value
macro_rules! on_collection {
    ($engine:expr, $collection:expr, $facade:ident => $body:expr) => {
        match $collection {
            Collection::Responsibles => {
                let $facade = $engine.responsibles();
                $body
            }
            Collection::Vehicles => {
                let $facade = $engine.vehicles();
                $body
            }
            Collection::FuelRecords => {
                let $facade = $engine.fuel_records();
                $body
            }
        }
    };
}

/// Wire an engine from settings.
///
/// A dry run copies the persisted snapshot into memory and replays against
/// an in-process remote, leaving the local database untouched.
pub async fn build_engine(
    settings: &Settings,
    connectivity: Connectivity,
    dry_run: bool,
) -> Result<SyncEngine> {
    if !dry_run {
        let remote = HttpRemote::new(settings.remote.clone())?;
        let engine = SyncEngine::new(
            settings.local_db.clone(),
            settings.sync.clone(),
            Arc::new(remote),
            connectivity,
        )
        .await
        .with_context(|| format!("Failed to open {}", settings.local_db.db_path))?;
        return Ok(engine);
    }

    let key = &settings.sync.storage_key;
    let backend = MemoryBackend::new();

    let db = LocalDatabase::new(settings.local_db.clone()).await?;
    if let Some(raw) = db.load(key).await? {
        backend.put_raw(key, &raw);
    }
    db.close().await?;

    info!("Dry run: using an in-process remote and an in-memory copy of local data");

    Ok(SyncEngine::with_backend(
        Arc::new(backend),
        settings.sync.clone(),
        Arc::new(InMemoryRemote::new()),
        connectivity,
        Arc::new(NoopBackgroundHook),
    ))
}

pub async fn execute(engine: &SyncEngine, command: Command) -> Result<()> {
    match command {
        Command::Status => status(engine).await,
        Command::Sync => sync(engine).await,
        Command::List { collection } => list(engine, collection).await,
        Command::Add { collection, json } => add(engine, collection, &json).await,
        Command::UpdateFuel { id, json } => update_fuel(engine, &id, &json).await,
        Command::Delete { collection, id } => delete(engine, collection, &id).await,
        Command::Watch { interval } => watch(engine, Duration::from_secs(interval.max(1))).await,
    }
}

async fn status(engine: &SyncEngine) -> Result<()> {
    let indicator = engine.coordinator().indicator().await;
    print_indicator(&indicator);
    Ok(())
}

fn print_indicator(indicator: &SyncIndicator) {
    let connectivity = if indicator.online {
        "online".bright_green()
    } else {
        "offline".bright_yellow()
    };
    println!("{:<14} {}", "Connectivity:".bright_white(), connectivity);

    let state = if indicator.syncing { "syncing" } else { "idle" };
    println!("{:<14} {}", "Sync state:".bright_white(), state);

    let last_sync = indicator
        .last_sync
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    println!("{:<14} {}", "Last sync:".bright_white(), last_sync);

    if let Some(error) = &indicator.error {
        println!("{:<14} {}", "Error:".bright_white(), error.bright_red());
    }

    println!("{}", "Pending:".bright_white());
    for collection in Collection::REPLAY_ORDER {
        println!("  {:<14} {}", collection.as_str(), indicator.pending.get(collection));
    }
    println!("  {:<14} {}", "total", indicator.pending.total());

    if indicator.can_sync_now() {
        println!("{}", "Pending data can be synchronized now (fleetsync sync)".bright_cyan());
    } else if !indicator.visible() {
        println!("{}", "All data synchronized".bright_green());
    }
}

async fn sync(engine: &SyncEngine) -> Result<()> {
    match engine.coordinator().force_sync().await {
        SyncOutcome::Completed(report) => {
            println!(
                "{} submitted {}, failed {}, ids remapped {} in {:?}",
                "Sync completed:".bright_green(),
                report.submitted(),
                report.failed(),
                report.remapped_ids,
                report.duration
            );
            for (collection, counts) in &report.collections {
                println!(
                    "  {:<14} submitted {}, failed {}",
                    collection.as_str(),
                    counts.submitted,
                    counts.failed
                );
            }
            Ok(())
        }
        SyncOutcome::Skipped(SkipReason::Offline) => {
            println!("{}", "Offline, sync skipped".bright_yellow());
            Ok(())
        }
        SyncOutcome::Skipped(SkipReason::AlreadySyncing) => {
            println!("{}", "A sync is already in progress".bright_yellow());
            Ok(())
        }
        SyncOutcome::Aborted(reason) => bail!("Sync aborted, pending data kept: {}", reason),
    }
}

async fn list(engine: &SyncEngine, collection: Collection) -> Result<()> {
    let loaded = on_collection!(engine, collection, facade => facade.list().await);

    if let Some(error) = &loaded.error {
        println!(
            "{} {}",
            "Remote unavailable, showing local data:".bright_yellow(),
            error
        );
    }

    for entity in &loaded.entities {
        println!("{}", serde_json::to_string(entity)?);
    }
    println!("{} record(s)", loaded.entities.len());
    Ok(())
}

fn parse_payload(json: &str) -> Result<Payload> {
    serde_json::from_str(json).context("Expected a JSON object")
}

async fn add(engine: &SyncEngine, collection: Collection, json: &str) -> Result<()> {
    let payload = parse_payload(json)?;
    let entity = on_collection!(engine, collection, facade => facade.create(payload).await)?;

    if entity.id.is_provisional() {
        println!("{} {}", "Saved offline, queued for sync:".bright_yellow(), entity.id);
    } else {
        println!("{} {}", "Created:".bright_green(), entity.id);
    }
    Ok(())
}

async fn update_fuel(engine: &SyncEngine, id: &str, json: &str) -> Result<()> {
    let patch = parse_payload(json)?;
    let id = EntityId::from(id);

    match engine.fuel_records().update(&id, patch).await? {
        Some(entity) => println!("{}", serde_json::to_string_pretty(&entity)?),
        None => println!("{} {}", "No local fuel record with id".bright_yellow(), id),
    }
    Ok(())
}

async fn delete(engine: &SyncEngine, collection: Collection, id: &str) -> Result<()> {
    let id = EntityId::from(id);
    on_collection!(engine, collection, facade => facade.delete(&id).await)?;
    println!("{} {} {}", "Deleted".bright_green(), collection, id);
    Ok(())
}

async fn watch(engine: &SyncEngine, interval: Duration) -> Result<()> {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (signals, handle) = engine.spawn_coordinator(async move {
        let _ = stop_rx.await;
    });

    info!(interval_secs = interval.as_secs(), "Watching for pending data, Ctrl-C to stop");

    let mut ticker = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if signals.send(SyncSignal::BackgroundSync).await.is_err() {
                    break;
                }
            }
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Shutting down");
                break;
            }
        }
    }

    let _ = stop_tx.send(());
    handle.await.context("Coordinator task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_sync::LocalDbConfig;
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> Settings {
        Settings {
            local_db: LocalDbConfig {
                db_path: dir.path().join("ops.db").to_string_lossy().into_owned(),
                max_connections: 1,
                enable_wal: true,
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_offline_add_then_dry_run_sync_keeps_database() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);

        let engine = build_engine(&settings, Connectivity::Offline, false)
            .await
            .unwrap();
        execute(
            &engine,
            Command::Add {
                collection: Collection::Vehicles,
                json: r#"{"plate":"ABC-1234"}"#.to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(engine.coordinator().indicator().await.pending.vehicles, 1);

        let dry = build_engine(&settings, Connectivity::Online, true)
            .await
            .unwrap();
        assert_eq!(dry.coordinator().indicator().await.pending.vehicles, 1);
        execute(&dry, Command::Sync).await.unwrap();
        assert!(dry.coordinator().indicator().await.pending.is_empty());

        // The real store still holds the backlog
        assert_eq!(engine.coordinator().indicator().await.pending.vehicles, 1);
    }

    #[tokio::test]
    async fn test_add_rejects_non_object_json() {
        let dir = TempDir::new().unwrap();
        let engine = build_engine(&settings_in(&dir), Connectivity::Offline, true)
            .await
            .unwrap();

        let result = execute(
            &engine,
            Command::Add {
                collection: Collection::Responsibles,
                json: "[1, 2]".to_string(),
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_fuel_and_delete_offline() {
        let dir = TempDir::new().unwrap();
        let engine = build_engine(&settings_in(&dir), Connectivity::Offline, true)
            .await
            .unwrap();

        let created = engine
            .fuel_records()
            .create(parse_payload(r#"{"vehicleId":"v1","date":"2024-05-01"}"#).unwrap())
            .await
            .unwrap();

        execute(
            &engine,
            Command::UpdateFuel {
                id: created.id.to_string(),
                json: r#"{"observations":"refilled"}"#.to_string(),
            },
        )
        .await
        .unwrap();

        let local = engine.context().store().collection(Collection::FuelRecords).await;
        assert_eq!(local[0].field("observations").unwrap(), "refilled");

        execute(
            &engine,
            Command::Delete {
                collection: Collection::FuelRecords,
                id: created.id.to_string(),
            },
        )
        .await
        .unwrap();
        assert!(engine
            .context()
            .store()
            .collection(Collection::FuelRecords)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_sync_while_offline_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let engine = build_engine(&settings_in(&dir), Connectivity::Offline, true)
            .await
            .unwrap();

        execute(&engine, Command::Sync).await.unwrap();
        execute(&engine, Command::Status).await.unwrap();
    }
}
