use fleet_sync::{
    Collection, Connectivity, Entity, InMemoryRemote, LocalDbConfig, MemoryBackend,
    NoopBackgroundHook, Payload, QueueRetention, SkipReason, SyncConfig, SyncEngine, SyncOutcome,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

fn engine_with(
    remote: &Arc<InMemoryRemote>,
    connectivity: Connectivity,
    config: SyncConfig,
) -> SyncEngine {
    SyncEngine::with_backend(
        Arc::new(MemoryBackend::new()),
        config,
        remote.clone(),
        connectivity,
        Arc::new(NoopBackgroundHook),
    )
}

fn offline_engine(remote: &Arc<InMemoryRemote>) -> SyncEngine {
    engine_with(remote, Connectivity::Offline, SyncConfig::default())
}

async fn local(engine: &SyncEngine, collection: Collection) -> Vec<Entity> {
    engine.context().store().collection(collection).await
}

async fn wait_until_drained(engine: &SyncEngine) {
    for _ in 0..200 {
        let indicator = engine.coordinator().indicator().await;
        if indicator.pending.is_empty() && !indicator.syncing {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("queue was not drained");
}

fn completed(outcome: SyncOutcome) -> fleet_sync::SyncReport {
    match outcome {
        SyncOutcome::Completed(report) => report,
        other => panic!("expected a completed cycle, got {:?}", other),
    }
}

#[tokio::test]
async fn offline_vehicle_is_synchronized_on_reconnect() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let (_signals, handle) = engine.spawn_coordinator(async move {
        let _ = stop_rx.await;
    });
    // Let the loop subscribe to connectivity before anything changes
    tokio::time::sleep(Duration::from_millis(20)).await;

    let created = engine
        .vehicles()
        .create(payload(json!({"plate": "ABC-1234"})))
        .await
        .unwrap();
    assert!(created.id.is_provisional());
    assert!(created.id.as_str().starts_with("offline_"));

    assert_eq!(local(&engine, Collection::Vehicles).await.len(), 1);
    assert_eq!(engine.coordinator().indicator().await.pending.vehicles, 1);
    assert!(remote.calls().is_empty());

    engine.network().set_online(true);
    wait_until_drained(&engine).await;

    let adds = remote.add_calls(Collection::Vehicles);
    assert_eq!(adds, vec![payload(json!({"plate": "ABC-1234"}))]);
    assert!(engine.coordinator().status().last_sync.is_some());

    let loaded = engine.vehicles().list().await;
    assert!(!loaded.is_fallback());
    assert_eq!(loaded.entities.len(), 1);
    assert!(!loaded.entities[0].id.is_provisional());
    assert_eq!(loaded.entities[0].field("plate"), Some(&json!("ABC-1234")));

    stop_tx.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn repeated_online_list_is_idempotent() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.seed(Collection::Responsibles, payload(json!({"name": "Ana"})));
    remote.seed(Collection::Responsibles, payload(json!({"name": "Bruno"})));
    let engine = engine_with(&remote, Connectivity::Online, SyncConfig::default());

    engine.responsibles().list().await;
    let first = serde_json::to_string(&local(&engine, Collection::Responsibles).await).unwrap();
    engine.responsibles().list().await;
    let second = serde_json::to_string(&local(&engine, Collection::Responsibles).await).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn offline_creates_carry_provisional_ids_and_queue_entries() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);

    let inputs = [
        (Collection::Responsibles, json!({"name": "Ana"})),
        (Collection::Vehicles, json!({"plate": "XYZ-9876", "model": "Axor"})),
        (
            Collection::FuelRecords,
            json!({"vehicleId": "rem-000001", "date": "2024-05-01", "dieselLiters": 120.5}),
        ),
    ];

    for (collection, fields) in &inputs {
        let fields = payload(fields.clone());
        let entity = match collection {
            Collection::Responsibles => engine.responsibles().create(fields).await,
            Collection::Vehicles => engine.vehicles().create(fields).await,
            Collection::FuelRecords => engine.fuel_records().create(fields).await,
        }
        .unwrap();
        assert!(entity.id.is_provisional());
    }

    let snapshot = engine.context().store().read().await;
    for (collection, fields) in inputs {
        let stored = &snapshot.collection(collection)[0];
        let queued = snapshot.pending_sync.entries(collection);

        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].payload, payload(fields));
        assert_eq!(queued[0].local_id.as_ref(), Some(&stored.id));
        assert!(!queued[0].payload.contains_key("id"));
        assert!(!queued[0].payload.contains_key("createdAt"));
    }
}

#[tokio::test]
async fn drained_backlog_appears_as_authoritative_entities() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);

    for plate in ["AAA-0001", "AAA-0002", "AAA-0003"] {
        engine
            .vehicles()
            .create(payload(json!({ "plate": plate })))
            .await
            .unwrap();
    }

    engine.network().set_online(true);
    let report = completed(engine.coordinator().force_sync().await);
    assert_eq!(report.submitted(), 3);
    assert_eq!(engine.coordinator().indicator().await.pending.total(), 0);

    let loaded = engine.vehicles().list().await;
    assert_eq!(loaded.entities.len(), 3);
    assert!(loaded.entities.iter().all(|e| !e.id.is_provisional()));
}

#[tokio::test]
async fn one_rejected_item_does_not_block_its_neighbours() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.reject_adds_where("observations", json!("bad"));
    let engine = offline_engine(&remote);

    for note in ["first", "bad", "third"] {
        engine
            .fuel_records()
            .create(payload(json!({"vehicleId": "rem-000001", "observations": note})))
            .await
            .unwrap();
    }

    engine.network().set_online(true);
    let report = completed(engine.coordinator().force_sync().await);

    assert_eq!(report.submitted(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(remote.add_calls(Collection::FuelRecords).len(), 3);
    assert_eq!(remote.records(Collection::FuelRecords).len(), 2);
    // Default retention drops the rejected item
    assert!(engine.coordinator().indicator().await.pending.is_empty());
}

#[tokio::test]
async fn retain_failed_keeps_rejected_item_for_next_cycle() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.reject_adds_where("plate", json!("BAD-0000"));
    let config = SyncConfig {
        queue_retention: QueueRetention::RetainFailed,
        ..Default::default()
    };
    let engine = engine_with(&remote, Connectivity::Offline, config);

    for plate in ["GOOD-001", "BAD-0000"] {
        engine
            .vehicles()
            .create(payload(json!({ "plate": plate })))
            .await
            .unwrap();
    }

    engine.network().set_online(true);
    completed(engine.coordinator().force_sync().await);

    let queued = engine.context().store().read().await.pending_sync;
    assert_eq!(queued.entries(Collection::Vehicles).len(), 1);
    assert_eq!(
        queued.entries(Collection::Vehicles)[0].payload.get("plate"),
        Some(&json!("BAD-0000"))
    );
}

#[tokio::test]
async fn concurrent_requests_submit_once() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.set_latency(Duration::from_millis(50));
    let engine = offline_engine(&remote);

    engine
        .vehicles()
        .create(payload(json!({"plate": "ABC-1234"})))
        .await
        .unwrap();
    engine.network().set_online(true);

    let coordinator = engine.coordinator();
    let (first, second) = tokio::join!(coordinator.force_sync(), coordinator.force_sync());

    assert!(matches!(first, SyncOutcome::Completed(_)));
    assert_eq!(second, SyncOutcome::Skipped(SkipReason::AlreadySyncing));
    assert_eq!(remote.add_calls(Collection::Vehicles).len(), 1);
}

#[tokio::test]
async fn offline_fuel_update_preserves_immutable_fields() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);
    let records = engine.fuel_records();

    let created = records
        .create(payload(json!({"vehicleId": "rem-000001", "date": "2024-05-01"})))
        .await
        .unwrap();

    let updated = records
        .update(
            &created.id,
            payload(json!({"dieselLiters": 80, "createdAt": "1999-01-01T00:00:00Z"})),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.field("date"), Some(&json!("2024-05-01")));
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.field("dieselLiters"), Some(&json!(80)));

    let blank = records
        .update(&created.id, payload(json!({"date": ""})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(blank.field("date"), Some(&json!("2024-05-01")));

    let redated = records
        .update(&created.id, payload(json!({"date": "2024-05-02"})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(redated.field("date"), Some(&json!("2024-05-02")));
    assert_eq!(redated.created_at, created.created_at);
}

#[tokio::test]
async fn provisional_foreign_ids_are_remapped_during_replay() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);

    let driver = engine
        .responsibles()
        .create(payload(json!({"name": "Ana"})))
        .await
        .unwrap();
    let truck = engine
        .vehicles()
        .create(payload(json!({"plate": "ABC-1234"})))
        .await
        .unwrap();
    engine
        .fuel_records()
        .create(payload(json!({
            "vehicleId": truck.id.as_str(),
            "responsibleId": driver.id.as_str(),
            "date": "2024-05-01"
        })))
        .await
        .unwrap();

    engine.network().set_online(true);
    let report = completed(engine.coordinator().force_sync().await);
    assert_eq!(report.remapped_ids, 2);

    let remote_driver = &remote.records(Collection::Responsibles)[0];
    let remote_truck = &remote.records(Collection::Vehicles)[0];
    let fuel = &remote.records(Collection::FuelRecords)[0];

    assert_eq!(fuel.field("vehicleId"), Some(&json!(remote_truck.id.as_str())));
    assert_eq!(fuel.field("responsibleId"), Some(&json!(remote_driver.id.as_str())));
    assert!(!fuel.fields.contains_key("localId"));
}

#[tokio::test]
async fn unreachable_remote_aborts_and_keeps_backlog() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);

    engine
        .vehicles()
        .create(payload(json!({"plate": "ABC-1234"})))
        .await
        .unwrap();

    engine.network().set_online(true);
    remote.set_unreachable(true);

    let outcome = engine.coordinator().force_sync().await;
    assert!(matches!(outcome, SyncOutcome::Aborted(_)));

    let indicator = engine.coordinator().indicator().await;
    assert_eq!(indicator.pending.vehicles, 1);
    assert!(indicator.error.is_some());
    assert!(indicator.visible());
    assert!(indicator.can_sync_now());

    remote.set_unreachable(false);
    completed(engine.coordinator().force_sync().await);

    let indicator = engine.coordinator().indicator().await;
    assert!(indicator.error.is_none());
    assert!(!indicator.visible());
}

#[tokio::test]
async fn offline_sync_request_is_ignored() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);

    engine
        .vehicles()
        .create(payload(json!({"plate": "ABC-1234"})))
        .await
        .unwrap();

    assert_eq!(
        engine.coordinator().force_sync().await,
        SyncOutcome::Skipped(SkipReason::Offline)
    );
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn sqlite_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db_config = LocalDbConfig {
        db_path: dir.path().join("fleet.db").to_string_lossy().into_owned(),
        max_connections: 1,
        enable_wal: true,
    };
    let remote = Arc::new(InMemoryRemote::new());

    {
        let engine = SyncEngine::new(
            db_config.clone(),
            SyncConfig::default(),
            remote.clone(),
            Connectivity::Offline,
        )
        .await
        .unwrap();
        engine
            .vehicles()
            .create(payload(json!({"plate": "ABC-1234"})))
            .await
            .unwrap();
    }

    let engine = SyncEngine::new(
        db_config,
        SyncConfig::default(),
        remote.clone(),
        Connectivity::Online,
    )
    .await
    .unwrap();

    assert_eq!(local(&engine, Collection::Vehicles).await.len(), 1);
    assert_eq!(engine.coordinator().indicator().await.pending.vehicles, 1);

    completed(engine.coordinator().force_sync().await);
    assert_eq!(remote.records(Collection::Vehicles).len(), 1);
}

#[tokio::test]
async fn payload_local_id_field_does_not_corrupt_the_snapshot() {
    let remote = Arc::new(InMemoryRemote::new());
    let engine = offline_engine(&remote);

    engine
        .vehicles()
        .create(payload(json!({"plate": "AAA-0001"})))
        .await
        .unwrap();
    let second = engine
        .vehicles()
        .create(payload(json!({"plate": "BBB-0002", "localId": 7})))
        .await
        .unwrap();

    let snapshot = engine.context().store().read().await;
    assert_eq!(snapshot.vehicles.len(), 2);

    let queued = snapshot.pending_sync.entries(Collection::Vehicles);
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[1].local_id.as_ref(), Some(&second.id));
    assert_eq!(queued[1].payload, payload(json!({"plate": "BBB-0002"})));

    engine.network().set_online(true);
    completed(engine.coordinator().force_sync().await);
    assert_eq!(remote.records(Collection::Vehicles).len(), 2);
}

#[tokio::test]
async fn retried_fuel_record_uses_the_confirmed_vehicle_id() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.reject_adds_where("observations", json!("retry"));
    let config = SyncConfig {
        queue_retention: QueueRetention::RetainFailed,
        ..Default::default()
    };
    let engine = engine_with(&remote, Connectivity::Offline, config);

    let truck = engine
        .vehicles()
        .create(payload(json!({"plate": "ABC-1234"})))
        .await
        .unwrap();
    engine
        .fuel_records()
        .create(payload(json!({
            "vehicleId": truck.id.as_str(),
            "date": "2024-05-01",
            "observations": "retry"
        })))
        .await
        .unwrap();

    engine.network().set_online(true);
    let first = completed(engine.coordinator().force_sync().await);
    assert_eq!(first.failed(), 1);

    remote.clear_rejections();
    let second = completed(engine.coordinator().force_sync().await);
    assert_eq!(second.submitted(), 1);

    let remote_truck = remote.records(Collection::Vehicles)[0].id.clone();
    for attempt in remote.add_calls(Collection::FuelRecords) {
        assert_eq!(attempt.get("vehicleId"), Some(&json!(remote_truck.as_str())));
    }
    assert!(engine.coordinator().indicator().await.pending.is_empty());
}
