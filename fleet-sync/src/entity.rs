//! Collections and the collection-agnostic entity shape

use crate::error::{SyncError, SyncResult};
use crate::id::EntityId;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque collection-specific fields of an entity, or a create/patch body
pub type Payload = serde_json::Map<String, Value>;

/// Keys owned by the engine rather than by the collection payload.
/// `localId` tags queued creates and shares their JSON object.
const RESERVED_KEYS: [&str; 3] = ["id", "createdAt", "localId"];

/// Field that a local patch only overrides when a value is supplied
const DATE_FIELD: &str = "date";

/// The three collections the engine mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Responsibles,
    Vehicles,
    FuelRecords,
}

impl Collection {
    /// Replay order: later collections reference earlier ones by id
    pub const REPLAY_ORDER: [Collection; 3] = [
        Collection::Responsibles,
        Collection::Vehicles,
        Collection::FuelRecords,
    ];

    /// Key used in the persisted snapshot
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Responsibles => "responsibles",
            Collection::Vehicles => "vehicles",
            Collection::FuelRecords => "fuelRecords",
        }
    }

    /// URL path segment on the remote service
    pub fn path_segment(&self) -> &'static str {
        match self {
            Collection::Responsibles => "responsibles",
            Collection::Vehicles => "vehicles",
            Collection::FuelRecords => "fuel-records",
        }
    }

    pub fn parse(s: &str) -> SyncResult<Self> {
        match s {
            "responsibles" | "responsible" => Ok(Collection::Responsibles),
            "vehicles" | "vehicle" => Ok(Collection::Vehicles),
            "fuelRecords" | "fuel-records" | "fuel_records" | "fuel-record" => {
                Ok(Collection::FuelRecords)
            }
            _ => Err(SyncError::InvalidOperation(format!("Unknown collection: {}", s))),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record of any collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    /// Set once at creation and never overwritten by patches
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Payload,
}

impl Entity {
    pub fn new(id: EntityId, created_at: DateTime<Utc>, fields: Payload) -> Self {
        Self {
            id,
            created_at,
            fields: strip_reserved(fields),
        }
    }

    /// Entity created while offline: provisional id, local timestamp
    pub fn provisional(fields: Payload) -> Self {
        Self::new(EntityId::provisional(), Utc::now(), fields)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Decode the collection-specific fields into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> SyncResult<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Apply a partial update in place.
    ///
    /// Engine-owned keys are never touched. `date` is kept unless the
    /// patch carries a non-empty value for it.
    pub fn apply_patch(&mut self, patch: Payload) {
        for (key, value) in patch {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if key == DATE_FIELD && is_blank(&value) {
                continue;
            }
            self.fields.insert(key, value);
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Remove engine-owned keys from a payload
pub fn strip_reserved(mut fields: Payload) -> Payload {
    for key in RESERVED_KEYS {
        fields.remove(key);
    }
    fields
}

/// Serialize a typed model into a payload object
pub fn to_payload<T: Serialize>(value: &T) -> SyncResult<Payload> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(strip_reserved(map)),
        other => Err(SyncError::Serialization(format!(
            "Payload must be a JSON object, got {}",
            other
        ))),
    }
}
