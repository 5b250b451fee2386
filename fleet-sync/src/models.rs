//! Typed payloads for the three collections
//!
//! The engine itself treats collection fields as opaque JSON; these models
//! are for callers that want typed access.

use crate::entity::{to_payload, Payload};
use crate::error::SyncResult;
use serde::{Deserialize, Serialize};

/// Person responsible for a refueling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiblePayload {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePayload {
    pub plate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Daily refueling record for one vehicle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelRecordPayload {
    pub vehicle_id: String,
    pub responsible_id: String,
    /// Business date of the record, `YYYY-MM-DD`
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_km: Option<f64>,
    #[serde(default)]
    pub fuel_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diesel_daily_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diesel_daily_end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diesel_total_refueled: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diesel_pump_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arla_daily_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arla_daily_end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arla_total_refueled: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arla_pump_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_panel: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ResponsiblePayload {
    pub fn to_payload(&self) -> SyncResult<Payload> {
        to_payload(self)
    }
}

impl VehiclePayload {
    pub fn to_payload(&self) -> SyncResult<Payload> {
        to_payload(self)
    }
}

impl FuelRecordPayload {
    pub fn to_payload(&self) -> SyncResult<Payload> {
        to_payload(self)
    }
}
