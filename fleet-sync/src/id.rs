//! Entity identifiers
//!
//! Two id spaces coexist in the local mirror:
//! - Remote ids, assigned by the authoritative data service
//! - Local (provisional) ids, assigned while offline and never sent back
//!   to the remote service as a reference to an existing record
//!
//! On the wire both are plain strings; provisional ids carry a reserved
//! prefix so a persisted snapshot can be parsed back into the right variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Reserved prefix of provisional identifiers
pub const PROVISIONAL_PREFIX: &str = "offline_";

/// Identifier of an entity within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityId {
    /// Assigned locally while offline, not yet known to the remote service
    Local(String),
    /// Assigned by the remote service
    Remote(String),
}

impl EntityId {
    /// Generate a fresh provisional id
    pub fn provisional() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        EntityId::Local(format!(
            "{}{}_{}",
            PROVISIONAL_PREFIX,
            millis,
            Uuid::new_v4().simple()
        ))
    }

    /// Wrap an id handed out by the remote service
    pub fn remote(id: impl Into<String>) -> Self {
        EntityId::Remote(id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntityId::Local(id) | EntityId::Remote(id) => id,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, EntityId::Local(_))
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        if id.starts_with(PROVISIONAL_PREFIX) {
            EntityId::Local(id)
        } else {
            EntityId::Remote(id)
        }
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::from(id.to_string())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        match id {
            EntityId::Local(id) | EntityId::Remote(id) => id,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
