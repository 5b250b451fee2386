//! Network state monitor
//!
//! Tracks the platform's binary connectivity signal. The monitor never
//! probes the network; whatever the platform reports is ground truth.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

/// Current connectivity plus a subscription for transitions
pub struct NetworkMonitor {
    state: watch::Sender<Connectivity>,
}

impl NetworkMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn connectivity(&self) -> Connectivity {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity().is_online()
    }

    /// Feed a platform connectivity signal. Returns whether the mode changed;
    /// subscribers are only notified on an actual transition.
    pub fn set_online(&self, online: bool) -> bool {
        let next = Connectivity::from_online(online);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if changed {
            match next {
                Connectivity::Online => tracing::info!("Connection restored"),
                Connectivity::Offline => tracing::info!("Connection lost, offline mode enabled"),
            }
        }

        changed
    }

    /// Receiver that wakes on every transition
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Online)
    }
}
