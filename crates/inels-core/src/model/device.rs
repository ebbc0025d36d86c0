// ── Device domain type ──
//
// A Device is owned by the state source (the MQTT layer). Entities hold an
// `Arc<Device>` and only ever read snapshots from it or hand it complete
// replacement snapshots to transmit.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entity_id::{DeviceId, MacAddress};
use super::snapshot::Snapshot;
use crate::error::{CoreError, LinkError};

/// Outbound half of the state source: encodes and publishes a snapshot.
///
/// Implementations may block (network I/O); callers on the async side go
/// through [`Device::submit`], which moves the call onto the blocking pool.
pub trait DeviceLink: Send + Sync {
    fn set_ha_value(&self, device: &Device, snapshot: &Snapshot) -> Result<(), LinkError>;
}

/// Current and previous decoded values, swapped as one unit.
#[derive(Debug, Clone, Default)]
pub struct DeviceValues {
    pub state: Snapshot,
    pub last_values: Snapshot,
    /// Bumped on every applied state push.
    pub generation: u64,
}

/// A physical device on the iNELS bus.
pub struct Device {
    id: DeviceId,
    mac: MacAddress,
    device_type: String,
    title: String,
    values: ArcSwap<DeviceValues>,
    gateway_connected: AtomicBool,
    connected: AtomicBool,
    link: Arc<dyn DeviceLink>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("mac", &self.mac)
            .field("device_type", &self.device_type)
            .field("title", &self.title)
            .field("generation", &self.values.load().generation)
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Create a connected device whose current and previous values are both `state`.
    pub fn new(
        id: impl Into<DeviceId>,
        mac: MacAddress,
        device_type: impl Into<String>,
        state: Snapshot,
        link: Arc<dyn DeviceLink>,
    ) -> Self {
        let id = id.into();
        let device_type = device_type.into();
        let title = format!("{device_type} {id}");
        Self {
            id,
            mac,
            device_type,
            title,
            values: ArcSwap::from_pointee(DeviceValues {
                last_values: state.clone(),
                state,
                generation: 0,
            }),
            gateway_connected: AtomicBool::new(true),
            connected: AtomicBool::new(true),
            link,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Replace the previous values, e.g. when restoring a recorded device.
    #[must_use]
    pub fn with_last_values(self, last_values: Snapshot) -> Self {
        let current = self.values.load_full();
        self.values.store(Arc::new(DeviceValues {
            state: current.state.clone(),
            last_values,
            generation: current.generation,
        }));
        self
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn mac(&self) -> &MacAddress {
        &self.mac
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Current and previous values, loaded together.
    pub fn values(&self) -> Arc<DeviceValues> {
        self.values.load_full()
    }

    /// Owned copy of the current snapshot, ready to be mutated for a command.
    pub fn state(&self) -> Snapshot {
        self.values.load().state.clone()
    }

    /// Owned copy of the previous snapshot.
    pub fn last_values(&self) -> Snapshot {
        self.values.load().last_values.clone()
    }

    pub fn generation(&self) -> u64 {
        self.values.load().generation
    }

    /// Apply a state push from the bus: current values become previous.
    pub fn apply_state(&self, state: Snapshot) {
        self.values.rcu(|old| DeviceValues {
            last_values: old.state.clone(),
            state: state.clone(),
            generation: old.generation + 1,
        });
    }

    // ── Availability ─────────────────────────────────────────────────

    pub fn set_gateway_connected(&self, connected: bool) {
        self.gateway_connected.store(connected, Ordering::Release);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.gateway_connected.load(Ordering::Acquire)
            && self.connected.load(Ordering::Acquire)
            && self.values.load().state.in_range
    }

    // ── Write path ───────────────────────────────────────────────────

    /// Blocking submission of a full snapshot through the device link.
    pub fn set_ha_value(&self, snapshot: &Snapshot) -> Result<(), LinkError> {
        self.link.set_ha_value(self, snapshot)
    }

    /// Submit a full snapshot from async code without blocking the runtime.
    pub async fn submit(self: &Arc<Self>, snapshot: Snapshot) -> Result<(), CoreError> {
        debug!(device = %self.id, "submitting snapshot");
        let device = Arc::clone(self);
        tokio::task::spawn_blocking(move || device.set_ha_value(&snapshot))
            .await
            .map_err(|e| CoreError::Internal(format!("device write task failed: {e}")))??;
        Ok(())
    }
}

// ── Recorded devices ────────────────────────────────────────────────

/// Serialized device as captured from a live bus, used for dry runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub mac: MacAddress,
    pub device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub state: Snapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_values: Option<Snapshot>,
    #[serde(default = "connected_default")]
    pub gateway_connected: bool,
    #[serde(default = "connected_default")]
    pub connected: bool,
}

fn connected_default() -> bool {
    true
}

impl DeviceRecord {
    pub fn into_device(self, link: Arc<dyn DeviceLink>) -> Device {
        let mut device = Device::new(self.id, self.mac, self.device_type, self.state, link);
        if let Some(title) = self.title {
            device = device.with_title(title);
        }
        if let Some(last) = self.last_values {
            device = device.with_last_values(last);
        }
        device.set_gateway_connected(self.gateway_connected);
        device.set_connected(self.connected);
        device
    }
}
