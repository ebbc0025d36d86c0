// ── Session lifecycle ──
//
// One session per config entry: connect and test the broker, discover
// devices, project them into platform entities, register everything and
// prune what a previous session left behind. Unload releases the broker;
// reload is unload followed by a fresh setup.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::broker::{Broker, BrokerConnector, run_blocking};
use crate::config::{ConfigEntry, ConfigEntryData};
use crate::error::CoreError;
use crate::model::{Device, DeviceId, Snapshot};
use crate::platform::{self, Platform, PlatformEntity};
use crate::store::{OldEntityLedger, ReconcileReport, Registries, remove_stale};

/// A running config entry.
pub struct Session {
    entry: ConfigEntry,
    connector: Arc<dyn BrokerConnector>,
    registries: Arc<Registries>,
    broker: Arc<dyn Broker>,
    devices: Vec<Arc<Device>>,
    entities: Vec<PlatformEntity>,
    reconcile: ReconcileReport,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("entry_id", &self.entry.entry_id)
            .field("devices", &self.devices.len())
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Bring a config entry up.
    ///
    /// Fails with [`CoreError::NotConfigured`] when the entry has no host and
    /// with [`CoreError::NotReady`] when the broker cannot be reached or
    /// discovery fails; the host is expected to retry the latter.
    pub async fn setup(
        entry: ConfigEntry,
        connector: Arc<dyn BrokerConnector>,
        registries: Arc<Registries>,
    ) -> Result<Self, CoreError> {
        let Some(config) = entry.data.broker_config() else {
            error!(entry_id = %entry.entry_id, "MQTT broker is not configured");
            return Err(CoreError::NotConfigured {
                message: "no broker host set".into(),
            });
        };

        // ── Connect ──────────────────────────────────────────────────
        let host = config.host.clone();
        let conn = Arc::clone(&connector);
        let broker = run_blocking(move || conn.connect(&config))
            .await?
            .map_err(|e| CoreError::NotReady {
                message: format!("cannot connect to {host}: {e}"),
            })?;

        let tester = Arc::clone(&broker);
        if let Err(code) = run_blocking(move || tester.test_connection()).await? {
            warn!(host = %host, error = %code, "broker connection test failed");
            let closing = Arc::clone(&broker);
            run_blocking(move || closing.close()).await?;
            return Err(CoreError::NotReady {
                message: format!("connection test against {host} failed: {code}"),
            });
        }

        // ── Discover ─────────────────────────────────────────────────
        let disc = Arc::clone(&broker);
        let devices = match run_blocking(move || disc.discover()).await? {
            Ok(devices) => devices,
            Err(e) => {
                let closing = Arc::clone(&broker);
                run_blocking(move || closing.close()).await?;
                return Err(CoreError::NotReady {
                    message: format!("discovery failed: {e}"),
                });
            }
        };
        info!(devices = devices.len(), "finished discovery, setting up platforms");

        // ── Platforms ────────────────────────────────────────────────
        let mut ledger = OldEntityLedger::capture(&registries.entities, &entry.entry_id);
        let mut entities = Vec::new();
        for platform in Platform::SETUP_ORDER {
            let produced = platform::discover(platform, &devices);
            for entity in &produced {
                let entity = entity.as_entity();
                let device_id = registries
                    .devices
                    .register(&entry.entry_id, entity.base().device());
                registries
                    .entities
                    .register(&entry.entry_id, Some(device_id), entity);
            }
            ledger.consume(platform, produced.iter().map(|e| e.as_entity().entity_id()));
            entities.extend(produced);
        }
        info!(entities = entities.len(), "platform setup complete");

        // ── Reconcile ────────────────────────────────────────────────
        info!("cleaning up entities/devices");
        let reconcile = remove_stale(ledger, &registries, &entry.entry_id);

        Ok(Self {
            entry,
            connector,
            registries,
            broker,
            devices,
            entities,
            reconcile,
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn entry(&self) -> &ConfigEntry {
        &self.entry
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn entities(&self) -> &[PlatformEntity] {
        &self.entities
    }

    pub fn entities_for(&self, platform: Platform) -> impl Iterator<Item = &PlatformEntity> {
        self.entities
            .iter()
            .filter(move |e| e.platform() == platform)
    }

    pub fn entity(&self, entity_id: &str) -> Option<&PlatformEntity> {
        self.entities
            .iter()
            .find(|e| e.as_entity().entity_id() == entity_id)
    }

    /// Deliver a decoded state push to a device and let its entities react
    /// (fault warnings, button presses). Returns `false` for unknown devices.
    pub fn push_state(&self, device_id: &DeviceId, state: Snapshot) -> bool {
        let Some(device) = self.devices.iter().find(|d| d.id() == device_id) else {
            debug!(device_id = %device_id, "state push for unknown device");
            return false;
        };
        device.apply_state(state);
        for entity in &self.entities {
            let entity = entity.as_entity();
            if Arc::ptr_eq(entity.base().device(), device) {
                entity.refresh();
            }
        }
        true
    }

    /// What setup pruned from the registries.
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.reconcile
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Unsubscribe listeners and disconnect the broker.
    pub async fn unload(self) -> Result<(), CoreError> {
        self.release().await?;
        info!(entry_id = %self.entry.entry_id, "session unloaded");
        Ok(())
    }

    /// Unload and set the same entry up again.
    pub async fn reload(self) -> Result<Self, CoreError> {
        self.release().await?;
        Self::setup(self.entry, self.connector, self.registries).await
    }

    /// Apply new options: the running broker is disconnected and the
    /// session comes back up with the new data.
    pub async fn update_entry(self, data: ConfigEntryData) -> Result<Self, CoreError> {
        let broker = Arc::clone(&self.broker);
        run_blocking(move || broker.disconnect()).await?;

        let mut entry = self.entry.clone();
        entry.data = data;
        self.release().await?;
        Self::setup(entry, self.connector, self.registries).await
    }

    async fn release(&self) -> Result<(), CoreError> {
        let broker = Arc::clone(&self.broker);
        run_blocking(move || {
            broker.unsubscribe_listeners();
            broker.disconnect();
        })
        .await
    }
}
