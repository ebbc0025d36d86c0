// ── Entity and device registries ──
//
// Persistent bookkeeping of which entities and devices a config entry has
// registered. Outlives sessions: a reload sees what the previous session
// left behind.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collection::Collection;
use crate::model::{Device, DeviceId, MacAddress};
use crate::platform::{Entity, Platform};

pub const MANUFACTURER: &str = "ELKO EP";

// ── Entity registry ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEntry {
    pub id: Uuid,
    pub entity_id: String,
    pub unique_id: String,
    pub platform: Platform,
    pub config_entry_id: String,
    /// Registry id of the owning device.
    pub device_id: Option<Uuid>,
    pub name: String,
}

/// Registered entities, keyed by entity id.
pub struct EntityRegistry {
    entries: Collection<EntityEntry>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entries: Collection::new(),
        }
    }

    /// Register (or refresh) an entity, keeping its registry id stable.
    pub fn register(
        &self,
        config_entry_id: &str,
        device_id: Option<Uuid>,
        entity: &dyn Entity,
    ) -> Uuid {
        let base = entity.base();
        let id = self
            .entries
            .id_of(base.entity_id())
            .unwrap_or_else(Uuid::new_v4);
        self.insert(EntityEntry {
            id,
            entity_id: base.entity_id().to_owned(),
            unique_id: base.unique_id().to_owned(),
            platform: base.platform(),
            config_entry_id: config_entry_id.to_owned(),
            device_id,
            name: base.name().to_owned(),
        });
        id
    }

    /// Store a complete entry as-is, e.g. one restored from disk.
    pub fn insert(&self, entry: EntityEntry) {
        self.entries
            .upsert(entry.entity_id.clone(), entry.id, entry);
    }

    pub fn get(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.entries.get_by_key(entity_id)
    }

    pub fn remove(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.entries.remove(entity_id)
    }

    pub fn entries_for_config_entry(&self, config_entry_id: &str) -> Vec<Arc<EntityEntry>> {
        self.entries
            .filtered(|e| e.config_entry_id == config_entry_id)
    }

    pub fn entries_for_device(&self, device_id: Uuid) -> Vec<Arc<EntityEntry>> {
        self.entries.filtered(|e| e.device_id == Some(device_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Device registry ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: Uuid,
    pub config_entry_id: String,
    /// Bus-level device id.
    pub identifier: DeviceId,
    pub mac: MacAddress,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceEntry {
    fn key(config_entry_id: &str, identifier: &DeviceId) -> String {
        format!("{config_entry_id}/{identifier}")
    }
}

/// Registered devices, keyed by config entry and bus id.
pub struct DeviceRegistry {
    entries: Collection<DeviceEntry>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            entries: Collection::new(),
        }
    }

    /// Register (or refresh) a bus device. An already known device keeps
    /// its registry id; its name and model follow the current device.
    pub fn register(&self, config_entry_id: &str, device: &Device) -> Uuid {
        let key = DeviceEntry::key(config_entry_id, device.id());
        let id = self.entries.id_of(&key).unwrap_or_else(Uuid::new_v4);
        self.insert(DeviceEntry {
            id,
            config_entry_id: config_entry_id.to_owned(),
            identifier: device.id().clone(),
            mac: device.mac().clone(),
            name: device.title().to_owned(),
            manufacturer: MANUFACTURER.to_owned(),
            model: device.device_type().to_owned(),
        });
        id
    }

    pub fn insert(&self, entry: DeviceEntry) {
        let key = DeviceEntry::key(&entry.config_entry_id, &entry.identifier);
        self.entries.upsert(key, entry.id, entry);
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<DeviceEntry>> {
        self.entries.remove_by_id(id)
    }

    pub fn entries_for_config_entry(&self, config_entry_id: &str) -> Vec<Arc<DeviceEntry>> {
        self.entries
            .filtered(|d| d.config_entry_id == config_entry_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both registries, shared between sessions.
#[derive(Debug, Default)]
pub struct Registries {
    pub entities: EntityRegistry,
    pub devices: DeviceRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{MOCK_MAC, RecordingLink, device_with};
    use crate::model::Snapshot;
    use crate::platform::{Platform, discover};

    #[test]
    fn reregistering_keeps_ids_stable() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x50",
            "111",
            Snapshot {
                fan_speed: Some(1),
                ..Snapshot::default()
            },
            &link,
        );
        let registries = Registries::new();
        let entities = discover(Platform::Select, &[device.clone()]);
        let entity = entities[0].as_entity();

        let dev_id = registries.devices.register("entry", &device);
        let first = registries.entities.register("entry", Some(dev_id), entity);
        let again = registries.entities.register("entry", Some(dev_id), entity);

        assert_eq!(first, again);
        assert_eq!(registries.devices.register("entry", &device), dev_id);
        assert_eq!(registries.entities.entries_for_device(dev_id).len(), 1);
        let devices = registries.devices.entries_for_config_entry("entry");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].manufacturer, "ELKO EP");
    }

    #[test]
    fn reregistering_refreshes_device_metadata() {
        let link = Arc::new(RecordingLink::new());
        let registries = Registries::new();
        let before = device_with("0x51", "111", Snapshot::default(), &link);
        let dev_id = registries.devices.register("entry", &before);

        let renamed = Device::new(
            "0x51",
            MacAddress::new(MOCK_MAC),
            "112",
            Snapshot::default(),
            link.clone(),
        )
        .with_title("Hallway fan");
        assert_eq!(registries.devices.register("entry", &renamed), dev_id);

        let devices = registries.devices.entries_for_config_entry("entry");
        assert_eq!(registries.devices.len(), 1);
        assert_eq!(devices[0].id, dev_id);
        assert_eq!(devices[0].name, "Hallway fan");
        assert_eq!(devices[0].model, "112");
    }

    #[test]
    fn lookups_are_scoped_by_config_entry() {
        let registries = Registries::new();
        for (entry, entity_id) in [("a", "select.one"), ("b", "select.two")] {
            registries.entities.insert(EntityEntry {
                id: Uuid::new_v4(),
                entity_id: entity_id.into(),
                unique_id: entity_id.into(),
                platform: Platform::Select,
                config_entry_id: entry.into(),
                device_id: None,
                name: String::new(),
            });
        }

        let a = registries.entities.entries_for_config_entry("a");
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].entity_id, "select.one");
        assert!(registries.entities.remove("select.two").is_some());
        assert_eq!(registries.entities.len(), 1);
    }
}
