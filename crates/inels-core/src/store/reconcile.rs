// ── Stale-entity reconciliation ──
//
// Before platforms are set up, every entity id a config entry had
// registered is parked in a per-platform ledger. Each platform strikes out
// the ids it produced again; whatever is left afterwards is stale.

use std::collections::BTreeMap;

use tracing::info;
use uuid::Uuid;

use super::registry::{EntityRegistry, Registries};
use crate::platform::Platform;

/// Entity ids registered before the current discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OldEntityLedger {
    by_platform: BTreeMap<Platform, Vec<String>>,
}

impl OldEntityLedger {
    /// Snapshot every entity id of `config_entry_id`, grouped by platform.
    pub fn capture(registry: &EntityRegistry, config_entry_id: &str) -> Self {
        let mut by_platform: BTreeMap<Platform, Vec<String>> = BTreeMap::new();
        for entry in registry.entries_for_config_entry(config_entry_id) {
            by_platform
                .entry(entry.platform)
                .or_default()
                .push(entry.entity_id.clone());
        }
        Self { by_platform }
    }

    /// Strike out the ids a platform produced in this pass.
    pub fn consume<'a>(&mut self, platform: Platform, produced: impl IntoIterator<Item = &'a str>) {
        let Some(old) = self.by_platform.get_mut(&platform) else {
            return;
        };
        for entity_id in produced {
            if let Some(pos) = old.iter().position(|id| id == entity_id) {
                old.remove(pos);
            }
        }
    }

    pub fn remaining(&self, platform: Platform) -> &[String] {
        self.by_platform
            .get(&platform)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_platform.values().all(Vec::is_empty)
    }

    /// Every id no platform reclaimed.
    pub fn into_stale(self) -> Vec<String> {
        self.by_platform.into_values().flatten().collect()
    }
}

/// What a reconciliation pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed_entities: Vec<String>,
    pub removed_devices: Vec<Uuid>,
}

/// Deregister stale entities, then devices of the entry left without entities.
pub fn remove_stale(
    ledger: OldEntityLedger,
    registries: &Registries,
    config_entry_id: &str,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for entity_id in ledger.into_stale() {
        if registries.entities.remove(&entity_id).is_some() {
            info!(entity_id = %entity_id, "removing stale entity");
            report.removed_entities.push(entity_id);
        }
    }

    for device in registries.devices.entries_for_config_entry(config_entry_id) {
        if registries.entities.entries_for_device(device.id).is_empty() {
            info!(device = %device.identifier, "removing device {}, because it has no entities", device.id);
            registries.devices.remove(device.id);
            report.removed_devices.push(device.id);
        }
    }

    report
}
