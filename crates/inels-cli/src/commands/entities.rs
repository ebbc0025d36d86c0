//! `entities` handler: recorded devices in, projected entity set out.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use inels_core::{Device, DeviceLink, DeviceRecord, LinkError, Platform, Snapshot, discover_all};

use crate::cli::{EntitiesArgs, GlobalOpts, PlatformArg};
use crate::error::CliError;
use crate::output;

/// Devices loaded from a file have no bus behind them; writes fail.
#[derive(Debug)]
struct OfflineLink;

impl DeviceLink for OfflineLink {
    fn set_ha_value(&self, _device: &Device, _snapshot: &Snapshot) -> Result<(), LinkError> {
        Err(LinkError::Disconnected)
    }
}

/// What one projected entity looks like right now.
#[derive(Debug, Serialize)]
struct EntitySummary {
    entity_id: String,
    unique_id: String,
    platform: Platform,
    name: String,
    state: String,
    available: bool,
    icon: Option<&'static str>,
    device_class: Option<&'static str>,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity ID")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Class")]
    class: String,
}

impl From<&EntitySummary> for EntityRow {
    fn from(e: &EntitySummary) -> Self {
        Self {
            entity_id: e.entity_id.clone(),
            name: e.name.clone(),
            state: e.state.clone(),
            available: if e.available { "yes" } else { "no" }.into(),
            class: e.device_class.unwrap_or("-").into(),
        }
    }
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::BinarySensor => Self::BinarySensor,
            PlatformArg::Button => Self::Button,
            PlatformArg::Climate => Self::Climate,
            PlatformArg::Cover => Self::Cover,
            PlatformArg::Light => Self::Light,
            PlatformArg::Number => Self::Number,
            PlatformArg::Select => Self::Select,
            PlatformArg::Sensor => Self::Sensor,
            PlatformArg::Switch => Self::Switch,
        }
    }
}

pub(crate) fn load_devices(path: &Path) -> Result<Vec<Arc<Device>>, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::DeviceFile {
        path: path.to_owned(),
        source,
    })?;
    let records: Vec<DeviceRecord> =
        serde_json::from_str(&raw).map_err(|source| CliError::DeviceJson {
            path: path.to_owned(),
            source,
        })?;

    let link: Arc<dyn DeviceLink> = Arc::new(OfflineLink);
    Ok(records
        .into_iter()
        .map(|record| Arc::new(record.into_device(Arc::clone(&link))))
        .collect())
}

pub fn handle(args: &EntitiesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = load_devices(&args.devices)?;
    tracing::info!(devices = devices.len(), path = %args.devices.display(), "loaded devices");

    let filter = args.platform.map(Platform::from);
    let entities: Vec<EntitySummary> = discover_all(&devices)
        .iter()
        .filter(|e| filter.is_none_or(|p| e.platform() == p))
        .map(|e| {
            let entity = e.as_entity();
            EntitySummary {
                entity_id: entity.entity_id().to_owned(),
                unique_id: entity.unique_id().to_owned(),
                platform: e.platform(),
                name: entity.name().to_owned(),
                state: entity.state_label(),
                available: entity.available(),
                icon: entity.icon(),
                device_class: entity.device_class(),
            }
        })
        .collect();
    tracing::debug!(entities = entities.len(), "factory pass complete");

    let out = output::render_list(global.output, &entities, |e| EntityRow::from(e))?;
    output::print_output(&out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn offline_devices_refuse_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(
            &path,
            r#"[{"id": "0x10", "mac": "AA-BB-CC-DD-EE-01", "device_type": "111",
                 "state": {"fan_speed": 2}}]"#,
        )
        .unwrap();

        let devices = load_devices(&path).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].mac().to_string(), "aa:bb:cc:dd:ee:01");
        assert!(matches!(
            devices[0].set_ha_value(&devices[0].state()),
            Err(LinkError::Disconnected)
        ));
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, "[{\"id\": 1}]").unwrap();
        assert!(matches!(
            load_devices(&path),
            Err(CliError::DeviceJson { .. })
        ));
    }
}
