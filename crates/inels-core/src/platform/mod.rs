// ── Platform entities ──
//
// Projection of device snapshots into typed platform entities. Each
// platform module owns a static type registry (capability key ->
// descriptor) and an entity type; this module holds what they share:
// the indexing rules of the entity factory, entity identity, and the
// copy-then-submit write path.

pub mod binary_sensor;
pub mod button;
pub mod climate;
pub mod cover;
pub mod light;
pub mod number;
pub mod select;
pub mod sensor;
pub mod switch;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Capability, Device, EntityKey, Extent, Snapshot, slugify};

pub use binary_sensor::BinarySensorEntity;
pub use button::ButtonEntity;
pub use climate::ClimateEntity;
pub use cover::CoverEntity;
pub use light::{LightEntity, TurnOn};
pub use number::NumberEntity;
pub use select::SelectEntity;
pub use sensor::SensorEntity;
pub use switch::SwitchEntity;

// ── Platform ────────────────────────────────────────────────────────

/// Entity platforms this integration provides.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Button,
    Switch,
    Number,
    Light,
    Cover,
    Sensor,
    Climate,
    BinarySensor,
    Select,
}

impl Platform {
    /// Order in which a session sets platforms up.
    pub const SETUP_ORDER: [Self; 9] = [
        Self::Button,
        Self::Switch,
        Self::Number,
        Self::Light,
        Self::Cover,
        Self::Sensor,
        Self::Climate,
        Self::BinarySensor,
        Self::Select,
    ];
}

// ── Descriptors ─────────────────────────────────────────────────────

/// How the factory expands a capability into entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indexing {
    /// One entity, key and name unchanged.
    Scalar,
    /// One entity per element; name suffixed `index + 1`, key suffixed `index`.
    Indexed,
    /// Like `Indexed`, but a single element keeps the bare key and name.
    Collapsed,
    /// Like `Indexed`, but the name suffix is the element's bus address.
    AddressLabelled,
}

/// Immutable per-capability metadata shared by every platform registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub capability: Capability,
    pub name: &'static str,
    pub icon: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub indexing: Indexing,
}

/// One entity position produced by the factory for a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub key: EntityKey,
    /// Descriptor name with the index or address suffix applied.
    pub name: String,
    /// Capability key with the index suffix applied.
    pub key_label: String,
}

impl Descriptor {
    /// Expand this descriptor against a snapshot. Absent capability, no slots.
    pub fn slots(&self, snapshot: &Snapshot) -> Vec<Slot> {
        let Some(extent) = snapshot.extent(self.capability) else {
            return Vec::new();
        };
        let key = self.capability.as_ref();

        let indexed = |i: usize, suffix: String| Slot {
            key: EntityKey::indexed(self.capability, i),
            name: format!("{} {suffix}", self.name),
            key_label: format!("{key}{i}"),
        };

        match (self.indexing, extent) {
            (Indexing::Scalar, _) => vec![Slot {
                key: EntityKey::scalar(self.capability),
                name: self.name.to_owned(),
                key_label: key.to_owned(),
            }],
            (Indexing::Collapsed, Extent::Sequence(1)) => vec![Slot {
                key: EntityKey::indexed(self.capability, 0),
                name: self.name.to_owned(),
                key_label: key.to_owned(),
            }],
            (Indexing::AddressLabelled, Extent::Sequence(n)) => (0..n)
                .map(|i| {
                    let addr = snapshot
                        .number
                        .as_ref()
                        .and_then(|items| items.get(i))
                        .map_or_else(|| (i + 1).to_string(), |item| item.addr.clone());
                    indexed(i, addr)
                })
                .collect(),
            (_, extent) => (0..extent.len())
                .map(|i| indexed(i, (i + 1).to_string()))
                .collect(),
        }
    }
}

// ── Entity identity and write path ──────────────────────────────────

/// State shared by every platform entity: the device it projects, the
/// snapshot position it reads, and its derived identity.
#[derive(Debug, Clone)]
pub struct EntityBase {
    device: Arc<Device>,
    platform: Platform,
    descriptor: &'static Descriptor,
    key: EntityKey,
    unique_id: String,
    entity_id: String,
    name: String,
}

impl EntityBase {
    pub fn new(
        device: &Arc<Device>,
        platform: Platform,
        descriptor: &'static Descriptor,
        slot: Slot,
    ) -> Self {
        let unique_id = slugify(&format!(
            "{}_{}_{}",
            device.mac(),
            device.id(),
            slot.key_label
        ));
        let entity_id = format!("{platform}.{unique_id}");
        let name = format!("{} {}", device.title(), slot.name);
        Self {
            device: Arc::clone(device),
            platform,
            descriptor,
            key: slot.key,
            unique_id,
            entity_id,
            name,
        }
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        self.descriptor
    }

    pub fn key(&self) -> EntityKey {
        self.key
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clone the current snapshot, apply `mutate`, submit the whole thing.
    pub(crate) async fn submit_with(
        &self,
        mutate: impl FnOnce(&mut Snapshot),
    ) -> Result<(), CoreError> {
        let mut snapshot = self.device.state();
        mutate(&mut snapshot);
        debug!(entity_id = %self.entity_id, "submitting command");
        self.device.submit(snapshot).await
    }
}

/// Common read surface of every platform entity.
pub trait Entity: Send + Sync {
    fn base(&self) -> &EntityBase;

    fn unique_id(&self) -> &str {
        self.base().unique_id()
    }

    fn entity_id(&self) -> &str {
        self.base().entity_id()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn icon(&self) -> Option<&'static str> {
        self.base().descriptor().icon
    }

    fn device_class(&self) -> Option<&'static str> {
        self.base().descriptor().device_class
    }

    fn available(&self) -> bool {
        self.base().device().is_available()
    }

    /// Re-read the device after a state push. Platforms with edge-triggered
    /// behaviour (fault warnings, button presses) override this.
    fn refresh(&self) {}

    /// Short human-readable rendering of the current value.
    fn state_label(&self) -> String;
}

// ── Fault latch ─────────────────────────────────────────────────────

/// Generation marker meaning "nothing reported yet".
const NEVER: u64 = u64::MAX;

/// Once-per-transition gate for fault warnings.
///
/// Remembers the snapshot generation it last fired for, so repeated reads
/// of the same state never log twice.
#[derive(Debug)]
pub(crate) struct FaultLatch(AtomicU64);

impl FaultLatch {
    pub(crate) const fn new() -> Self {
        Self(AtomicU64::new(NEVER))
    }

    /// `true` when the caller should log: the value changed since the
    /// previous snapshot and this generation has not fired yet.
    pub(crate) fn should_report(&self, changed: bool, generation: u64) -> bool {
        changed && self.0.swap(generation, Ordering::AcqRel) != generation
    }
}

// ── Factory ─────────────────────────────────────────────────────────

/// Any platform entity, as produced by [`discover`].
#[derive(Debug)]
pub enum PlatformEntity {
    BinarySensor(BinarySensorEntity),
    Button(ButtonEntity),
    Climate(ClimateEntity),
    Cover(CoverEntity),
    Light(LightEntity),
    Number(NumberEntity),
    Select(SelectEntity),
    Sensor(SensorEntity),
    Switch(SwitchEntity),
}

impl PlatformEntity {
    pub fn platform(&self) -> Platform {
        self.as_entity().base().platform()
    }

    pub fn as_entity(&self) -> &dyn Entity {
        match self {
            Self::BinarySensor(e) => e,
            Self::Button(e) => e,
            Self::Climate(e) => e,
            Self::Cover(e) => e,
            Self::Light(e) => e,
            Self::Number(e) => e,
            Self::Select(e) => e,
            Self::Sensor(e) => e,
            Self::Switch(e) => e,
        }
    }
}

/// Run the entity factory of one platform over a device list.
///
/// Devices are visited in list order, registry entries in registry order.
pub fn discover(platform: Platform, devices: &[Arc<Device>]) -> Vec<PlatformEntity> {
    match platform {
        Platform::BinarySensor => binary_sensor::entities(devices)
            .into_iter()
            .map(PlatformEntity::BinarySensor)
            .collect(),
        Platform::Button => button::entities(devices)
            .into_iter()
            .map(PlatformEntity::Button)
            .collect(),
        Platform::Light => light::entities(devices)
            .into_iter()
            .map(PlatformEntity::Light)
            .collect(),
        Platform::Sensor => sensor::entities(devices)
            .into_iter()
            .map(PlatformEntity::Sensor)
            .collect(),
        Platform::Switch => switch::entities(devices)
            .into_iter()
            .map(PlatformEntity::Switch)
            .collect(),
        Platform::Climate => climate::entities(devices)
            .into_iter()
            .map(PlatformEntity::Climate)
            .collect(),
        Platform::Cover => cover::entities(devices)
            .into_iter()
            .map(PlatformEntity::Cover)
            .collect(),
        Platform::Number => number::entities(devices)
            .into_iter()
            .map(PlatformEntity::Number)
            .collect(),
        Platform::Select => select::entities(devices)
            .into_iter()
            .map(PlatformEntity::Select)
            .collect(),
    }
}

/// Every platform's entities, in setup order.
pub fn discover_all(devices: &[Arc<Device>]) -> Vec<PlatformEntity> {
    Platform::SETUP_ORDER
        .iter()
        .flat_map(|platform| discover(*platform, devices))
        .collect()
}

/// Shared factory loop over a static registry.
pub(crate) fn expand<D, E>(
    devices: &[Arc<Device>],
    registry: &'static [D],
    descriptor: impl Fn(&'static D) -> &'static Descriptor,
    build: impl Fn(&Arc<Device>, &'static D, Slot) -> E,
) -> Vec<E> {
    let mut out = Vec::new();
    for device in devices {
        let state = device.values();
        for entry in registry {
            for slot in descriptor(entry).slots(&state.state) {
                out.push(build(device, entry, slot));
            }
        }
    }
    out
}
