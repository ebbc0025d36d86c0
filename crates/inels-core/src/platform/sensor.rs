// ── Sensor platform ──
//
// Measured values: temperatures, humidity, illuminance, dew point and the
// analog inputs of I/O modules.

use std::sync::Arc;

use super::{Descriptor, Entity, EntityBase, Indexing, Platform, Slot, expand};
use crate::model::{Capability, Device};

#[derive(Debug)]
pub struct SensorDescriptor {
    pub base: Descriptor,
    pub unit: Option<&'static str>,
}

const fn measured(
    capability: Capability,
    name: &'static str,
    icon: &'static str,
    device_class: Option<&'static str>,
    unit: Option<&'static str>,
    indexing: Indexing,
) -> SensorDescriptor {
    SensorDescriptor {
        base: Descriptor {
            capability,
            name,
            icon: Some(icon),
            device_class,
            indexing,
        },
        unit,
    }
}

pub(crate) static REGISTRY: [SensorDescriptor; 6] = [
    measured(
        Capability::TempIn,
        "Internal temperature sensor",
        "mdi:thermometer",
        Some("temperature"),
        Some("°C"),
        Indexing::Scalar,
    ),
    measured(
        Capability::TempOut,
        "External temperature sensor",
        "mdi:thermometer",
        Some("temperature"),
        Some("°C"),
        Indexing::Scalar,
    ),
    measured(
        Capability::Humidity,
        "Humidity",
        "mdi:water-percent",
        Some("humidity"),
        Some("%"),
        Indexing::Scalar,
    ),
    measured(
        Capability::LightIn,
        "Light intensity",
        "mdi:brightness-5",
        Some("illuminance"),
        Some("lx"),
        Indexing::Scalar,
    ),
    measured(
        Capability::Dewpoint,
        "Dew point",
        "mdi:thermometer-water",
        Some("temperature"),
        Some("°C"),
        Indexing::Scalar,
    ),
    measured(
        Capability::Ains,
        "Analog temperature sensor",
        "mdi:thermometer",
        None,
        None,
        Indexing::Indexed,
    ),
];

/// State class of every sensor this platform creates.
pub const STATE_CLASS: &str = "measurement";

/// A read-only measured value.
#[derive(Debug)]
pub struct SensorEntity {
    base: EntityBase,
    unit: Option<&'static str>,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<SensorEntity> {
    expand(
        devices,
        &REGISTRY,
        |d| &d.base,
        |device, descriptor, slot| SensorEntity::new(device, descriptor, slot),
    )
}

impl SensorEntity {
    fn new(device: &Arc<Device>, descriptor: &'static SensorDescriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Sensor, &descriptor.base, slot),
            unit: descriptor.unit,
        }
    }

    pub fn native_value(&self) -> Option<f32> {
        let key = self.base.key();
        self.base
            .device()
            .values()
            .state
            .reading(key.capability, key.position())
    }

    pub fn native_unit_of_measurement(&self) -> Option<&'static str> {
        self.unit
    }

    pub fn state_class(&self) -> &'static str {
        STATE_CLASS
    }
}

impl Entity for SensorEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn state_label(&self) -> String {
        match (self.native_value(), self.unit) {
            (Some(value), Some(unit)) => format!("{value} {unit}"),
            (Some(value), None) => value.to_string(),
            (None, _) => "unknown".to_owned(),
        }
    }
}
