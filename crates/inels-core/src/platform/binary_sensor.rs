// ── Binary sensor platform ──
//
// Plain boolean capabilities plus the binary-input variant, whose raw
// encoding also carries fault states (alert, tamper).

use std::sync::Arc;

use tracing::warn;

use super::{Descriptor, Entity, EntityBase, FaultLatch, Indexing, Platform, Slot, expand};
use crate::model::{Capability, Device, Snapshot};

/// Raw binary-input encodings.
pub mod input_code {
    pub const OFF: u8 = 0;
    pub const ON: u8 = 1;
    pub const ALERT: u8 = 2;
    pub const TAMPER: u8 = 3;
}

/// How a binary sensor reads its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// A boolean field.
    Flag,
    /// An encoded binary input with fault states.
    BinaryInput,
}

#[derive(Debug)]
pub struct BinarySensorDescriptor {
    pub base: Descriptor,
    pub kind: SensorKind,
}

const fn flag(
    capability: Capability,
    name: &'static str,
    icon: &'static str,
    device_class: Option<&'static str>,
) -> BinarySensorDescriptor {
    BinarySensorDescriptor {
        base: Descriptor {
            capability,
            name,
            icon: Some(icon),
            device_class,
            indexing: Indexing::Scalar,
        },
        kind: SensorKind::Flag,
    }
}

pub(crate) static REGISTRY: [BinarySensorDescriptor; 9] = [
    flag(
        Capability::LowBattery,
        "Battery",
        "mdi:battery-outline",
        Some("battery"),
    ),
    flag(
        Capability::Prox,
        "Proximity Sensor",
        "mdi:signal-distance-variant",
        Some("moving"),
    ),
    BinarySensorDescriptor {
        base: Descriptor {
            capability: Capability::Input,
            name: "Binary input sensor",
            icon: Some("mdi:ray-vertex"),
            device_class: None,
            indexing: Indexing::Indexed,
        },
        kind: SensorKind::BinaryInput,
    },
    flag(
        Capability::HeatingOut,
        "Heating",
        "mdi:heat-wave",
        Some("running"),
    ),
    flag(
        Capability::CoolingOut,
        "Cooling",
        "mdi:snowflake",
        Some("running"),
    ),
    flag(Capability::Detected, "Detector", "mdi:eye", None),
    flag(
        Capability::Motion,
        "Motion detector",
        "mdi:motion-sensor",
        Some("motion"),
    ),
    flag(
        Capability::Flooded,
        "Flooded",
        "mdi:home-flood",
        Some("moisture"),
    ),
    flag(
        Capability::CardPresent,
        "Card present",
        "mdi:smart-card",
        Some("occupancy"),
    ),
];

/// A binary sensor projected from one boolean or binary-input value.
#[derive(Debug)]
pub struct BinarySensorEntity {
    base: EntityBase,
    kind: SensorKind,
    fault: FaultLatch,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<BinarySensorEntity> {
    expand(
        devices,
        &REGISTRY,
        |d| &d.base,
        |device, descriptor, slot| BinarySensorEntity::new(device, descriptor, slot),
    )
}

impl BinarySensorEntity {
    fn new(device: &Arc<Device>, descriptor: &'static BinarySensorDescriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::BinarySensor, &descriptor.base, slot),
            kind: descriptor.kind,
            fault: FaultLatch::new(),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    fn input_code(&self, snapshot: &Snapshot) -> Option<u8> {
        snapshot
            .input
            .as_ref()?
            .get(self.base.key().position())
            .copied()
    }

    pub fn is_on(&self) -> Option<bool> {
        let values = self.base.device().values();
        match self.kind {
            SensorKind::Flag => values.state.flag(self.base.key().capability),
            SensorKind::BinaryInput => self
                .input_code(&values.state)
                .map(|code| code == input_code::ON),
        }
    }

    /// Current raw binary-input encoding, `None` for plain flags.
    pub fn raw_code(&self) -> Option<u8> {
        match self.kind {
            SensorKind::Flag => None,
            SensorKind::BinaryInput => self.input_code(&self.base.device().values().state),
        }
    }

    /// Fault check for binary inputs. Logs once when the value changed into
    /// a fault, and never twice for the same snapshot generation.
    fn input_healthy(&self) -> bool {
        let values = self.base.device().values();
        let Some(code) = self.input_code(&values.state) else {
            return false;
        };
        if matches!(code, input_code::OFF | input_code::ON) {
            return true;
        }

        let previous = self.input_code(&values.last_values);
        if self
            .fault
            .should_report(previous != Some(code), values.generation)
        {
            match code {
                input_code::ALERT => {
                    warn!(entity_id = %self.base.entity_id(), "{} ALERT", self.base.unique_id());
                }
                input_code::TAMPER => {
                    warn!(entity_id = %self.base.entity_id(), "{} TAMPER", self.base.unique_id());
                }
                _ => {}
            }
        }
        false
    }
}

impl Entity for BinarySensorEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn refresh(&self) {
        if self.kind == SensorKind::BinaryInput {
            self.input_healthy();
        }
    }

    fn available(&self) -> bool {
        if !self.base.device().is_available() {
            return false;
        }
        match self.kind {
            SensorKind::Flag => true,
            SensorKind::BinaryInput => self.input_healthy(),
        }
    }

    fn state_label(&self) -> String {
        match self.raw_code() {
            Some(input_code::ALERT) => "alert".to_owned(),
            Some(input_code::TAMPER) => "tamper".to_owned(),
            _ => match self.is_on() {
                Some(true) => "on".to_owned(),
                Some(false) => "off".to_owned(),
                None => "unknown".to_owned(),
            },
        }
    }
}
