// ── Number platform ──
//
// Signed integer registers exposed on the bus, one entity per register,
// labelled by register address.

use std::sync::Arc;

use super::{Descriptor, Entity, EntityBase, Indexing, Platform, Slot, expand};
use crate::error::CoreError;
use crate::model::{Capability, Device};

pub(crate) static REGISTRY: [Descriptor; 1] = [Descriptor {
    capability: Capability::Number,
    name: "Integer",
    icon: Some("mdi:counter"),
    device_class: None,
    indexing: Indexing::AddressLabelled,
}];

pub const NATIVE_MIN: i32 = i32::MIN;
pub const NATIVE_MAX: i32 = i32::MAX;

/// A bus integer register.
#[derive(Debug)]
pub struct NumberEntity {
    base: EntityBase,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<NumberEntity> {
    expand(devices, &REGISTRY, |d| d, |device, descriptor, slot| {
        NumberEntity::new(device, descriptor, slot)
    })
}

impl NumberEntity {
    fn new(device: &Arc<Device>, descriptor: &'static Descriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Number, descriptor, slot),
        }
    }

    pub fn native_value(&self) -> Option<i32> {
        let values = self.base.device().values();
        values
            .state
            .number
            .as_ref()?
            .get(self.base.key().position())
            .map(|item| item.value)
    }

    pub fn native_min_value(&self) -> i32 {
        NATIVE_MIN
    }

    pub fn native_max_value(&self) -> i32 {
        NATIVE_MAX
    }

    /// Write a new register value.
    ///
    /// Values outside the `i32` range are rejected before anything is
    /// sent. Nothing is sent while the device is unavailable.
    pub async fn set_native_value(&self, value: i64) -> Result<(), CoreError> {
        let value = i32::try_from(value).map_err(|_| {
            CoreError::validation(format!(
                "{value} is outside the range {NATIVE_MIN}..={NATIVE_MAX} of {}",
                self.base.entity_id()
            ))
        })?;

        if !self.base.device().is_available() {
            return Ok(());
        }

        let index = self.base.key().position();
        self.base
            .submit_with(|snapshot| {
                if let Some(item) = snapshot.number.as_mut().and_then(|n| n.get_mut(index)) {
                    item.value = value;
                }
            })
            .await
    }
}

impl Entity for NumberEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn state_label(&self) -> String {
        self.native_value()
            .map_or_else(|| "unknown".to_owned(), |v| v.to_string())
    }
}
