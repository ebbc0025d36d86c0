// ── Button platform ──
//
// Wall interface and DIN-rail push buttons. A button has no value of its
// own; its state is the time of the last press seen in a state push.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::{Descriptor, Entity, EntityBase, Indexing, Platform, Slot, expand};
use crate::model::{Capability, Device};

const fn button(capability: Capability, name: &'static str) -> Descriptor {
    Descriptor {
        capability,
        name,
        icon: Some("mdi:button-pointer"),
        device_class: None,
        indexing: Indexing::Indexed,
    }
}

pub(crate) static REGISTRY: [Descriptor; 2] = [
    button(Capability::Interface, "Button"),
    button(Capability::Din, "DIN button"),
];

#[derive(Debug, Default)]
struct Presses {
    /// Generation already inspected.
    seen: Option<u64>,
    last: Option<DateTime<Utc>>,
}

/// One physical push button.
#[derive(Debug)]
pub struct ButtonEntity {
    base: EntityBase,
    presses: Mutex<Presses>,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<ButtonEntity> {
    expand(devices, &REGISTRY, |d| d, |device, descriptor, slot| {
        ButtonEntity::new(device, descriptor, slot)
    })
}

impl ButtonEntity {
    fn new(device: &Arc<Device>, descriptor: &'static Descriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Button, descriptor, slot),
            presses: Mutex::new(Presses::default()),
        }
    }

    pub fn is_pressed(&self) -> Option<bool> {
        let key = self.base.key();
        self.base
            .device()
            .values()
            .state
            .buttons(key.capability)?
            .get(key.position())
            .copied()
    }

    /// Time of the last press seen, `None` until the first one.
    pub fn last_pressed(&self) -> Option<DateTime<Utc>> {
        self.presses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last
    }
}

impl Entity for ButtonEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    /// Records a press when the current snapshot shows the button held.
    /// Each snapshot generation counts at most once.
    fn refresh(&self) {
        let generation = self.base.device().generation();
        let mut presses = self.presses.lock().unwrap_or_else(PoisonError::into_inner);
        if presses.seen == Some(generation) {
            return;
        }
        presses.seen = Some(generation);
        if self.is_pressed() == Some(true) {
            let now = Utc::now();
            debug!(entity_id = %self.base.entity_id(), at = %now, "button pressed");
            presses.last = Some(now);
        }
    }

    /// Buttons stay listed while the gateway or device is offline; their
    /// state is simply unknown until a press arrives.
    fn available(&self) -> bool {
        true
    }

    fn state_label(&self) -> String {
        self.last_pressed().map_or_else(
            || "unknown".to_owned(),
            |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}
