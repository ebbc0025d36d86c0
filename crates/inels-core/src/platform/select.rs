// ── Select platform ──

use std::sync::Arc;

use super::{Descriptor, Entity, EntityBase, Indexing, Platform, Slot, expand};
use crate::error::CoreError;
use crate::model::{Capability, Device};

#[derive(Debug)]
pub struct SelectDescriptor {
    pub base: Descriptor,
    pub options: &'static [&'static str],
}

pub(crate) static REGISTRY: [SelectDescriptor; 1] = [SelectDescriptor {
    base: Descriptor {
        capability: Capability::FanSpeed,
        name: "Fan speed",
        icon: Some("mdi:fan"),
        device_class: None,
        indexing: Indexing::Scalar,
    },
    options: &["Off", "Speed 1", "Speed 2", "Speed 3"],
}];

/// A fixed option list backed by an encoded index.
#[derive(Debug)]
pub struct SelectEntity {
    base: EntityBase,
    options: &'static [&'static str],
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<SelectEntity> {
    expand(
        devices,
        &REGISTRY,
        |d| &d.base,
        |device, descriptor, slot| SelectEntity::new(device, descriptor, slot),
    )
}

impl SelectEntity {
    fn new(device: &Arc<Device>, descriptor: &'static SelectDescriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Select, &descriptor.base, slot),
            options: descriptor.options,
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        self.options
    }

    pub fn current_option(&self) -> Option<&'static str> {
        let index = self.base.device().values().state.fan_speed?;
        self.options.get(usize::from(index)).copied()
    }

    /// Write the index of `option`. Unknown labels are rejected unsent.
    pub async fn select_option(&self, option: &str) -> Result<(), CoreError> {
        let index = self
            .options
            .iter()
            .position(|o| *o == option)
            .and_then(|i| u8::try_from(i).ok())
            .ok_or_else(|| {
                CoreError::validation(format!(
                    "Invalid option '{option}' for {}, expected one of: {}",
                    self.base.entity_id(),
                    self.options.join(", ")
                ))
            })?;

        self.base
            .submit_with(|snapshot| snapshot.fan_speed = Some(index))
            .await
    }
}

impl Entity for SelectEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn state_label(&self) -> String {
        self.current_option().unwrap_or("unknown").to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{RecordingLink, device_with};
    use crate::model::Snapshot;

    #[test]
    fn out_of_range_index_has_no_option() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x40",
            "111",
            Snapshot {
                fan_speed: Some(9),
                ..Snapshot::default()
            },
            &link,
        );
        let selects = entities(&[device]);

        assert_eq!(selects.len(), 1);
        assert_eq!(selects[0].current_option(), None);
        assert_eq!(selects[0].options().len(), 4);
        assert_eq!(selects[0].state_label(), "unknown");
    }

    #[tokio::test]
    async fn selecting_writes_option_index() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x40",
            "111",
            Snapshot {
                fan_speed: Some(0),
                ..Snapshot::default()
            },
            &link,
        );
        let selects = entities(&[device]);

        selects[0].select_option("Speed 2").await.unwrap();
        assert_eq!(link.last_submission().unwrap().fan_speed, Some(2));
    }
}
