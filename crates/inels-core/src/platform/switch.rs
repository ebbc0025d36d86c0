// ── Switch platform ──
//
// Relay outputs. Plain relays only switch; `relay` channels also report
// an overflow fault, which makes the switch unavailable.

use std::sync::Arc;

use tracing::warn;

use super::{Descriptor, Entity, EntityBase, FaultLatch, Indexing, Platform, Slot, expand};
use crate::error::CoreError;
use crate::model::{Capability, Device, RelayChannel, Snapshot};

const fn relay(capability: Capability) -> Descriptor {
    Descriptor {
        capability,
        name: "Relay",
        icon: Some("mdi:power-socket-eu"),
        device_class: Some("outlet"),
        indexing: Indexing::Collapsed,
    }
}

pub(crate) static REGISTRY: [Descriptor; 2] = [
    relay(Capability::SimpleRelay),
    relay(Capability::Relay),
];

/// One relay output of a device.
#[derive(Debug)]
pub struct SwitchEntity {
    base: EntityBase,
    overflow: FaultLatch,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<SwitchEntity> {
    expand(devices, &REGISTRY, |d| d, |device, descriptor, slot| {
        SwitchEntity::new(device, descriptor, slot)
    })
}

impl SwitchEntity {
    fn new(device: &Arc<Device>, descriptor: &'static Descriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Switch, descriptor, slot),
            overflow: FaultLatch::new(),
        }
    }

    fn channel_of<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a RelayChannel> {
        snapshot
            .relay_channels(self.base.key().capability)?
            .get(self.base.key().position())
    }

    pub fn is_on(&self) -> Option<bool> {
        let values = self.base.device().values();
        self.channel_of(&values.state).map(|c| c.is_on)
    }

    fn overflow_free(&self) -> bool {
        let values = self.base.device().values();
        let Some(current) = self.channel_of(&values.state) else {
            return true;
        };
        if !current.overflow {
            return true;
        }
        let previous = self.channel_of(&values.last_values);
        if self
            .overflow
            .should_report(previous.map(|c| c.overflow) != Some(true), values.generation)
        {
            warn!(entity_id = %self.base.entity_id(), "{} Relay overflow", self.base.unique_id());
        }
        false
    }

    async fn write(&self, on: bool) -> Result<(), CoreError> {
        let capability = self.base.key().capability;
        let index = self.base.key().position();
        self.base
            .submit_with(|snapshot| {
                if let Some(channel) = snapshot
                    .relay_channels_mut(capability)
                    .and_then(|channels| channels.get_mut(index))
                {
                    channel.is_on = on;
                }
            })
            .await
    }

    pub async fn turn_on(&self) -> Result<(), CoreError> {
        self.write(true).await
    }

    pub async fn turn_off(&self) -> Result<(), CoreError> {
        self.write(false).await
    }
}

impl Entity for SwitchEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn refresh(&self) {
        self.overflow_free();
    }

    fn available(&self) -> bool {
        self.base.device().is_available() && self.overflow_free()
    }

    fn state_label(&self) -> String {
        match self.is_on() {
            Some(true) => "on".to_owned(),
            Some(false) => "off".to_owned(),
            None => "unknown".to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::mock::{RecordingLink, device_with};

    fn out(is_on: bool, overflow: bool) -> RelayChannel {
        RelayChannel { is_on, overflow }
    }

    #[tokio::test]
    async fn relays_switch_their_own_channel() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x60",
            "100",
            Snapshot {
                simple_relay: Some(vec![out(false, false), out(true, false)]),
                ..Snapshot::default()
            },
            &link,
        );
        let switches = entities(&[device]);

        assert_eq!(switches.len(), 2);
        assert!(switches[1].name().ends_with("Relay 2"));
        assert_eq!(switches[1].is_on(), Some(true));

        switches[0].turn_on().await.unwrap();
        let sent = link.last_submission().unwrap().simple_relay.unwrap();
        assert!(sent[0].is_on);
        assert!(sent[1].is_on);

        switches[1].turn_off().await.unwrap();
        let sent = link.last_submission().unwrap().simple_relay.unwrap();
        assert!(!sent[0].is_on);
        assert!(!sent[1].is_on);
    }

    #[test]
    fn overflow_makes_relay_unavailable() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x61",
            "100",
            Snapshot {
                relay: Some(vec![out(true, true)]),
                ..Snapshot::default()
            },
            &link,
        );
        let switches = entities(&[device]);

        assert_eq!(switches.len(), 1);
        assert!(switches[0].unique_id().ends_with("_relay"));
        assert!(!switches[0].available());
    }
}
