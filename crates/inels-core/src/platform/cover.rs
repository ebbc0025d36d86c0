// ── Cover platform ──
//
// Shutter channels. Three flavours share one entity type: simple shutters
// (no closed signal), shutters, and shutters that report and accept a
// position.

use std::sync::Arc;

use bitflags::bitflags;

use super::{Descriptor, Entity, EntityBase, Indexing, Platform, Slot, expand};
use crate::error::CoreError;
use crate::model::{Capability, Device, ShutterChannel, ShutterState, Snapshot};

pub const ICON_CLOSED: &str = "mdi:window-shutter";
pub const ICON_OPEN: &str = "mdi:window-shutter-open";
pub const MAX_POSITION: u8 = 100;

bitflags! {
    /// Supported cover features, bit-compatible with the host's encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CoverFeatures: u32 {
        const OPEN = 1;
        const CLOSE = 1 << 1;
        const SET_POSITION = 1 << 2;
        const STOP = 1 << 3;
    }
}

#[derive(Debug)]
pub struct CoverDescriptor {
    pub base: Descriptor,
    pub features: CoverFeatures,
}

const fn shutter(capability: Capability, features: CoverFeatures) -> CoverDescriptor {
    CoverDescriptor {
        base: Descriptor {
            capability,
            name: "Shutter",
            icon: Some(ICON_OPEN),
            device_class: Some("shutter"),
            indexing: Indexing::Collapsed,
        },
        features,
    }
}

const BASIC: CoverFeatures = CoverFeatures::OPEN
    .union(CoverFeatures::CLOSE)
    .union(CoverFeatures::STOP);

pub(crate) static REGISTRY: [CoverDescriptor; 3] = [
    shutter(Capability::SimpleShutters, BASIC),
    shutter(Capability::Shutters, BASIC),
    shutter(
        Capability::ShuttersWithPos,
        BASIC.union(CoverFeatures::SET_POSITION),
    ),
];

/// One shutter channel of a device.
#[derive(Debug)]
pub struct CoverEntity {
    base: EntityBase,
    features: CoverFeatures,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<CoverEntity> {
    expand(
        devices,
        &REGISTRY,
        |d| &d.base,
        |device, descriptor, slot| CoverEntity::new(device, descriptor, slot),
    )
}

impl CoverEntity {
    fn new(device: &Arc<Device>, descriptor: &'static CoverDescriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Cover, &descriptor.base, slot),
            features: descriptor.features,
        }
    }

    fn is_simple(&self) -> bool {
        self.base.key().capability == Capability::SimpleShutters
    }

    fn channel<T>(&self, f: impl FnOnce(&ShutterChannel) -> T) -> Option<T> {
        let values = self.base.device().values();
        values
            .state
            .shutter_channels(self.base.key().capability)?
            .get(self.base.key().position())
            .map(f)
    }

    pub fn supported_features(&self) -> CoverFeatures {
        self.features
    }

    /// `None` for simple shutters, which have no closed signal.
    pub fn is_closed(&self) -> Option<bool> {
        self.channel(|c| c.is_closed).flatten()
    }

    /// Only simple shutters report motion, inferred from the last command.
    pub fn is_opening(&self) -> Option<bool> {
        if !self.is_simple() {
            return None;
        }
        self.channel(|c| c.state == ShutterState::Open)
    }

    pub fn is_closing(&self) -> Option<bool> {
        if !self.is_simple() {
            return None;
        }
        self.channel(|c| c.state == ShutterState::Closed)
    }

    pub fn current_cover_position(&self) -> Option<u8> {
        self.channel(|c| c.position).flatten()
    }

    // ── Write path ───────────────────────────────────────────────────

    async fn write_channel(
        &self,
        mutate: impl FnOnce(&mut ShutterChannel),
    ) -> Result<(), CoreError> {
        let capability = self.base.key().capability;
        let index = self.base.key().position();
        self.base
            .submit_with(|snapshot: &mut Snapshot| {
                if let Some(channel) = snapshot
                    .shutter_channels_mut(capability)
                    .and_then(|channels| channels.get_mut(index))
                {
                    mutate(channel);
                }
            })
            .await
    }

    pub async fn open_cover(&self) -> Result<(), CoreError> {
        self.write_channel(|c| c.state = ShutterState::Open).await
    }

    pub async fn close_cover(&self) -> Result<(), CoreError> {
        self.write_channel(|c| c.state = ShutterState::Closed).await
    }

    /// Stop motion. Closed shutters stop upwards, everything else downwards;
    /// simple shutters never know they are closed and always stop downwards.
    pub async fn stop_cover(&self) -> Result<(), CoreError> {
        let stop = if self.is_closed() == Some(true) {
            ShutterState::StopUp
        } else {
            ShutterState::StopDown
        };
        self.write_channel(|c| c.state = stop).await
    }

    /// Drive to a position in percent. Positions above 100 are rejected;
    /// channels without a position ignore the rest.
    pub async fn set_cover_position(&self, position: u8) -> Result<(), CoreError> {
        if position > MAX_POSITION {
            return Err(CoreError::validation(format!(
                "position {position} is outside 0..={MAX_POSITION} for {}",
                self.base.entity_id()
            )));
        }
        if self.current_cover_position().is_none() {
            return Ok(());
        }
        self.write_channel(|c| {
            c.position = Some(position);
            c.set_pos = true;
        })
        .await
    }
}

impl Entity for CoverEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn icon(&self) -> Option<&'static str> {
        if self.is_closed() == Some(true) {
            Some(ICON_CLOSED)
        } else {
            Some(ICON_OPEN)
        }
    }

    fn state_label(&self) -> String {
        match (self.is_closed(), self.current_cover_position()) {
            (_, Some(pos)) => format!("{pos}%"),
            (Some(true), None) => "closed".to_owned(),
            (Some(false), None) => "open".to_owned(),
            (None, None) => match self.is_opening() {
                Some(true) => "opening".to_owned(),
                _ if self.is_closing() == Some(true) => "closing".to_owned(),
                _ => "unknown".to_owned(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{RecordingLink, device_with};

    fn channel(state: ShutterState, is_closed: Option<bool>, position: Option<u8>) -> ShutterChannel {
        ShutterChannel {
            state,
            is_closed,
            position,
            set_pos: false,
        }
    }

    #[test]
    fn two_channels_are_indexed() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x30",
            "21",
            Snapshot {
                shutters: Some(vec![
                    channel(ShutterState::Closed, Some(true), None),
                    channel(ShutterState::Open, Some(false), None),
                ]),
                ..Snapshot::default()
            },
            &link,
        );
        let covers = entities(&[device]);

        assert_eq!(covers.len(), 2);
        assert!(covers[0].name().ends_with("Shutter 1"));
        assert_eq!(covers[0].is_closed(), Some(true));
        assert_eq!(covers[0].icon(), Some(ICON_CLOSED));
        assert_eq!(covers[1].icon(), Some(ICON_OPEN));
        assert_eq!(covers[0].is_opening(), None);
        assert_eq!(covers[0].device_class(), Some("shutter"));
        assert!(!covers[0].supported_features().contains(CoverFeatures::SET_POSITION));
    }

    #[test]
    fn simple_shutters_infer_motion() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x31",
            "21",
            Snapshot {
                simple_shutters: Some(vec![channel(ShutterState::Closed, None, None)]),
                ..Snapshot::default()
            },
            &link,
        );
        let covers = entities(&[device]);

        assert_eq!(covers.len(), 1);
        assert_eq!(covers[0].is_closed(), None);
        assert_eq!(covers[0].is_closing(), Some(true));
        assert_eq!(covers[0].is_opening(), Some(false));
        assert_eq!(covers[0].state_label(), "closing");
    }

    #[tokio::test]
    async fn stop_direction_follows_closed_signal() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x32",
            "21",
            Snapshot {
                shutters: Some(vec![channel(ShutterState::Closed, Some(true), None)]),
                simple_shutters: Some(vec![channel(ShutterState::Closed, None, None)]),
                ..Snapshot::default()
            },
            &link,
        );
        let covers = entities(&[device]);
        let (simple, plain) = (&covers[0], &covers[1]);

        plain.stop_cover().await.unwrap();
        let sent = link.last_submission().unwrap();
        assert_eq!(sent.shutters.unwrap()[0].state, ShutterState::StopUp);

        simple.stop_cover().await.unwrap();
        let sent = link.last_submission().unwrap();
        assert_eq!(sent.simple_shutters.unwrap()[0].state, ShutterState::StopDown);
    }

    #[tokio::test]
    async fn position_is_ignored_without_position_channel() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x33",
            "21",
            Snapshot {
                shutters: Some(vec![channel(ShutterState::Open, Some(false), None)]),
                ..Snapshot::default()
            },
            &link,
        );
        let covers = entities(&[device]);

        covers[0].set_cover_position(40).await.unwrap();
        assert!(link.submissions().is_empty());

        covers[0].close_cover().await.unwrap();
        let sent = link.last_submission().unwrap();
        assert_eq!(sent.shutters.unwrap()[0].state, ShutterState::Closed);
    }

    #[tokio::test]
    async fn open_cover_writes_open_state() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x34",
            "21",
            Snapshot {
                shutters: Some(vec![channel(ShutterState::Closed, Some(true), None)]),
                ..Snapshot::default()
            },
            &link,
        );
        let covers = entities(&[device]);

        covers[0].open_cover().await.unwrap();
        let sent = link.last_submission().unwrap();
        assert_eq!(sent.shutters.unwrap()[0].state, ShutterState::Open);
    }

    #[tokio::test]
    async fn position_above_hundred_is_rejected() {
        let link = Arc::new(RecordingLink::new());
        let device = device_with(
            "0x35",
            "21",
            Snapshot {
                shutters_with_pos: Some(vec![channel(ShutterState::Open, Some(false), Some(10))]),
                ..Snapshot::default()
            },
            &link,
        );
        let covers = entities(&[device]);

        let err = covers[0].set_cover_position(101).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(link.submissions().is_empty());

        covers[0].set_cover_position(100).await.unwrap();
        let sent = link.last_submission().unwrap();
        assert_eq!(sent.shutters_with_pos.unwrap()[0].position, Some(100));
    }
}
