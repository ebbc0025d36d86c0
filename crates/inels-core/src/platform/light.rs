// ── Light platform ──
//
// Dimmers and colour lights. Brightness is stored on the bus in percent
// and exposed on the 0..=255 scale; RGBW components are percent too,
// while plain RGB components are already 0..=255. Dimmers with overload
// detection turn unavailable while a current or thermal overload is
// reported.

use std::sync::Arc;

use strum::{AsRefStr, Display};
use tracing::warn;

use super::{Descriptor, Entity, EntityBase, FaultLatch, Indexing, Platform, Slot, expand};
use crate::error::CoreError;
use crate::model::{Capability, Device, LightChannel, Snapshot};

/// Warmest colour temperature a warm light reaches.
pub const MIN_KELVIN: u16 = 2700;
/// Coldest colour temperature a warm light reaches.
pub const MAX_KELVIN: u16 = 6500;

/// How a light interprets colour arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ColorMode {
    Brightness,
    ColorTemp,
    Rgb,
    Rgbw,
}

#[derive(Debug)]
pub struct LightDescriptor {
    pub base: Descriptor,
    pub color_mode: ColorMode,
    /// Channel reports current and thermal overload alerts.
    pub overload_alerts: bool,
}

const fn light(
    capability: Capability,
    name: &'static str,
    color_mode: ColorMode,
    overload_alerts: bool,
) -> LightDescriptor {
    LightDescriptor {
        base: Descriptor {
            capability,
            name,
            icon: Some("mdi:lightbulb"),
            device_class: None,
            indexing: Indexing::Collapsed,
        },
        color_mode,
        overload_alerts,
    }
}

pub(crate) static REGISTRY: [LightDescriptor; 5] = [
    light(Capability::SimpleLight, "Light", ColorMode::Brightness, false),
    light(Capability::LightCoaToa, "Light", ColorMode::Brightness, true),
    light(Capability::WarmLight, "Warm light", ColorMode::ColorTemp, false),
    light(Capability::Rgb, "RGB light", ColorMode::Rgb, false),
    light(Capability::Rgbw, "RGBW light", ColorMode::Rgbw, false),
];

/// Arguments of a turn-on command. All fields optional; no brightness
/// means full brightness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnOn {
    /// 0..=255
    pub brightness: Option<u8>,
    pub rgb_color: Option<(u8, u8, u8)>,
    pub rgbw_color: Option<(u8, u8, u8, u8)>,
    pub color_temp_kelvin: Option<u16>,
}

/// Percent to the 0..=255 scale, rounded.
fn to_byte(percent: u8) -> u8 {
    let scaled = (u32::from(percent.min(100)) * 255 + 50) / 100;
    u8::try_from(scaled).unwrap_or(u8::MAX)
}

/// 0..=255 to percent, rounded half down so that 128 is 50%.
fn to_percent(byte: u8) -> u8 {
    let scaled = (u32::from(byte) * 100 + 127) / 255;
    u8::try_from(scaled).unwrap_or(100)
}

fn kelvin_to_relative(kelvin: u16) -> u8 {
    let span = u32::from(MAX_KELVIN - MIN_KELVIN);
    let offset = u32::from(kelvin.clamp(MIN_KELVIN, MAX_KELVIN) - MIN_KELVIN);
    u8::try_from((offset * 100 + span / 2) / span).unwrap_or(100)
}

fn relative_to_kelvin(relative: u8) -> u16 {
    let span = u32::from(MAX_KELVIN - MIN_KELVIN);
    let offset = u32::from(relative.min(100)) * span / 100;
    MIN_KELVIN + u16::try_from(offset).unwrap_or(MAX_KELVIN - MIN_KELVIN)
}

/// One light channel of a device.
#[derive(Debug)]
pub struct LightEntity {
    base: EntityBase,
    color_mode: ColorMode,
    overload_alerts: bool,
    current_overload: FaultLatch,
    thermal_overload: FaultLatch,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<LightEntity> {
    expand(
        devices,
        &REGISTRY,
        |d| &d.base,
        |device, descriptor, slot| LightEntity::new(device, descriptor, slot),
    )
}

impl LightEntity {
    fn new(device: &Arc<Device>, descriptor: &'static LightDescriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Light, &descriptor.base, slot),
            color_mode: descriptor.color_mode,
            overload_alerts: descriptor.overload_alerts,
            current_overload: FaultLatch::new(),
            thermal_overload: FaultLatch::new(),
        }
    }

    fn channel_of<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a LightChannel> {
        snapshot
            .light_channels(self.base.key().capability)?
            .get(self.base.key().position())
    }

    fn channel<T>(&self, f: impl FnOnce(&LightChannel) -> T) -> Option<T> {
        let values = self.base.device().values();
        self.channel_of(&values.state).map(f)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn is_on(&self) -> Option<bool> {
        self.channel(|c| c.brightness > 0)
    }

    /// 0..=255
    pub fn brightness(&self) -> Option<u8> {
        self.channel(|c| to_byte(c.brightness))
    }

    pub fn rgb_color(&self) -> Option<(u8, u8, u8)> {
        if self.color_mode != ColorMode::Rgb {
            return None;
        }
        self.channel(|c| Some((c.r?, c.g?, c.b?))).flatten()
    }

    pub fn rgbw_color(&self) -> Option<(u8, u8, u8, u8)> {
        if self.color_mode != ColorMode::Rgbw {
            return None;
        }
        self.channel(|c| {
            Some((
                to_byte(c.r?),
                to_byte(c.g?),
                to_byte(c.b?),
                to_byte(c.w?),
            ))
        })
        .flatten()
    }

    /// Only reported while the light is on.
    pub fn color_temp_kelvin(&self) -> Option<u16> {
        if self.color_mode != ColorMode::ColorTemp {
            return None;
        }
        self.channel(|c| {
            if c.brightness == 0 {
                None
            } else {
                c.relative_ct.map(relative_to_kelvin)
            }
        })
        .flatten()
    }

    /// Overload check for dimmers that report it. Logs once when an alert
    /// appears, and never twice for the same snapshot generation.
    fn overload_free(&self) -> bool {
        if !self.overload_alerts {
            return true;
        }
        let values = self.base.device().values();
        let Some(current) = self.channel_of(&values.state) else {
            return true;
        };
        let previous = self.channel_of(&values.last_values);

        if current.coa
            && self.current_overload.should_report(
                previous.map(|c| c.coa) != Some(true),
                values.generation,
            )
        {
            warn!(entity_id = %self.base.entity_id(), "{} Current overload", self.base.unique_id());
        }
        if current.toa
            && self.thermal_overload.should_report(
                previous.map(|c| c.toa) != Some(true),
                values.generation,
            )
        {
            warn!(entity_id = %self.base.entity_id(), "{} Thermal overload", self.base.unique_id());
        }
        !(current.coa || current.toa)
    }

    // ── Write path ───────────────────────────────────────────────────

    async fn write_channel(
        &self,
        mutate: impl FnOnce(&mut LightChannel),
    ) -> Result<(), CoreError> {
        let capability = self.base.key().capability;
        let index = self.base.key().position();
        self.base
            .submit_with(|snapshot: &mut Snapshot| {
                if let Some(channel) = snapshot
                    .light_channels_mut(capability)
                    .and_then(|channels| channels.get_mut(index))
                {
                    mutate(channel);
                }
            })
            .await
    }

    fn unsupported(&self, argument: &str) -> CoreError {
        CoreError::validation(format!(
            "{} does not accept {argument} (color mode {})",
            self.base.entity_id(),
            self.color_mode
        ))
    }

    /// Turn on, optionally with a brightness and a colour matching the
    /// light's colour mode. Arguments are checked before anything is sent.
    pub async fn turn_on(&self, args: TurnOn) -> Result<(), CoreError> {
        if args.rgb_color.is_some() && self.color_mode != ColorMode::Rgb {
            return Err(self.unsupported("rgb_color"));
        }
        if args.rgbw_color.is_some() && self.color_mode != ColorMode::Rgbw {
            return Err(self.unsupported("rgbw_color"));
        }
        if let Some(kelvin) = args.color_temp_kelvin {
            if self.color_mode != ColorMode::ColorTemp {
                return Err(self.unsupported("color_temp_kelvin"));
            }
            if !(MIN_KELVIN..=MAX_KELVIN).contains(&kelvin) {
                return Err(CoreError::validation(format!(
                    "{kelvin} K is outside {MIN_KELVIN}..={MAX_KELVIN} K"
                )));
            }
        }

        let brightness = args.brightness.map_or(100, to_percent);
        self.write_channel(|c| {
            c.brightness = brightness;
            if let Some((r, g, b)) = args.rgb_color {
                c.r = Some(r);
                c.g = Some(g);
                c.b = Some(b);
            }
            if let Some((r, g, b, w)) = args.rgbw_color {
                c.r = Some(to_percent(r));
                c.g = Some(to_percent(g));
                c.b = Some(to_percent(b));
                c.w = Some(to_percent(w));
            }
            if let Some(kelvin) = args.color_temp_kelvin {
                c.relative_ct = Some(kelvin_to_relative(kelvin));
            }
        })
        .await
    }

    pub async fn turn_off(&self) -> Result<(), CoreError> {
        self.write_channel(|c| c.brightness = 0).await
    }
}

impl Entity for LightEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn refresh(&self) {
        self.overload_free();
    }

    fn available(&self) -> bool {
        self.base.device().is_available() && self.overload_free()
    }

    fn state_label(&self) -> String {
        match self.channel(|c| c.brightness) {
            Some(0) => "off".to_owned(),
            Some(pct) => format!("on {pct}%"),
            None => "unknown".to_owned(),
        }
    }
}
