// ── Device state snapshot ──
//
// A Snapshot is the full decoded state of a device at one instant. It is
// both the unit of read (entities project it) and the unit of write
// (commands clone, mutate and resubmit it).

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::records::{
    BusInteger, ClimateController, LightChannel, RelayChannel, ShutterChannel, Thermovalve,
};

/// Every capability a decoded device state may expose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    // Buttons
    Interface,
    Din,
    // Switches
    SimpleRelay,
    Relay,
    // Binary sensors
    LowBattery,
    Prox,
    Input,
    HeatingOut,
    CoolingOut,
    Detected,
    Motion,
    Flooded,
    CardPresent,
    // Sensors
    TempIn,
    TempOut,
    Humidity,
    LightIn,
    Dewpoint,
    Ains,
    // Climate
    Thermovalve,
    ClimateController,
    // Covers
    SimpleShutters,
    Shutters,
    ShuttersWithPos,
    // Lights
    SimpleLight,
    LightCoaToa,
    WarmLight,
    Rgb,
    Rgbw,
    // Numbers and selects
    Number,
    FanSpeed,
}

/// Shape of a capability present in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    Scalar,
    Sequence(usize),
}

impl Extent {
    pub fn len(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Sequence(n) => n,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Full decoded device state.
///
/// Each field is `None` when the device type does not expose that
/// capability. Look fields up generically through [`Snapshot::extent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Pressed state of each interface button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<Vec<bool>>,
    /// Pressed state of each DIN-rail input button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub din: Option<Vec<bool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_relay: Option<Vec<RelayChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<Vec<RelayChannel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_battery: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prox: Option<bool>,
    /// Binary input encodings: 0 off, 1 on, 2 alert, 3 tamper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heating_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooling_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flooded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_present: Option<bool>,

    /// °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_in: Option<f32>,
    /// °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_out: Option<f32>,
    /// Relative humidity, %.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
    /// Illuminance, lx.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_in: Option<f32>,
    /// °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dewpoint: Option<f32>,
    /// Analog inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ains: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermovalve: Option<Thermovalve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate_controller: Option<ClimateController>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_shutters: Option<Vec<ShutterChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutters: Option<Vec<ShutterChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutters_with_pos: Option<Vec<ShutterChannel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_light: Option<Vec<LightChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_coa_toa: Option<Vec<LightChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warm_light: Option<Vec<LightChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<Vec<LightChannel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgbw: Option<Vec<LightChannel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<Vec<BusInteger>>,
    /// Index into the fan speed option list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<u8>,

    /// `false` when the decoder found values outside their valid range.
    #[serde(default = "default_in_range")]
    pub in_range: bool,
}

fn default_in_range() -> bool {
    true
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            interface: None,
            din: None,
            simple_relay: None,
            relay: None,
            low_battery: None,
            prox: None,
            input: None,
            heating_out: None,
            cooling_out: None,
            detected: None,
            motion: None,
            flooded: None,
            card_present: None,
            temp_in: None,
            temp_out: None,
            humidity: None,
            light_in: None,
            dewpoint: None,
            ains: None,
            thermovalve: None,
            climate_controller: None,
            simple_shutters: None,
            shutters: None,
            shutters_with_pos: None,
            simple_light: None,
            light_coa_toa: None,
            warm_light: None,
            rgb: None,
            rgbw: None,
            number: None,
            fan_speed: None,
            in_range: true,
        }
    }
}

impl Snapshot {
    /// Presence and shape of a capability, `None` when absent.
    pub fn extent(&self, capability: Capability) -> Option<Extent> {
        fn scalar<T>(v: Option<&T>) -> Option<Extent> {
            v.map(|_| Extent::Scalar)
        }
        fn seq<T>(v: Option<&Vec<T>>) -> Option<Extent> {
            v.map(|items| Extent::Sequence(items.len()))
        }

        match capability {
            Capability::Interface => seq(self.interface.as_ref()),
            Capability::Din => seq(self.din.as_ref()),
            Capability::SimpleRelay => seq(self.simple_relay.as_ref()),
            Capability::Relay => seq(self.relay.as_ref()),
            Capability::LowBattery => scalar(self.low_battery.as_ref()),
            Capability::Prox => scalar(self.prox.as_ref()),
            Capability::Input => seq(self.input.as_ref()),
            Capability::HeatingOut => scalar(self.heating_out.as_ref()),
            Capability::CoolingOut => scalar(self.cooling_out.as_ref()),
            Capability::Detected => scalar(self.detected.as_ref()),
            Capability::Motion => scalar(self.motion.as_ref()),
            Capability::Flooded => scalar(self.flooded.as_ref()),
            Capability::CardPresent => scalar(self.card_present.as_ref()),
            Capability::TempIn => scalar(self.temp_in.as_ref()),
            Capability::TempOut => scalar(self.temp_out.as_ref()),
            Capability::Humidity => scalar(self.humidity.as_ref()),
            Capability::LightIn => scalar(self.light_in.as_ref()),
            Capability::Dewpoint => scalar(self.dewpoint.as_ref()),
            Capability::Ains => seq(self.ains.as_ref()),
            Capability::Thermovalve => scalar(self.thermovalve.as_ref()),
            Capability::ClimateController => scalar(self.climate_controller.as_ref()),
            Capability::SimpleShutters => seq(self.simple_shutters.as_ref()),
            Capability::Shutters => seq(self.shutters.as_ref()),
            Capability::ShuttersWithPos => seq(self.shutters_with_pos.as_ref()),
            Capability::SimpleLight => seq(self.simple_light.as_ref()),
            Capability::LightCoaToa => seq(self.light_coa_toa.as_ref()),
            Capability::WarmLight => seq(self.warm_light.as_ref()),
            Capability::Rgb => seq(self.rgb.as_ref()),
            Capability::Rgbw => seq(self.rgbw.as_ref()),
            Capability::Number => seq(self.number.as_ref()),
            Capability::FanSpeed => scalar(self.fan_speed.as_ref()),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.extent(capability).is_some()
    }

    /// Scalar boolean capabilities (the plain binary sensors).
    pub fn flag(&self, capability: Capability) -> Option<bool> {
        match capability {
            Capability::LowBattery => self.low_battery,
            Capability::Prox => self.prox,
            Capability::HeatingOut => self.heating_out,
            Capability::CoolingOut => self.cooling_out,
            Capability::Detected => self.detected,
            Capability::Motion => self.motion,
            Capability::Flooded => self.flooded,
            Capability::CardPresent => self.card_present,
            _ => None,
        }
    }

    /// Measured value of a sensor capability; `index` selects an analog input.
    pub fn reading(&self, capability: Capability, index: usize) -> Option<f32> {
        match capability {
            Capability::TempIn => self.temp_in,
            Capability::TempOut => self.temp_out,
            Capability::Humidity => self.humidity,
            Capability::LightIn => self.light_in,
            Capability::Dewpoint => self.dewpoint,
            Capability::Ains => self.ains.as_ref()?.get(index).copied(),
            _ => None,
        }
    }

    /// Pressed state of every button of a button capability.
    pub fn buttons(&self, capability: Capability) -> Option<&[bool]> {
        match capability {
            Capability::Interface => self.interface.as_deref(),
            Capability::Din => self.din.as_deref(),
            _ => None,
        }
    }

    /// Shutter channels of whichever shutter capability is requested.
    pub fn shutter_channels(&self, capability: Capability) -> Option<&[ShutterChannel]> {
        match capability {
            Capability::SimpleShutters => self.simple_shutters.as_deref(),
            Capability::Shutters => self.shutters.as_deref(),
            Capability::ShuttersWithPos => self.shutters_with_pos.as_deref(),
            _ => None,
        }
    }

    pub fn shutter_channels_mut(&mut self, capability: Capability) -> Option<&mut [ShutterChannel]> {
        match capability {
            Capability::SimpleShutters => self.simple_shutters.as_deref_mut(),
            Capability::Shutters => self.shutters.as_deref_mut(),
            Capability::ShuttersWithPos => self.shutters_with_pos.as_deref_mut(),
            _ => None,
        }
    }

    pub fn light_channels(&self, capability: Capability) -> Option<&[LightChannel]> {
        match capability {
            Capability::SimpleLight => self.simple_light.as_deref(),
            Capability::LightCoaToa => self.light_coa_toa.as_deref(),
            Capability::WarmLight => self.warm_light.as_deref(),
            Capability::Rgb => self.rgb.as_deref(),
            Capability::Rgbw => self.rgbw.as_deref(),
            _ => None,
        }
    }

    pub fn light_channels_mut(&mut self, capability: Capability) -> Option<&mut [LightChannel]> {
        match capability {
            Capability::SimpleLight => self.simple_light.as_deref_mut(),
            Capability::LightCoaToa => self.light_coa_toa.as_deref_mut(),
            Capability::WarmLight => self.warm_light.as_deref_mut(),
            Capability::Rgb => self.rgb.as_deref_mut(),
            Capability::Rgbw => self.rgbw.as_deref_mut(),
            _ => None,
        }
    }

    pub fn relay_channels(&self, capability: Capability) -> Option<&[RelayChannel]> {
        match capability {
            Capability::SimpleRelay => self.simple_relay.as_deref(),
            Capability::Relay => self.relay.as_deref(),
            _ => None,
        }
    }

    pub fn relay_channels_mut(&mut self, capability: Capability) -> Option<&mut [RelayChannel]> {
        match capability {
            Capability::SimpleRelay => self.simple_relay.as_deref_mut(),
            Capability::Relay => self.relay.as_deref_mut(),
            _ => None,
        }
    }

    /// Capabilities present in this snapshot, in declaration order.
    pub fn capabilities(&self) -> Vec<Capability> {
        use strum::IntoEnumIterator;
        Capability::iter().filter(|c| self.has(*c)).collect()
    }
}
