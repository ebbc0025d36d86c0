// ── Typed capability records ──
//
// Sub-records stored inside a Snapshot. Enumerations carry the bus
// encodings as their discriminants.

use serde::{Deserialize, Serialize};

// ── Climate ─────────────────────────────────────────────────────────

/// Requested regulation mode as encoded on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateMode {
    #[default]
    Off = 0,
    Heat = 1,
    Cool = 2,
    HeatCool = 3,
    Auto = 4,
}

/// What the regulator is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateAction {
    #[default]
    Off = 0,
    Idle = 1,
    Heating = 2,
    Cooling = 3,
}

/// Who drives a virtual controller's setpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Setpoints, presets and schedule are under user control.
    #[default]
    User = 0,
    /// Automatic regulation between a heating and a cooling setpoint.
    AutoTwoTemp = 1,
    /// Automatic regulation around a single setpoint.
    AutoSingleTemp = 2,
}

/// Simple thermostatic valve head: one setpoint, no presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thermovalve {
    pub current: f32,
    pub required: f32,
    #[serde(default)]
    pub climate_mode: ClimateMode,
    #[serde(default)]
    pub current_action: ClimateAction,
}

/// Virtual thermostat with schedule, presets and dual setpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateController {
    pub current: f32,
    pub required: f32,
    pub required_cool: f32,
    #[serde(default)]
    pub climate_mode: ClimateMode,
    #[serde(default)]
    pub current_action: ClimateAction,
    #[serde(default)]
    pub control_mode: ControlMode,
    /// Index into the preset list; `0` is the schedule, `5` manual.
    #[serde(default)]
    pub current_preset: u8,
}

// ── Shutters ────────────────────────────────────────────────────────

/// Motor state of a shutter channel, both as reported and as commanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutterState {
    #[default]
    Open,
    Closed,
    StopUp,
    StopDown,
}

/// One shutter channel.
///
/// Simple shutters report neither `is_closed` nor `position`; plain
/// shutters add `is_closed`; positioned shutters expose everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutterChannel {
    pub state: ShutterState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
    /// Tells the device to drive to `position` instead of `state`.
    #[serde(default)]
    pub set_pos: bool,
}

// ── Bus integers ────────────────────────────────────────────────────

/// A signed integer register exposed by a bus device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusInteger {
    /// Register address, used as the human-facing label.
    pub addr: String,
    pub value: i32,
}

// ── Lights ──────────────────────────────────────────────────────────

/// One light channel.
///
/// Which optional fields are set depends on the capability: warm lights
/// carry `relative_ct`, RGB lights `r`/`g`/`b` (0..=255), RGBW lights
/// `r`/`g`/`b`/`w` in percent. Dimmers with overload detection report
/// `toa`/`coa`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightChannel {
    /// Percent, `0` is off.
    pub brightness: u8,
    /// Colour temperature, percent of the way from warm to cold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_ct: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u8>,
    /// Thermal overload alert.
    #[serde(default)]
    pub toa: bool,
    /// Current overload alert.
    #[serde(default)]
    pub coa: bool,
}

// ── Relays ──────────────────────────────────────────────────────────

/// One switched output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayChannel {
    pub is_on: bool,
    /// Output overloaded; only reported by `relay` channels.
    #[serde(default)]
    pub overflow: bool,
}
