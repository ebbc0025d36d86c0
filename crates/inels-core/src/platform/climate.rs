// ── Climate platform ──
//
// Thermovalve heads and virtual thermostats. The virtual thermostat's
// feature set, hvac modes and presets depend on who controls it (user
// or one of the automatic regulation modes).

use std::sync::Arc;

use bitflags::bitflags;
use strum::{AsRefStr, Display, EnumString};

use super::{Descriptor, Entity, EntityBase, Indexing, Platform, Slot, expand};
use crate::error::CoreError;
use crate::model::{
    Capability, ClimateAction, ClimateController, ClimateMode, ControlMode, Device, Snapshot,
    Thermovalve,
};

pub const DEFAULT_MIN_TEMP: f32 = 5.0;
pub const DEFAULT_MAX_TEMP: f32 = 35.0;
pub const TEMPERATURE_UNIT: &str = "°C";

/// Preset that hands setpoints over to the device schedule.
const SCHEDULE_PRESET: u8 = 0;
/// Preset forced by a manual setpoint change.
const MANUAL_PRESET: u8 = 5;

bitflags! {
    /// Supported climate features, bit-compatible with the host's encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClimateFeatures: u32 {
        const TARGET_TEMPERATURE = 1;
        const TARGET_TEMPERATURE_RANGE = 1 << 1;
        const PRESET_MODE = 1 << 4;
    }
}

/// Host-side hvac mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    HeatCool,
    Auto,
}

/// Host-side hvac action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HvacAction {
    Off,
    Idle,
    Heating,
    Cooling,
}

impl From<ClimateMode> for HvacMode {
    fn from(mode: ClimateMode) -> Self {
        match mode {
            ClimateMode::Off => Self::Off,
            ClimateMode::Heat => Self::Heat,
            ClimateMode::Cool => Self::Cool,
            ClimateMode::HeatCool => Self::HeatCool,
            ClimateMode::Auto => Self::Auto,
        }
    }
}

impl From<HvacMode> for ClimateMode {
    fn from(mode: HvacMode) -> Self {
        match mode {
            HvacMode::Off => Self::Off,
            HvacMode::Heat => Self::Heat,
            HvacMode::Cool => Self::Cool,
            HvacMode::HeatCool => Self::HeatCool,
            HvacMode::Auto => Self::Auto,
        }
    }
}

impl From<ClimateAction> for HvacAction {
    fn from(action: ClimateAction) -> Self {
        match action {
            ClimateAction::Off => Self::Off,
            ClimateAction::Idle => Self::Idle,
            ClimateAction::Heating => Self::Heating,
            ClimateAction::Cooling => Self::Cooling,
        }
    }
}

// ── Registry ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ClimateDescriptor {
    pub base: Descriptor,
    pub hvac_modes: &'static [HvacMode],
    pub presets: &'static [&'static str],
}

pub(crate) static REGISTRY: [ClimateDescriptor; 2] = [
    ClimateDescriptor {
        base: Descriptor {
            capability: Capability::Thermovalve,
            name: "Thermovalve",
            icon: None,
            device_class: None,
            indexing: Indexing::Scalar,
        },
        hvac_modes: &[HvacMode::Off, HvacMode::Heat],
        presets: &[],
    },
    ClimateDescriptor {
        base: Descriptor {
            capability: Capability::ClimateController,
            name: "Virtual Thermostat",
            icon: None,
            device_class: None,
            indexing: Indexing::Scalar,
        },
        hvac_modes: &[HvacMode::Off, HvacMode::Heat, HvacMode::Cool],
        presets: &[
            "Schedule", "Preset 1", "Preset 2", "Preset 3", "Preset 4", "Manual",
        ],
    },
];

/// Virtual thermostat features for a control mode.
pub fn features(control_mode: ControlMode) -> ClimateFeatures {
    match control_mode {
        ControlMode::User => ClimateFeatures::TARGET_TEMPERATURE | ClimateFeatures::PRESET_MODE,
        ControlMode::AutoTwoTemp => ClimateFeatures::TARGET_TEMPERATURE_RANGE,
        ControlMode::AutoSingleTemp => ClimateFeatures::TARGET_TEMPERATURE,
    }
}

// ── Entity ──────────────────────────────────────────────────────────

/// Borrowed view of whichever climate record this entity projects.
enum Record<'a> {
    Valve(&'a Thermovalve),
    Controller(&'a ClimateController),
}

impl Record<'_> {
    fn current(&self) -> f32 {
        match self {
            Self::Valve(v) => v.current,
            Self::Controller(c) => c.current,
        }
    }

    fn climate_mode(&self) -> ClimateMode {
        match self {
            Self::Valve(v) => v.climate_mode,
            Self::Controller(c) => c.climate_mode,
        }
    }

    fn current_action(&self) -> ClimateAction {
        match self {
            Self::Valve(v) => v.current_action,
            Self::Controller(c) => c.current_action,
        }
    }
}

/// A thermovalve or virtual thermostat.
#[derive(Debug)]
pub struct ClimateEntity {
    base: EntityBase,
    descriptor: &'static ClimateDescriptor,
}

pub(crate) fn entities(devices: &[Arc<Device>]) -> Vec<ClimateEntity> {
    expand(
        devices,
        &REGISTRY,
        |d| &d.base,
        |device, descriptor, slot| ClimateEntity::new(device, descriptor, slot),
    )
}

impl ClimateEntity {
    fn new(device: &Arc<Device>, descriptor: &'static ClimateDescriptor, slot: Slot) -> Self {
        Self {
            base: EntityBase::new(device, Platform::Climate, &descriptor.base, slot),
            descriptor,
        }
    }

    fn is_controller(&self) -> bool {
        self.base.key().capability == Capability::ClimateController
    }

    fn record<'a>(&self, snapshot: &'a Snapshot) -> Option<Record<'a>> {
        if self.is_controller() {
            snapshot.climate_controller.as_ref().map(Record::Controller)
        } else {
            snapshot.thermovalve.as_ref().map(Record::Valve)
        }
    }

    fn read<T>(&self, f: impl FnOnce(Record<'_>) -> T) -> Option<T> {
        let values = self.base.device().values();
        self.record(&values.state).map(f)
    }

    /// Controller record in user control mode, if that is what this is.
    fn user_controller<T>(&self, f: impl FnOnce(&ClimateController) -> T) -> Option<T> {
        let values = self.base.device().values();
        values
            .state
            .climate_controller
            .as_ref()
            .filter(|c| self.is_controller() && c.control_mode == ControlMode::User)
            .map(f)
    }

    // ── Read path ────────────────────────────────────────────────────

    pub fn current_temperature(&self) -> Option<f32> {
        self.read(|r| r.current())
    }

    /// Cooling setpoint while cooling, heating setpoint otherwise.
    pub fn target_temperature(&self) -> Option<f32> {
        self.read(|r| match r {
            Record::Controller(c) if c.climate_mode == ClimateMode::Cool => c.required_cool,
            Record::Controller(c) => c.required,
            Record::Valve(v) => v.required,
        })
    }

    pub fn target_temperature_high(&self) -> Option<f32> {
        self.read(|r| match r {
            Record::Controller(c) => c.required,
            Record::Valve(v) => v.required,
        })
    }

    pub fn target_temperature_low(&self) -> Option<f32> {
        self.read(|r| match r {
            Record::Controller(c) => Some(c.required_cool),
            Record::Valve(_) => None,
        })
        .flatten()
    }

    pub fn hvac_mode(&self) -> Option<HvacMode> {
        self.read(|r| r.climate_mode().into())
    }

    pub fn hvac_action(&self) -> Option<HvacAction> {
        self.read(|r| r.current_action().into())
    }

    pub fn hvac_modes(&self) -> Vec<HvacMode> {
        self.read(|r| match r {
            Record::Controller(c) if c.control_mode == ControlMode::User => {
                vec![HvacMode::Off, HvacMode::Heat, HvacMode::Cool]
            }
            Record::Controller(_) => vec![HvacMode::Off, HvacMode::Auto],
            Record::Valve(_) => self.descriptor.hvac_modes.to_vec(),
        })
        .unwrap_or_default()
    }

    /// Active preset, only while a virtual thermostat is user controlled.
    pub fn preset_mode(&self) -> Option<&'static str> {
        self.user_controller(|c| c.current_preset)
            .and_then(|i| self.descriptor.presets.get(usize::from(i)).copied())
    }

    pub fn preset_modes(&self) -> Option<&'static [&'static str]> {
        self.user_controller(|_| self.descriptor.presets)
    }

    pub fn supported_features(&self) -> ClimateFeatures {
        self.read(|r| match r {
            Record::Controller(c) => features(c.control_mode),
            Record::Valve(_) => ClimateFeatures::TARGET_TEMPERATURE,
        })
        .unwrap_or_else(ClimateFeatures::empty)
    }

    pub fn min_temp(&self) -> f32 {
        DEFAULT_MIN_TEMP
    }

    pub fn max_temp(&self) -> f32 {
        DEFAULT_MAX_TEMP
    }

    pub fn temperature_unit(&self) -> &'static str {
        TEMPERATURE_UNIT
    }

    // ── Write path ───────────────────────────────────────────────────

    /// Set the active setpoint (the cooling one while cooling).
    ///
    /// Values outside `min_temp..=max_temp` are rejected. A virtual
    /// thermostat outside user control ignores this; under user control it
    /// also switches to the manual preset.
    pub async fn set_temperature(&self, temperature: f32) -> Result<(), CoreError> {
        if !temperature.is_finite() || !(self.min_temp()..=self.max_temp()).contains(&temperature)
        {
            return Err(CoreError::validation(format!(
                "{temperature} {TEMPERATURE_UNIT} is outside {}..={} for {}",
                self.min_temp(),
                self.max_temp(),
                self.base.entity_id()
            )));
        }

        let state = self.base.device().state();
        if self.is_controller() {
            match state.climate_controller.as_ref() {
                Some(c) if c.control_mode == ControlMode::User => {}
                _ => return Ok(()),
            }
        }

        self.base
            .submit_with(|snapshot| {
                if let Some(c) = snapshot.climate_controller.as_mut().filter(|_| self.is_controller()) {
                    if c.climate_mode == ClimateMode::Cool {
                        c.required_cool = temperature;
                    } else {
                        c.required = temperature;
                    }
                    c.current_preset = MANUAL_PRESET;
                } else if let Some(v) = snapshot.thermovalve.as_mut() {
                    v.required = temperature;
                }
            })
            .await
    }

    /// Change hvac mode.
    ///
    /// A virtual thermostat leaving OFF while on the schedule preset takes
    /// both setpoints back from the previous snapshot. A thermovalve has no
    /// mode register; HEAT raises the setpoint 2 °C above the measured
    /// temperature and OFF drops it to zero.
    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<(), CoreError> {
        if !self.hvac_modes().contains(&mode) {
            return Err(CoreError::validation(format!(
                "hvac mode '{mode}' is not supported by {}",
                self.base.entity_id()
            )));
        }

        if self.is_controller() {
            let previous = self.base.device().last_values().climate_controller;
            return self
                .base
                .submit_with(|snapshot| {
                    let Some(c) = snapshot.climate_controller.as_mut() else {
                        return;
                    };
                    c.climate_mode = mode.into();
                    if mode != HvacMode::Off && c.current_preset == SCHEDULE_PRESET {
                        if let Some(prev) = previous {
                            c.required = prev.required;
                            c.required_cool = prev.required_cool;
                        }
                    }
                })
                .await;
        }

        self.base
            .submit_with(|snapshot| {
                let Some(v) = snapshot.thermovalve.as_mut() else {
                    return;
                };
                match mode {
                    HvacMode::Off => v.required = 0.0,
                    HvacMode::Heat => v.required = v.current + 2.0,
                    _ => {}
                }
            })
            .await
    }

    /// Select a preset by its label.
    pub async fn set_preset_mode(&self, preset: &str) -> Result<(), CoreError> {
        let index = self
            .descriptor
            .presets
            .iter()
            .position(|p| *p == preset)
            .and_then(|i| u8::try_from(i).ok())
            .ok_or_else(|| {
                CoreError::validation(format!(
                    "Unknown preset '{preset}' for {}",
                    self.base.entity_id()
                ))
            })?;

        self.base
            .submit_with(|snapshot| {
                if let Some(c) = snapshot.climate_controller.as_mut() {
                    c.current_preset = index;
                }
            })
            .await
    }
}

impl Entity for ClimateEntity {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn state_label(&self) -> String {
        self.hvac_mode()
            .map_or_else(|| "unknown".to_owned(), |m| m.to_string())
    }
}
