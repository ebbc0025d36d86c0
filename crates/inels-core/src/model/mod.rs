// ── Device domain model ──
//
// Canonical representation of an iNELS bus device as handed over by the
// state source: identity, typed capability records and the snapshot that
// bundles them.

pub mod device;
pub mod entity_id;
pub mod records;
pub mod snapshot;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use inels_core::model::*` gives you everything.

pub use device::{Device, DeviceLink, DeviceRecord, DeviceValues};
pub use entity_id::{DeviceId, EntityKey, MacAddress, slugify};
pub use records::{
    BusInteger, ClimateAction, ClimateController, ClimateMode, ControlMode, LightChannel,
    RelayChannel, ShutterChannel, ShutterState, Thermovalve,
};
pub use snapshot::{Capability, Extent, Snapshot};
