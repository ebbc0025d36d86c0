// inels-core: Device-state to platform-entity mapping for the iNELS MQTT bus,
// with the session lifecycle and configuration flows around it.

pub mod broker;
pub mod config;
pub mod error;
pub mod flow;
pub mod mock;
pub mod model;
pub mod platform;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use broker::{Broker, BrokerConnector};
pub use config::{BrokerConfig, ConfigEntry, ConfigEntryData, Transport};
pub use error::{ConnectError, CoreError, LinkError};
pub use flow::{ConfigFlow, FlowResult, OptionsFlow, try_connection};
pub use platform::{
    BinarySensorEntity, ButtonEntity, ClimateEntity, CoverEntity, Entity, LightEntity,
    NumberEntity, Platform, PlatformEntity, SelectEntity, SensorEntity, SwitchEntity, TurnOn,
    discover, discover_all,
};
pub use session::Session;
pub use store::{DeviceRegistry, EntityRegistry, Registries};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Capability, Device, DeviceId, DeviceLink, DeviceRecord, MacAddress, Snapshot,
};
