// ── Registries ──
//
// Lock-free entity and device registries with push-based change
// notification, plus the stale-entity reconciler that prunes them.

mod collection;
pub mod reconcile;
pub mod registry;

pub use reconcile::{OldEntityLedger, ReconcileReport, remove_stale};
pub use registry::{DeviceEntry, DeviceRegistry, EntityEntry, EntityRegistry, Registries};
