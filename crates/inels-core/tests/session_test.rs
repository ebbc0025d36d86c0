//! Integration tests for the session lifecycle: setup failures, entity and
//! device registration, stale-entity reconciliation, unload and reload.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pretty_assertions::assert_eq;

use inels_core::mock::{BrokerCall, MockBroker, MockConnector, RecordingLink, device_with};
use inels_core::{
    ConfigEntry, ConfigEntryData, ConnectError, CoreError, Device, DeviceId, Entity, Platform,
    PlatformEntity, Registries, Session, Snapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    link: Arc<RecordingLink>,
    connector: Arc<MockConnector>,
    registries: Arc<Registries>,
}

impl Harness {
    fn new(devices: Vec<Arc<Device>>, link: Arc<RecordingLink>) -> Self {
        Self {
            link,
            connector: Arc::new(MockConnector::new(Arc::new(MockBroker::new(devices)))),
            registries: Arc::new(Registries::new()),
        }
    }

    fn broker(&self) -> &Arc<MockBroker> {
        self.connector.broker()
    }

    async fn setup(&self, entry: ConfigEntry) -> Result<Session, CoreError> {
        Session::setup(entry, self.connector.clone(), self.registries.clone()).await
    }
}

fn entry(host: &str) -> ConfigEntry {
    ConfigEntry::new(ConfigEntryData {
        host: Some(host.into()),
        ..ConfigEntryData::default()
    })
}

fn fan(id: &str, link: &Arc<RecordingLink>) -> Arc<Device> {
    device_with(
        id,
        "111",
        Snapshot {
            fan_speed: Some(1),
            ..Snapshot::default()
        },
        link,
    )
}

fn flood_sensor(id: &str, link: &Arc<RecordingLink>) -> Arc<Device> {
    device_with(
        id,
        "15",
        Snapshot {
            flooded: Some(false),
            low_battery: Some(false),
            ..Snapshot::default()
        },
        link,
    )
}

// ── Setup failures ──────────────────────────────────────────────────

#[tokio::test]
async fn entry_without_host_is_not_configured() {
    let h = Harness::new(Vec::new(), Arc::new(RecordingLink::new()));
    let err = h
        .setup(ConfigEntry::new(ConfigEntryData::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotConfigured { .. }));
    assert!(h.connector.hosts().is_empty());
}

#[tokio::test]
async fn failed_connection_test_is_not_ready() {
    let h = Harness::new(Vec::new(), Arc::new(RecordingLink::new()));
    h.broker().set_connect_error(Some(ConnectError::CannotConnect));

    let err = h.setup(entry("10.0.0.9")).await.unwrap_err();
    assert!(matches!(err, CoreError::NotReady { .. }));
    assert_eq!(
        h.broker().calls(),
        [BrokerCall::TestConnection, BrokerCall::Close]
    );
}

#[tokio::test]
async fn refused_connect_is_not_ready() {
    let h = Harness::new(Vec::new(), Arc::new(RecordingLink::new()));
    h.connector.set_refuse(Some(ConnectError::InvalidAuth));

    let err = h.setup(entry("10.0.0.9")).await.unwrap_err();
    assert!(matches!(err, CoreError::NotReady { .. }));
    assert!(h.broker().calls().is_empty());
}

#[tokio::test]
async fn failed_discovery_closes_broker() {
    let h = Harness::new(Vec::new(), Arc::new(RecordingLink::new()));
    h.broker().set_discovery_error(Some("timeout waiting for devices"));

    let err = h.setup(entry("10.0.0.9")).await.unwrap_err();
    assert!(matches!(err, CoreError::NotReady { .. }));
    assert_eq!(
        h.broker().calls(),
        [
            BrokerCall::TestConnection,
            BrokerCall::Discover,
            BrokerCall::Close
        ]
    );
}

// ── Registration and reconciliation ─────────────────────────────────

#[tokio::test]
async fn setup_registers_entities_and_devices() {
    let link = Arc::new(RecordingLink::new());
    let h = Harness::new(
        vec![fan("0x01", &link), flood_sensor("0x02", &link)],
        link.clone(),
    );
    let entry = entry("10.0.0.9");
    let entry_id = entry.entry_id.clone();

    let session = h.setup(entry).await.unwrap();

    assert_eq!(session.entities().len(), 3);
    assert_eq!(session.entities_for(Platform::BinarySensor).count(), 2);
    assert_eq!(
        h.registries.entities.entries_for_config_entry(&entry_id).len(),
        3
    );
    assert_eq!(
        h.registries.devices.entries_for_config_entry(&entry_id).len(),
        2
    );
    assert!(session.reconcile_report().removed_entities.is_empty());
    assert!(
        session
            .entity("select.aa_bb_cc_dd_ee_ff_0x01_fan_speed")
            .is_some()
    );
    assert!(h.link.submissions().is_empty());
}

#[tokio::test]
async fn reload_prunes_stale_entities_and_empty_devices() {
    let link = Arc::new(RecordingLink::new());
    let h = Harness::new(
        vec![fan("0x01", &link), flood_sensor("0x02", &link)],
        link.clone(),
    );
    let entry = entry("10.0.0.9");
    let entry_id = entry.entry_id.clone();

    let session = h.setup(entry).await.unwrap();
    let fan_entry = h
        .registries
        .entities
        .get("select.aa_bb_cc_dd_ee_ff_0x01_fan_speed")
        .unwrap();

    // The flood sensor vanished from the bus.
    h.broker().set_devices(vec![fan("0x01", &link)]);
    let session = session.reload().await.unwrap();

    let report = session.reconcile_report();
    assert_eq!(report.removed_entities.len(), 2);
    assert_eq!(report.removed_devices.len(), 1);
    assert!(
        h.registries
            .entities
            .get("binary_sensor.aa_bb_cc_dd_ee_ff_0x02_flooded")
            .is_none()
    );
    assert_eq!(
        h.registries.devices.entries_for_config_entry(&entry_id).len(),
        1
    );

    // The surviving entity keeps its registry id.
    let again = h
        .registries
        .entities
        .get("select.aa_bb_cc_dd_ee_ff_0x01_fan_speed")
        .unwrap();
    assert_eq!(again.id, fan_entry.id);
}

#[tokio::test]
async fn other_entries_are_left_alone() {
    let link = Arc::new(RecordingLink::new());
    let h = Harness::new(vec![fan("0x01", &link)], link.clone());

    let first = h.setup(entry("10.0.0.9")).await.unwrap();
    h.broker().set_devices(Vec::new());
    let second = h.setup(entry("10.0.0.10")).await.unwrap();

    assert!(second.reconcile_report().removed_entities.is_empty());
    assert_eq!(
        h.registries
            .entities
            .entries_for_config_entry(&first.entry().entry_id)
            .len(),
        1
    );
}

// ── State pushes ────────────────────────────────────────────────────

#[tokio::test]
async fn state_push_reaches_only_that_devices_entities() {
    let link = Arc::new(RecordingLink::new());
    let wall = |pressed: bool| Snapshot {
        interface: Some(vec![pressed]),
        ..Snapshot::default()
    };
    let h = Harness::new(
        vec![
            device_with("0x01", "25", wall(false), &link),
            device_with("0x02", "25", wall(false), &link),
        ],
        link.clone(),
    );
    let session = h.setup(entry("10.0.0.9")).await.unwrap();

    assert!(session.push_state(&DeviceId::new("0x01"), wall(true)));
    assert!(!session.push_state(&DeviceId::new("0x99"), wall(true)));

    let pressed: Vec<bool> = session
        .entities_for(Platform::Button)
        .map(|e| match e {
            PlatformEntity::Button(b) => b.last_pressed().is_some(),
            _ => unreachable!("button platform yields buttons"),
        })
        .collect();
    assert_eq!(pressed, [true, false]);
    assert!(
        session
            .entities_for(Platform::Button)
            .all(|e| e.as_entity().available())
    );
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test]
async fn unload_unsubscribes_then_disconnects() {
    let h = Harness::new(Vec::new(), Arc::new(RecordingLink::new()));
    let session = h.setup(entry("10.0.0.9")).await.unwrap();

    session.unload().await.unwrap();
    assert_eq!(
        h.broker().calls(),
        [
            BrokerCall::TestConnection,
            BrokerCall::Discover,
            BrokerCall::UnsubscribeListeners,
            BrokerCall::Disconnect
        ]
    );
}

#[tokio::test]
async fn updating_options_reconnects_with_new_host() {
    let h = Harness::new(Vec::new(), Arc::new(RecordingLink::new()));
    let session = h.setup(entry("10.0.0.9")).await.unwrap();
    let entry_id = session.entry().entry_id.clone();

    let session = session
        .update_entry(ConfigEntryData {
            host: Some("10.0.0.77".into()),
            ..ConfigEntryData::default()
        })
        .await
        .unwrap();

    assert_eq!(h.connector.hosts(), ["10.0.0.9", "10.0.0.77"]);
    assert_eq!(session.entry().entry_id, entry_id);
    assert_eq!(
        session.entry().data.host.as_deref(),
        Some("10.0.0.77")
    );
}
