//! Integration tests for the entity factory and the platform read/write
//! paths, driven through the mock state source.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tracing_subscriber::fmt::MakeWriter;

use inels_core::mock::{RecordingLink, device_with};
use inels_core::model::{
    BusInteger, ClimateController, ClimateMode, ControlMode, LightChannel, RelayChannel,
    ShutterChannel, ShutterState, Thermovalve,
};
use inels_core::platform::binary_sensor::input_code;
use inels_core::platform::climate::HvacMode;
use inels_core::{CoreError, Entity, Platform, PlatformEntity, Snapshot, discover, discover_all};

// ── Helpers ─────────────────────────────────────────────────────────

/// Captures formatted log output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn with_captured_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    buffer.contents()
}

fn ids(entities: &[PlatformEntity]) -> BTreeSet<String> {
    entities
        .iter()
        .map(|e| e.as_entity().entity_id().to_owned())
        .collect()
}

// ── Factory ─────────────────────────────────────────────────────────

#[test]
fn factory_emits_one_entity_per_scalar_and_len_per_sequence() {
    let link = Arc::new(RecordingLink::new());
    let device = device_with(
        "0x1e4a",
        "150",
        Snapshot {
            input: Some(vec![0, 1, 0]),
            low_battery: Some(false),
            shutters: Some(vec![ShutterChannel::default()]),
            number: Some(vec![
                BusInteger {
                    addr: "1".into(),
                    value: 0,
                },
                BusInteger {
                    addr: "2".into(),
                    value: 0,
                },
            ]),
            ..Snapshot::default()
        },
        &link,
    );
    let devices = [device];

    assert_eq!(discover(Platform::BinarySensor, &devices).len(), 4);
    assert_eq!(discover(Platform::Cover, &devices).len(), 1);
    assert_eq!(discover(Platform::Number, &devices).len(), 2);
    assert!(discover(Platform::Climate, &devices).is_empty());
    assert!(discover(Platform::Select, &devices).is_empty());
    assert_eq!(discover_all(&devices).len(), 7);
}

#[test]
fn every_platform_is_reached_in_setup_order() {
    let link = Arc::new(RecordingLink::new());
    let device = device_with(
        "0x1f",
        "160",
        Snapshot {
            din: Some(vec![false, false]),
            relay: Some(vec![RelayChannel::default()]),
            number: Some(vec![BusInteger::default()]),
            rgbw: Some(vec![LightChannel::default()]),
            simple_shutters: Some(vec![ShutterChannel::default()]),
            temp_in: Some(21.0),
            ains: Some(vec![1.0, 2.0, 3.0]),
            thermovalve: Some(Thermovalve::default()),
            motion: Some(false),
            fan_speed: Some(0),
            ..Snapshot::default()
        },
        &link,
    );

    let platforms: Vec<Platform> = discover_all(&[device])
        .iter()
        .map(PlatformEntity::platform)
        .collect();
    assert_eq!(
        platforms,
        [
            Platform::Button,
            Platform::Button,
            Platform::Switch,
            Platform::Number,
            Platform::Light,
            Platform::Cover,
            Platform::Sensor,
            Platform::Sensor,
            Platform::Sensor,
            Platform::Sensor,
            Platform::Climate,
            Platform::BinarySensor,
            Platform::Select,
        ]
    );
}

#[test]
fn entity_ids_are_stable_across_passes() {
    let link = Arc::new(RecordingLink::new());
    let snapshot = Snapshot {
        input: Some(vec![0, 1]),
        fan_speed: Some(1),
        shutters_with_pos: Some(vec![ShutterChannel::default(); 2]),
        ..Snapshot::default()
    };
    let first = discover_all(&[device_with("0x01", "150", snapshot.clone(), &link)]);
    let second = discover_all(&[device_with("0x01", "150", snapshot, &link)]);

    assert_eq!(ids(&first), ids(&second));
    assert!(ids(&first).contains("cover.aa_bb_cc_dd_ee_ff_0x01_shutters_with_pos1"));
    assert!(ids(&first).contains("select.aa_bb_cc_dd_ee_ff_0x01_fan_speed"));
}

// ── Binary sensor ───────────────────────────────────────────────────

#[test]
fn binary_input_reads_on_and_off() {
    let link = Arc::new(RecordingLink::new());
    let device = device_with(
        "0x02",
        "115",
        Snapshot {
            input: Some(vec![input_code::ON, input_code::OFF]),
            ..Snapshot::default()
        },
        &link,
    );
    let sensors = discover(Platform::BinarySensor, &[device]);
    let [PlatformEntity::BinarySensor(on), PlatformEntity::BinarySensor(off)] = &sensors[..]
    else {
        panic!("expected two binary sensors");
    };

    assert_eq!(on.is_on(), Some(true));
    assert_eq!(off.is_on(), Some(false));
    assert!(on.available() && off.available());
}

#[test]
fn binary_input_fault_warns_exactly_once_per_transition() {
    let link = Arc::new(RecordingLink::new());
    let on = Snapshot {
        input: Some(vec![input_code::ON]),
        ..Snapshot::default()
    };
    let alert = Snapshot {
        input: Some(vec![input_code::ALERT]),
        ..Snapshot::default()
    };
    let device = device_with("0x03", "115", on.clone(), &link);
    let sensors = discover(Platform::BinarySensor, &[device.clone()]);
    let PlatformEntity::BinarySensor(sensor) = &sensors[0] else {
        panic!("expected a binary sensor");
    };

    device.apply_state(alert.clone());
    let logs = with_captured_logs(|| {
        for _ in 0..3 {
            assert!(!sensor.available());
        }
    });
    assert_eq!(logs.matches("ALERT").count(), 1, "logs: {logs}");

    // Same fault pushed again: still unavailable, no new warning.
    device.apply_state(alert);
    let logs = with_captured_logs(|| assert!(!sensor.available()));
    assert_eq!(logs.matches("ALERT").count(), 0, "logs: {logs}");

    device.apply_state(on);
    assert!(sensor.available());
    device.apply_state(Snapshot {
        input: Some(vec![input_code::TAMPER]),
        ..Snapshot::default()
    });
    let logs = with_captured_logs(|| {
        assert!(!sensor.available());
        assert!(!sensor.available());
    });
    assert_eq!(logs.matches("TAMPER").count(), 1, "logs: {logs}");
}

// ── Light ───────────────────────────────────────────────────────────

#[test]
fn dimmer_overload_warns_once_per_transition() {
    let link = Arc::new(RecordingLink::new());
    let dimmer = |coa: bool, toa: bool| Snapshot {
        light_coa_toa: Some(vec![
            LightChannel {
                brightness: 80,
                coa,
                toa,
                ..LightChannel::default()
            },
            LightChannel::default(),
        ]),
        ..Snapshot::default()
    };
    let device = device_with("0x05", "106", dimmer(false, false), &link);
    let lights = discover(Platform::Light, &[device.clone()]);
    let PlatformEntity::Light(light) = &lights[0] else {
        panic!("expected a light");
    };
    assert!(light.available());

    device.apply_state(dimmer(true, false));
    let logs = with_captured_logs(|| {
        light.refresh();
        assert!(!light.available());
        assert!(!light.available());
    });
    assert_eq!(logs.matches("Current overload").count(), 1, "logs: {logs}");
    assert!(logs.contains("aa_bb_cc_dd_ee_ff_0x05_light_coa_toa0"));

    // Still overloaded in the next push: no repeat.
    device.apply_state(dimmer(true, false));
    let logs = with_captured_logs(|| assert!(!light.available()));
    assert!(logs.is_empty(), "logs: {logs}");

    device.apply_state(dimmer(false, true));
    let logs = with_captured_logs(|| assert!(!light.available()));
    assert_eq!(logs.matches("Thermal overload").count(), 1, "logs: {logs}");

    device.apply_state(dimmer(false, false));
    assert!(light.available());
}

#[test]
fn relay_overflow_warns_and_recovers() {
    let link = Arc::new(RecordingLink::new());
    let relay = |overflow: bool| Snapshot {
        relay: Some(vec![RelayChannel {
            is_on: true,
            overflow,
        }]),
        ..Snapshot::default()
    };
    let device = device_with("0x06", "100", relay(false), &link);
    let switches = discover(Platform::Switch, &[device.clone()]);
    let switch = switches[0].as_entity();
    assert!(switch.available());
    assert_eq!(switch.state_label(), "on");

    device.apply_state(relay(true));
    let logs = with_captured_logs(|| {
        switch.refresh();
        assert!(!switch.available());
    });
    assert_eq!(logs.matches("Relay overflow").count(), 1, "logs: {logs}");

    device.apply_state(relay(false));
    assert!(switch.available());
}

// ── Climate ─────────────────────────────────────────────────────────

#[tokio::test]
async fn thermostat_cool_schedule_heat_restores_setpoints() {
    let link = Arc::new(RecordingLink::echoing());
    let device = device_with(
        "0x04",
        "166",
        Snapshot {
            climate_controller: Some(ClimateController {
                current: 20.0,
                required: 21.0,
                required_cool: 25.0,
                climate_mode: ClimateMode::Off,
                control_mode: ControlMode::User,
                current_preset: 1,
                ..ClimateController::default()
            }),
            ..Snapshot::default()
        },
        &link,
    );
    let climates = discover(Platform::Climate, &[device.clone()]);
    let PlatformEntity::Climate(climate) = &climates[0] else {
        panic!("expected a climate entity");
    };

    climate.set_hvac_mode(HvacMode::Cool).await.unwrap();
    let sent = link.last_submission().unwrap().climate_controller.unwrap();
    assert_eq!(sent.climate_mode, ClimateMode::Cool);
    assert_eq!(climate.target_temperature(), Some(25.0));

    climate.set_preset_mode("Schedule").await.unwrap();
    let sent = link.last_submission().unwrap().climate_controller.unwrap();
    assert_eq!(sent.current_preset, 0);

    // The schedule takes over and the device reports its own setpoints.
    let mut scheduled = device.state();
    if let Some(c) = scheduled.climate_controller.as_mut() {
        c.required = 17.0;
        c.required_cool = 29.0;
    }
    device.apply_state(scheduled);

    climate.set_hvac_mode(HvacMode::Heat).await.unwrap();
    let sent = link.last_submission().unwrap().climate_controller.unwrap();
    assert_eq!(sent.climate_mode, ClimateMode::Heat);
    assert_eq!(sent.required, 21.0);
    assert_eq!(sent.required_cool, 25.0);
    assert_eq!(link.submissions().len(), 3);
}

// ── Cover ───────────────────────────────────────────────────────────

#[tokio::test]
async fn positioned_shutter_reads_and_writes_position() {
    let link = Arc::new(RecordingLink::new());
    let device = device_with(
        "0x05",
        "21",
        Snapshot {
            shutters_with_pos: Some(vec![ShutterChannel {
                state: ShutterState::Open,
                is_closed: Some(false),
                position: Some(50),
                set_pos: false,
            }]),
            ..Snapshot::default()
        },
        &link,
    );
    let covers = discover(Platform::Cover, &[device.clone()]);
    let PlatformEntity::Cover(cover) = &covers[0] else {
        panic!("expected a cover");
    };

    assert_eq!(cover.current_cover_position(), Some(50));
    cover.set_cover_position(75).await.unwrap();

    let channels = link.last_submission().unwrap().shutters_with_pos.unwrap();
    let channel = &channels[0];
    assert_eq!(channel.position, Some(75));
    assert!(channel.set_pos);
    // The device itself is untouched until the bus reports back.
    assert_eq!(cover.current_cover_position(), Some(50));
}

// ── Number ──────────────────────────────────────────────────────────

#[tokio::test]
async fn number_rejects_values_outside_i32() {
    let link = Arc::new(RecordingLink::new());
    let device = device_with(
        "0x06",
        "145",
        Snapshot {
            number: Some(vec![BusInteger {
                addr: "0x20".into(),
                value: 0,
            }]),
            ..Snapshot::default()
        },
        &link,
    );
    let numbers = discover(Platform::Number, &[device]);
    let PlatformEntity::Number(number) = &numbers[0] else {
        panic!("expected a number");
    };

    for bad in [2_147_483_648_i64, -2_147_483_649] {
        let err = number.set_native_value(bad).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }), "{bad}: {err}");
    }
    assert!(link.submissions().is_empty());

    number.set_native_value(65535).await.unwrap();
    assert_eq!(link.last_submission().unwrap().number.unwrap()[0].value, 65535);
}

// ── Select ──────────────────────────────────────────────────────────

#[tokio::test]
async fn select_validates_options() {
    let link = Arc::new(RecordingLink::new());
    let device = device_with(
        "0x07",
        "111",
        Snapshot {
            fan_speed: Some(3),
            ..Snapshot::default()
        },
        &link,
    );
    let selects = discover(Platform::Select, &[device]);
    let PlatformEntity::Select(select) = &selects[0] else {
        panic!("expected a select");
    };
    assert_eq!(select.current_option(), Some("Speed 3"));

    let err = select.select_option("Invalid Option").await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(link.submissions().is_empty());
    assert_eq!(select.current_option(), Some("Speed 3"));

    select.select_option("Off").await.unwrap();
    assert_eq!(link.last_submission().unwrap().fan_speed, Some(0));
}

// ── Write failures ──────────────────────────────────────────────────

#[tokio::test]
async fn link_failures_propagate_from_commands() {
    let link = Arc::new(RecordingLink::new());
    let device = device_with(
        "0x08",
        "111",
        Snapshot {
            fan_speed: Some(0),
            ..Snapshot::default()
        },
        &link,
    );
    let selects = discover(Platform::Select, &[device]);
    let PlatformEntity::Select(select) = &selects[0] else {
        panic!("expected a select");
    };

    link.set_should_fail(true);
    let err = select.select_option("Speed 1").await.unwrap_err();
    assert!(matches!(err, CoreError::Link(_)));
}
