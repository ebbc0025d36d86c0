//! Mock state source for testing.
//!
//! Stand-ins for the external MQTT layer so that entities, sessions and
//! flows can be exercised without a broker.
//!
//! - [`RecordingLink`] captures every submitted snapshot, can echo it back
//!   into the device as if the bus had confirmed it, and supports failure
//!   injection.
//! - [`MockBroker`] / [`MockConnector`] script connection results and
//!   discovery, and log every lifecycle call.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::broker::{Broker, BrokerConnector};
use crate::config::BrokerConfig;
use crate::error::{ConnectError, LinkError};
use crate::model::{Device, DeviceLink, MacAddress, Snapshot};

/// Gateway MAC used by [`device_with`].
pub const MOCK_MAC: &str = "aa:bb:cc:dd:ee:ff";

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── RecordingLink ───────────────────────────────────────────────────

/// A [`DeviceLink`] that records submissions instead of publishing them.
#[derive(Debug, Default)]
pub struct RecordingLink {
    submissions: Mutex<Vec<Snapshot>>,
    echo: AtomicBool,
    should_fail: AtomicBool,
    /// Number of upcoming submissions to fail (0 = governed by `should_fail`).
    remaining_failures: AtomicU32,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A link that applies each accepted snapshot to the device, so the
    /// submitted values become current and the old ones `last_values`.
    pub fn echoing() -> Self {
        let link = Self::default();
        link.echo.store(true, Ordering::Relaxed);
        link
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` submissions, then succeed again.
    pub fn fail_next(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    pub fn submissions(&self) -> Vec<Snapshot> {
        lock(&self.submissions).clone()
    }

    pub fn last_submission(&self) -> Option<Snapshot> {
        lock(&self.submissions).last().cloned()
    }

    pub fn clear(&self) {
        lock(&self.submissions).clear();
    }

    fn take_failure(&self) -> bool {
        let pending = self
            .remaining_failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        pending || self.should_fail.load(Ordering::Relaxed)
    }
}

impl DeviceLink for RecordingLink {
    fn set_ha_value(&self, device: &Device, snapshot: &Snapshot) -> Result<(), LinkError> {
        if self.take_failure() {
            return Err(LinkError::Publish {
                topic: format!(
                    "inels/set/{}/{}/{}",
                    device.mac(),
                    device.device_type(),
                    device.id()
                ),
                reason: "mock failure".into(),
            });
        }
        lock(&self.submissions).push(snapshot.clone());
        if self.echo.load(Ordering::Relaxed) {
            device.apply_state(snapshot.clone());
        }
        Ok(())
    }
}

/// Build a shared device on [`MOCK_MAC`] wired to `link`.
pub fn device_with(
    id: &str,
    device_type: &str,
    state: Snapshot,
    link: &Arc<RecordingLink>,
) -> Arc<Device> {
    let link: Arc<dyn DeviceLink> = link.clone();
    Arc::new(Device::new(id, MacAddress::new(MOCK_MAC), device_type, state, link))
}

// ── MockBroker ──────────────────────────────────────────────────────

/// Lifecycle calls observed by a [`MockBroker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerCall {
    TestConnection,
    Discover,
    UnsubscribeListeners,
    Disconnect,
    Close,
}

/// A scripted [`Broker`].
#[derive(Debug, Default)]
pub struct MockBroker {
    devices: Mutex<Vec<Arc<Device>>>,
    connect_error: Mutex<Option<ConnectError>>,
    discovery_error: Mutex<Option<String>>,
    calls: Mutex<Vec<BrokerCall>>,
}

impl MockBroker {
    pub fn new(devices: Vec<Arc<Device>>) -> Self {
        Self {
            devices: Mutex::new(devices),
            ..Self::default()
        }
    }

    /// Replace what the next discovery returns.
    pub fn set_devices(&self, devices: Vec<Arc<Device>>) {
        *lock(&self.devices) = devices;
    }

    pub fn set_connect_error(&self, error: Option<ConnectError>) {
        *lock(&self.connect_error) = error;
    }

    pub fn set_discovery_error(&self, reason: Option<&str>) {
        *lock(&self.discovery_error) = reason.map(str::to_owned);
    }

    pub fn calls(&self) -> Vec<BrokerCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: BrokerCall) {
        lock(&self.calls).push(call);
    }
}

impl Broker for MockBroker {
    fn test_connection(&self) -> Result<(), ConnectError> {
        self.record(BrokerCall::TestConnection);
        lock(&self.connect_error).map_or(Ok(()), Err)
    }

    fn discover(&self) -> Result<Vec<Arc<Device>>, LinkError> {
        self.record(BrokerCall::Discover);
        if let Some(reason) = lock(&self.discovery_error).clone() {
            return Err(LinkError::Discovery { reason });
        }
        Ok(lock(&self.devices).clone())
    }

    fn unsubscribe_listeners(&self) {
        self.record(BrokerCall::UnsubscribeListeners);
    }

    fn disconnect(&self) {
        self.record(BrokerCall::Disconnect);
    }

    fn close(&self) {
        self.record(BrokerCall::Close);
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// A [`BrokerConnector`] that always hands out the same [`MockBroker`].
#[derive(Debug)]
pub struct MockConnector {
    broker: Arc<MockBroker>,
    refuse: Mutex<Option<ConnectError>>,
    hosts: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(broker: Arc<MockBroker>) -> Self {
        Self {
            broker,
            refuse: Mutex::new(None),
            hosts: Mutex::new(Vec::new()),
        }
    }

    pub fn broker(&self) -> &Arc<MockBroker> {
        &self.broker
    }

    /// Make `connect` itself fail, before any broker exists.
    pub fn set_refuse(&self, error: Option<ConnectError>) {
        *lock(&self.refuse) = error;
    }

    /// Hosts of every connect attempt, in order.
    pub fn hosts(&self) -> Vec<String> {
        lock(&self.hosts).clone()
    }
}

impl BrokerConnector for MockConnector {
    fn connect(&self, config: &BrokerConfig) -> Result<Arc<dyn Broker>, LinkError> {
        lock(&self.hosts).push(config.host.clone());
        if let Some(error) = *lock(&self.refuse) {
            return Err(LinkError::Connect(error));
        }
        let broker: Arc<dyn Broker> = self.broker.clone();
        Ok(broker)
    }
}
