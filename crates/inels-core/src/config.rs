// ── Runtime broker configuration ──
//
// These types describe *how* to reach the iNELS MQTT broker. They carry
// credential data and connection tuning, but never touch disk. The CLI
// (via inels-config) or the config flow builds a `BrokerConfig`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Title given to every config entry created by the setup flow.
pub const ENTRY_TITLE: &str = "iNELS";

/// MQTT transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Transport {
    #[default]
    Tcp,
    Websockets,
}

/// Configuration for connecting to a single broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub transport: Transport,
    /// Connection test timeout.
    pub timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            transport: Transport::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BrokerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }
}

impl PartialEq for BrokerConfig {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.username == other.username
            && self.password.as_ref().map(ExposeSecret::expose_secret)
                == other.password.as_ref().map(ExposeSecret::expose_secret)
            && self.transport == other.transport
            && self.timeout == other.timeout
    }
}

// ── Config entry ────────────────────────────────────────────────────

/// Persisted form of a broker configuration, as produced by the setup flow.
///
/// `host` is optional so that a half-written entry can be represented and
/// rejected at setup time rather than at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub transport: Transport,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ConfigEntryData {
    /// Runtime broker config, `None` when no host is set.
    pub fn broker_config(&self) -> Option<BrokerConfig> {
        let host = self.host.as_deref().filter(|h| !h.trim().is_empty())?;
        Some(BrokerConfig {
            host: host.to_owned(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone().map(SecretString::from),
            transport: self.transport,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

impl From<&BrokerConfig> for ConfigEntryData {
    fn from(cfg: &BrokerConfig) -> Self {
        Self {
            host: Some(cfg.host.clone()),
            port: cfg.port,
            username: cfg.username.clone(),
            password: cfg
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_owned()),
            transport: cfg.transport,
        }
    }
}

/// A stored configuration session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    pub data: ConfigEntryData,
}

impl ConfigEntry {
    pub fn new(data: ConfigEntryData) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().simple().to_string(),
            title: ENTRY_TITLE.to_owned(),
            data,
        }
    }
}
