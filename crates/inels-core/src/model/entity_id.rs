// ── Core identity types ──
//
// DeviceId and MacAddress identify a physical device on the bus.
// EntityKey identifies one platform entity projected from that device.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::snapshot::Capability;

// ── MacAddress ──────────────────────────────────────────────────────

/// Gateway MAC address, normalized to lowercase colon-separated format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon- or dash-separated input in any case.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MacAddress {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// ── DeviceId ────────────────────────────────────────────────────────

/// Bus-level unique id of a device (the last topic segment, e.g. `"0x1e4a"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── EntityKey ───────────────────────────────────────────────────────

/// `(capability, index)` pair locating one entity inside a device snapshot.
///
/// `index` is `None` for scalar capabilities and the 0-based element
/// position for indexed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub capability: Capability,
    pub index: Option<usize>,
}

impl EntityKey {
    pub fn scalar(capability: Capability) -> Self {
        Self {
            capability,
            index: None,
        }
    }

    pub fn indexed(capability: Capability, index: usize) -> Self {
        Self {
            capability,
            index: Some(index),
        }
    }

    /// Element position, falling back to `0` for scalar keys. Indexed
    /// capabilities that collapse a single channel still read element 0.
    pub fn position(&self) -> usize {
        self.index.unwrap_or(0)
    }
}

// ── Slugs ───────────────────────────────────────────────────────────

/// Lowercase slug: ASCII alphanumerics kept, every other run collapsed to `_`.
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}
