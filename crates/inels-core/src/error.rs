// ── Core error types ──
//
// User-facing errors from inels-core. Transport details stay behind
// `LinkError` and `ConnectError`; consumers match on `CoreError`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Config entry is not configured: {message}")]
    NotConfigured { message: String },

    /// The host should retry setup later.
    #[error("Broker not ready: {message}")]
    NotReady { message: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Link(#[from] LinkError),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Failure reported by the state source while publishing or discovering.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Discovery failed: {reason}")]
    Discovery { reason: String },

    #[error("Broker disconnected")]
    Disconnected,

    #[error("Connection failed: {0}")]
    Connect(#[from] ConnectError),
}

/// Connection test outcome, carrying the broker's numeric result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Unsupported MQTT protocol version")]
    MqttVersion,
    #[error("Client identifier rejected")]
    ForbiddenId,
    #[error("Cannot connect to broker")]
    CannotConnect,
    #[error("Bad username or password")]
    InvalidAuth,
    #[error("Not authorized")]
    Unauthorized,
    #[error("Unknown connection result code {0}")]
    Unknown(u8),
}

impl ConnectError {
    /// Map a broker result code. `0` means success and yields `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(Self::MqttVersion),
            2 => Some(Self::ForbiddenId),
            3 => Some(Self::CannotConnect),
            4 => Some(Self::InvalidAuth),
            5 => Some(Self::Unauthorized),
            other => Some(Self::Unknown(other)),
        }
    }

    /// Form error key shown by the setup and options flows.
    pub fn form_key(self) -> &'static str {
        match self {
            Self::MqttVersion => "mqtt_version",
            Self::ForbiddenId => "forbidden_id",
            Self::CannotConnect => "cannot_connect",
            Self::InvalidAuth => "invalid_auth",
            Self::Unauthorized => "unauthorized",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_map_to_form_keys() {
        let keys: Vec<_> = (1..=6)
            .filter_map(ConnectError::from_code)
            .map(ConnectError::form_key)
            .collect();
        assert_eq!(
            keys,
            [
                "mqtt_version",
                "forbidden_id",
                "cannot_connect",
                "invalid_auth",
                "unauthorized",
                "unknown"
            ]
        );
        assert_eq!(ConnectError::from_code(0), None);
    }
}
