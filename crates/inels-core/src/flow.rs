// ── Setup and options flows ──
//
// Interactive configuration of a broker entry. Each step either asks for
// (more) input, finishes with an entry, or aborts. Connection validation
// maps broker result codes to form error keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::broker::BrokerConnector;
use crate::config::{ConfigEntry, ConfigEntryData, DEFAULT_PORT, ENTRY_TITLE, Transport};
use crate::error::{ConnectError, LinkError};

pub const STEP_SETUP: &str = "setup";
pub const ABORT_SINGLE_INSTANCE: &str = "single_instance_allowed";
/// Key of form-wide errors.
pub const ERROR_BASE: &str = "base";

/// Outcome of a flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResult {
    ShowForm {
        step_id: &'static str,
        /// Values pre-filled in the form.
        defaults: ConfigEntryData,
        errors: BTreeMap<String, String>,
        last_step: bool,
    },
    CreateEntry {
        title: String,
        data: ConfigEntryData,
    },
    Abort {
        reason: &'static str,
    },
}

impl FlowResult {
    fn form(defaults: ConfigEntryData, error: Option<ConnectError>) -> Self {
        let errors = error
            .map(|e| BTreeMap::from([(ERROR_BASE.to_owned(), e.form_key().to_owned())]))
            .unwrap_or_default();
        Self::ShowForm {
            step_id: STEP_SETUP,
            defaults,
            errors,
            last_step: true,
        }
    }

    fn entry(data: ConfigEntryData) -> Self {
        Self::CreateEntry {
            title: ENTRY_TITLE.to_owned(),
            data,
        }
    }
}

/// Connect with `data`, test the connection and disconnect again.
///
/// Runs on the blocking pool. A missing host counts as `cannot_connect`.
pub async fn try_connection(
    connector: Arc<dyn BrokerConnector>,
    data: &ConfigEntryData,
) -> Result<(), ConnectError> {
    let Some(config) = data.broker_config() else {
        return Err(ConnectError::CannotConnect);
    };
    debug!(host = %config.host, port = config.port, transport = %config.transport, "testing broker connection");

    tokio::task::spawn_blocking(move || {
        let broker = connector.connect(&config).map_err(|e| match e {
            LinkError::Connect(code) => code,
            _ => ConnectError::CannotConnect,
        })?;
        let result = broker.test_connection();
        broker.disconnect();
        result
    })
    .await
    .unwrap_or_else(|e| {
        warn!(error = %e, "connection test task failed");
        Err(ConnectError::Unknown(0))
    })
}

fn setup_defaults() -> ConfigEntryData {
    ConfigEntryData {
        port: DEFAULT_PORT,
        transport: Transport::Tcp,
        ..ConfigEntryData::default()
    }
}

// ── Config flow ─────────────────────────────────────────────────────

/// First-time setup of the single broker entry.
pub struct ConfigFlow {
    connector: Arc<dyn BrokerConnector>,
}

impl ConfigFlow {
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Self {
        Self { connector }
    }

    /// Entry point. Only one entry may exist at a time.
    pub async fn step_user(&self, existing: &[ConfigEntry]) -> FlowResult {
        if !existing.is_empty() {
            return FlowResult::Abort {
                reason: ABORT_SINGLE_INSTANCE,
            };
        }
        self.step_setup(None).await
    }

    /// Show the broker form, or validate submitted input.
    pub async fn step_setup(&self, input: Option<ConfigEntryData>) -> FlowResult {
        let Some(input) = input else {
            return FlowResult::form(setup_defaults(), None);
        };
        match try_connection(Arc::clone(&self.connector), &input).await {
            Ok(()) => FlowResult::entry(input),
            Err(code) => FlowResult::form(input, Some(code)),
        }
    }
}

// ── Options flow ────────────────────────────────────────────────────

/// Reconfiguration of an existing entry. Form defaults come from it.
pub struct OptionsFlow {
    connector: Arc<dyn BrokerConnector>,
    current: ConfigEntry,
}

impl OptionsFlow {
    pub fn new(connector: Arc<dyn BrokerConnector>, current: ConfigEntry) -> Self {
        Self { connector, current }
    }

    pub async fn step_init(&self) -> FlowResult {
        self.step_setup(None).await
    }

    pub async fn step_setup(&self, input: Option<ConfigEntryData>) -> FlowResult {
        let Some(input) = input else {
            return FlowResult::form(self.current.data.clone(), None);
        };
        match try_connection(Arc::clone(&self.connector), &input).await {
            Ok(()) => FlowResult::entry(input),
            Err(code) => FlowResult::form(self.current.data.clone(), Some(code)),
        }
    }
}
