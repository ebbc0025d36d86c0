// ── Broker abstraction ──
//
// The MQTT client, topic parsing and payload decoding live outside this
// crate. A `Broker` is the session-level handle to that layer; every call
// on it may block and is dispatched off the async runtime.

use std::sync::Arc;

use crate::config::BrokerConfig;
use crate::error::{ConnectError, CoreError, LinkError};
use crate::model::Device;

/// A connected broker client.
pub trait Broker: Send + Sync {
    /// Test the connection; `Err` carries the broker's result code.
    fn test_connection(&self) -> Result<(), ConnectError>;

    /// Run device discovery and return every device found.
    fn discover(&self) -> Result<Vec<Arc<Device>>, LinkError>;

    fn unsubscribe_listeners(&self);

    fn disconnect(&self);

    /// Tear the client down after a failed setup.
    fn close(&self);
}

/// Creates broker clients from a configuration.
pub trait BrokerConnector: Send + Sync {
    fn connect(&self, config: &BrokerConfig) -> Result<Arc<dyn Broker>, LinkError>;
}

/// Run a blocking broker call on the blocking pool and await it.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, CoreError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Internal(format!("blocking broker task failed: {e}")))
}
