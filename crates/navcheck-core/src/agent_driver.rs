//! [`AutomationDriver`] implementation backed by the automation agent.
//!
//! [`AgentDriver`] forwards every driver call to the matching
//! [`AgentClient`] command and decodes the JSON payloads the agent returns.
//!
//! # Example
//!
//! ```no_run
//! use navcheck_core::agent_driver::AgentDriver;
//! use navcheck_core::driver::AutomationDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = AgentDriver::new("localhost", 9800);
//! driver.connect().await?;
//! let source = driver.position_source().await?;
//! println!("positioning source: {:?}", source.kind);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::sync::Mutex;

use tracing::{debug, instrument};

use crate::agent_client::{AgentClient, AgentClientError};
use crate::driver::{AutomationDriver, DriverError};
use crate::element::UIElement;
use crate::simulation::{PositionSource, SimulationSettings};

/// Maps an [`AgentClientError`] to a [`DriverError`].
fn map_client_error(err: AgentClientError) -> DriverError {
    match err {
        AgentClientError::NotConnected => DriverError::NotConnected,
        AgentClientError::ConnectionFailed(msg) => DriverError::ConnectionLost(msg),
        AgentClientError::Io(e) => DriverError::Io(e),
        AgentClientError::Timeout => DriverError::Timeout,
        AgentClientError::AgentError(msg) => DriverError::CommandFailed(msg),
        e @ (AgentClientError::Protocol(_) | AgentClientError::UnexpectedResponse { .. }) => {
            DriverError::CommandFailed(e.to_string())
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, DriverError> {
    serde_json::from_str(json).map_err(|e| DriverError::JsonParse(e.to_string()))
}

/// The connected client inside the driver's lock.
fn connected(slot: &mut Option<AgentClient>) -> Result<&mut AgentClient, DriverError> {
    slot.as_mut().ok_or(DriverError::NotConnected)
}

/// An [`AutomationDriver`] backed by a TCP connection to the agent.
///
/// The client sits behind a [`tokio::sync::Mutex`] so that the `&self` trait
/// methods can issue requests; requests from concurrent callers are
/// serialized.
pub struct AgentDriver {
    host: String,
    port: u16,
    client: Mutex<Option<AgentClient>>,
}

impl AgentDriver {
    /// Creates a driver for the given host and port.
    ///
    /// No connection is established until [`connect`](AutomationDriver::connect) is called.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolves the target, connects and verifies the agent with a heartbeat.
    async fn create_client(&self) -> Result<AgentClient, DriverError> {
        let host_port = format!("{}:{}", self.host, self.port);
        let addr = tokio::net::lookup_host(&host_port)
            .await
            .map_err(|e| DriverError::ConnectionLost(e.to_string()))?
            .next()
            .ok_or_else(|| DriverError::ConnectionLost(format!("could not resolve {host_port}")))?;

        let mut client = AgentClient::new(addr);
        client.connect().await.map_err(map_client_error)?;
        client.heartbeat().await.map_err(map_client_error)?;
        Ok(client)
    }
}

#[async_trait]
impl AutomationDriver for AgentDriver {
    #[instrument(skip(self), fields(host = %self.host, port = self.port), level = "debug")]
    async fn connect(&mut self) -> Result<(), DriverError> {
        let client = self.create_client().await?;
        *self.client.lock().await = Some(client);
        Ok(())
    }

    /// `false` once the client has dropped a broken connection.
    fn is_connected(&self) -> bool {
        self.client
            .try_lock()
            .map(|slot| slot.as_ref().is_some_and(AgentClient::is_connected))
            .unwrap_or(false)
    }

    async fn tap_location(&self, x: i32, y: i32) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?.tap(x, y).await.map_err(map_client_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn tap_by_label(&self, label: &str) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?.tap_by_label(label).await.map_err(map_client_error)
    }

    async fn long_press(&self, x: i32, y: i32, duration: f64) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?
            .long_press(x, y, duration)
            .await
            .map_err(map_client_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        let json = {
            let mut slot = self.client.lock().await;
            connected(&mut slot)?.dump_tree().await.map_err(map_client_error)?
        };
        let elements: Vec<UIElement> = parse_json(&json)?;
        debug!(element_count = elements.len(), "tree dumped");
        Ok(elements)
    }

    #[instrument(skip(self), level = "debug")]
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let mut slot = self.client.lock().await;
        let data = connected(&mut slot)?.screenshot().await.map_err(map_client_error)?;
        debug!(bytes = data.len(), "screenshot captured");
        Ok(data)
    }

    #[instrument(skip(self), level = "debug")]
    async fn dismiss_alert(&self, identifier: &str) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?.dismiss_alert(identifier).await.map_err(map_client_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_synchronization(&self, enabled: bool) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?
            .set_synchronization(enabled)
            .await
            .map_err(map_client_error)
    }

    async fn position_source(&self) -> Result<PositionSource, DriverError> {
        let json = {
            let mut slot = self.client.lock().await;
            connected(&mut slot)?.position_source().await.map_err(map_client_error)?
        };
        parse_json(&json)
    }

    #[instrument(skip(self), level = "debug")]
    async fn configure_position_source(
        &self,
        settings: SimulationSettings,
    ) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?
            .configure_position_source(settings.update_interval, settings.movement_speed)
            .await
            .map_err(map_client_error)
    }

    async fn stop_positioning(&self) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?.stop_positioning().await.map_err(map_client_error)
    }

    async fn start_positioning(&self) -> Result<(), DriverError> {
        let mut slot = self.client.lock().await;
        connected(&mut slot)?.start_positioning().await.map_err(map_client_error)
    }
}
