//! Automation driver trait for backend-agnostic UI automation.
//!
//! [`AutomationDriver`] is the seam between the guidance helpers and whatever
//! actually talks to the app. The production implementation is
//! [`AgentDriver`](crate::agent_driver::AgentDriver), which speaks the binary
//! protocol to an on-device agent; tests substitute scripted drivers.

use async_trait::async_trait;
use thiserror::Error;

use crate::element::UIElement;
use crate::matcher::{self, Matcher};
use crate::simulation::{PositionSource, SimulationSettings};

/// Errors that can occur during automation driver operations.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A command or operation failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The backend is not available or not connected.
    #[error("Not connected to automation backend")]
    NotConnected,

    /// The TCP connection to the agent was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// An operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// The backend does not implement the operation.
    #[error("{0} not supported by this backend")]
    Unsupported(&'static str),
}

/// Trait for backend-agnostic UI automation of the navigation app.
///
/// [`find_all`](AutomationDriver::find_all) defaults to fetching the full
/// hierarchy via [`dump_tree`](AutomationDriver::dump_tree) and matching
/// locally. The
/// positioning controls default to [`DriverError::Unsupported`] so that
/// UI-only backends only need to provide the gesture and hierarchy methods.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Establish connection to the automation backend.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Check if the backend is ready to accept commands.
    fn is_connected(&self) -> bool;

    /// Tap at specific screen coordinates.
    async fn tap_location(&self, x: i32, y: i32) -> Result<(), DriverError>;

    /// Tap an element by its accessibility label.
    async fn tap_by_label(&self, label: &str) -> Result<(), DriverError>;

    /// Perform a long press at specific screen coordinates.
    ///
    /// * `duration` - How long to press in seconds
    async fn long_press(&self, x: i32, y: i32, duration: f64) -> Result<(), DriverError>;

    /// Get the full UI element hierarchy for the current screen.
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError>;

    /// Capture a screenshot as raw PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Find every element matching `matcher`, in document order.
    async fn find_all(&self, matcher: &Matcher) -> Result<Vec<UIElement>, DriverError> {
        let tree = self.dump_tree().await?;
        Ok(matcher::find_all(&tree, matcher))
    }

    /// Dismiss the alert controller that presents the identified view,
    /// without animation.
    async fn dismiss_alert(&self, _identifier: &str) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("dismiss_alert"))
    }

    /// Enable or disable waiting for the app to become idle before each command.
    ///
    /// A running route simulation keeps the app permanently busy, so
    /// synchronization has to be off while the simulation is reconfigured.
    async fn set_synchronization(&self, _enabled: bool) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("set_synchronization"))
    }

    /// Describe the positioning manager's current data source.
    async fn position_source(&self) -> Result<PositionSource, DriverError> {
        Err(DriverError::Unsupported("position_source"))
    }

    /// Apply new settings to the installed route simulation source.
    async fn configure_position_source(
        &self,
        _settings: SimulationSettings,
    ) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("configure_position_source"))
    }

    async fn stop_positioning(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("stop_positioning"))
    }

    async fn start_positioning(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("start_positioning"))
    }
}
