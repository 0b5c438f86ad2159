//! Description of the app's positioning data source.
//!
//! During guidance tests the app replaces live GPS with a route simulation
//! source. The agent reports which source is installed and lets the host tune
//! how often it emits positions and how fast it moves along the route.

use serde::{Deserialize, Serialize};

/// Which kind of data source feeds the positioning manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSourceKind {
    /// No source installed yet.
    #[serde(rename = "none")]
    Unset,
    /// Device GPS.
    Live,
    /// Replays the calculated route.
    RouteSimulation,
    #[serde(other)]
    Other,
}

/// Snapshot of the positioning data source as reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSource {
    pub kind: PositionSourceKind,
    /// Seconds between position updates.
    #[serde(default)]
    pub update_interval: Option<f64>,
    /// Movement speed in meters per second.
    #[serde(default)]
    pub movement_speed: Option<f64>,
}

impl PositionSource {
    pub fn is_route_simulation(&self) -> bool {
        self.kind == PositionSourceKind::RouteSimulation
    }
}

/// Update interval and speed to apply to a route simulation source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Seconds between position updates.
    pub update_interval: f64,
    /// Meters per second.
    pub movement_speed: f64,
}
