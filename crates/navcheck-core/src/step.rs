//! Step types and logging for guidance helper invocations.
//!
//! Every public helper on [`DriveNavigation`](crate::navigation::DriveNavigation)
//! records a [`StepLog`] when it finishes. The log serializes to one JSON object
//! per line, so a test run can be replayed or inspected afterwards.
//!
//! # Example
//!
//! ```
//! use navcheck_core::step::{Step, StepLog, StepResult};
//!
//! let log = StepLog::new(Step::WaitForArrival, StepResult::Success, Some(42_000));
//! println!("{} {} at {}", log.id, log.step.name(), log.timestamp);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::Point;
use crate::navigation::Gesture;

/// The result of a helper invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepResult {
    Success,
    /// The helper failed with the given reason.
    Failure(String),
}

/// The guidance helpers that can be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Step {
    DismissAlert,
    SelectSimulationAlertAction {
        title: String,
    },
    CheckRouteOverview,
    VerifyWaypointMapView,
    SetDestination {
        gesture: Gesture,
        point: Point,
    },
    CheckManeuvers {
        count: usize,
        landscape: bool,
    },
    WaitForArrival,
    HasArrived,
    VerifySpeeding {
        speeding: bool,
    },
    AdaptSimulation,
    IncreaseSimulationSpeed,
    Sleep {
        seconds: f64,
    },
    EstimatedArrival,
}

impl Step {
    /// Returns a short, static name suitable for tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Step::DismissAlert => "dismiss_alert",
            Step::SelectSimulationAlertAction { .. } => "select_simulation_alert_action",
            Step::CheckRouteOverview => "check_route_overview",
            Step::VerifyWaypointMapView => "verify_waypoint_map_view",
            Step::SetDestination { .. } => "set_destination",
            Step::CheckManeuvers { .. } => "check_maneuvers",
            Step::WaitForArrival => "wait_for_arrival",
            Step::HasArrived => "has_arrived",
            Step::VerifySpeeding { .. } => "verify_speeding",
            Step::AdaptSimulation => "adapt_simulation",
            Step::IncreaseSimulationSpeed => "increase_simulation_speed",
            Step::Sleep { .. } => "sleep",
            Step::EstimatedArrival => "estimated_arrival",
        }
    }
}

/// A logged helper invocation with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub step: Step,
    pub result: StepResult,
    /// Value the helper returned, if any (arrival flag, ETA data).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Screenshot taken when the helper failed (base64-encoded PNG).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Wall time the helper took, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl StepLog {
    /// Creates a new entry with a fresh UUID, timestamped now.
    pub fn new(step: Step, result: StepResult, duration_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            step,
            result,
            data: None,
            screenshot: None,
            duration_ms,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_screenshot(mut self, screenshot: String) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn is_success(&self) -> bool {
        self.result == StepResult::Success
    }
}
