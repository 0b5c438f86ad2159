//! Accessibility identifiers and on-screen strings of the navigation demo app.

/// Alert asking for location permissions.
pub const PERMISSIONS_ALERT: &str = "LocationBasedViewController.AlertController.permissionsView";

/// Alert asking whether guidance should run as a simulation.
pub const SIMULATION_ALERT: &str = "GuidancePresentingViewController.AlertController.showSimulationView";

pub const BACK_BUTTON: &str = "ViewController.backButton";

pub const START_NAVIGATION_BUTTON: &str = "RouteOverviewViewController.startNavigationButton";

pub const DRIVE_NAV_MAP_VIEW: &str = "RouteOverviewViewController.mapView";

pub const WAYPOINT_MAP_VIEW: &str = "WaypointViewController.mapView";

/// Container of the maneuver panel. Portrait and landscape variants both live
/// in the hierarchy, so it usually matches more than once.
pub const MANEUVER_VIEW: &str = "MSDKUI.GuidanceManeuverView";

/// Text labels of the maneuver panel.
pub const MANEUVER_VIEW_TEXT: &str = "MSDKUI.GuidanceManeuverView.infoLabel";

/// Position of the address label among [`MANEUVER_VIEW_TEXT`] matches.
pub const ADDRESS_LABEL_INDEX: usize = 2;

pub const ESTIMATED_ARRIVAL_VIEW: &str = "MSDKUI.GuidanceEstimatedArrivalView";
pub const ETA_LABEL: &str = "MSDKUI.GuidanceEstimatedArrivalView.estimatedTimeOfArrivalLabel";
pub const DURATION_LABEL: &str = "MSDKUI.GuidanceEstimatedArrivalView.durationLabel";
pub const DISTANCE_LABEL: &str = "MSDKUI.GuidanceEstimatedArrivalView.distanceLabel";

pub const CURRENT_SPEED_VIEW: &str = "MSDKUI.GuidanceSpeedView";
pub const SPEED_VALUE_LABEL: &str = "MSDKUI.GuidanceSpeedView.speedValueLabel";

/// Position of the visible speed view among [`CURRENT_SPEED_VIEW`] matches.
pub const CURRENT_SPEED_INDEX: usize = 1;

/// Hint shown on the waypoint map before a destination is chosen.
pub const TAP_THE_MAP_TO_SET_YOUR_DESTINATION: &str = "Tap the map to set your destination";

/// Hint that disappears once a destination marker is placed.
pub const TAP_OR_LONG_PRESS_ON_THE_MAP: &str = "Tap or long press on the map";
