//! Drive-navigation helpers for guidance UI tests.
//!
//! [`DriveNavigation`] bundles everything a guidance test case needs once a
//! route has been calculated: dismissing the permission and simulation
//! alerts, choosing a destination on the waypoint map, following the maneuver
//! panel during a route simulation, and detecting arrival and overspeed
//! states from the colors the app renders.
//!
//! Every helper polls the current accessibility hierarchy through an
//! [`AutomationDriver`] and fails with [`ActionError::Assertion`] when the app
//! does not reach the expected state in time. Each invocation is recorded as a
//! [`StepLog`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use navcheck_core::agent_driver::AgentDriver;
//! use navcheck_core::driver::AutomationDriver;
//! use navcheck_core::navigation::{DriveNavigation, Gesture, DEFAULT_DESTINATION_POINT};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = AgentDriver::new("localhost".to_string(), 9800);
//! driver.connect().await?;
//!
//! let nav = DriveNavigation::new(Arc::new(driver));
//! nav.set_destination(Gesture::LongPress, DEFAULT_DESTINATION_POINT).await?;
//! nav.adapt_simulation_to_automation().await?;
//! nav.wait_for_arrival().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::color::{Color, Palette};
use crate::config::{NavcheckConfig, Timings};
use crate::driver::{AutomationDriver, DriverError};
use crate::element::{Point, UIElement};
use crate::ids;
use crate::interaction::{self, fail, ActionError};
use crate::matcher::{self, Matcher};
use crate::simulation::SimulationSettings;
use crate::step::{Step, StepLog, StepResult};
use crate::wait::Condition;

/// Where [`DriveNavigation::set_destination`] touches the waypoint map by
/// default, relative to the map's frame.
pub const DEFAULT_DESTINATION_POINT: Point = Point::new(110.0, 110.0);

const MANEUVER_ADDRESS_TIMEOUT: Duration = Duration::from_secs(120);
const MANEUVER_ADDRESS_POLL_INTERVAL: Duration = Duration::from_secs(1);
const ARRIVAL_TIMEOUT: Duration = Duration::from_secs(180);
const ARRIVAL_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DATA_SOURCE_TIMEOUT: Duration = Duration::from_secs(5);
const DATA_SOURCE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const ONE_MINUTE: Duration = Duration::from_secs(60);

/// Gesture used to drop a destination marker on the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    #[default]
    Tap,
    LongPress,
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gesture::Tap => write!(f, "tap"),
            Gesture::LongPress => write!(f, "long press"),
        }
    }
}

/// An expected turn-by-turn instruction: the address shown on the maneuver
/// panel and the accessibility identifier of its icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maneuver {
    pub address: String,
    #[serde(rename = "icon")]
    pub icon_accessibility_identifier: String,
}

impl Maneuver {
    pub fn new(address: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            icon_accessibility_identifier: icon.into(),
        }
    }
}

/// The strings shown by the estimated-arrival widget.
///
/// Only constructed when all three labels carry text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtaData {
    /// Estimated time of arrival.
    pub eta: String,
    /// Total trip duration.
    pub tta: String,
    /// Remaining distance.
    pub distance: String,
}

impl EtaData {
    /// Reads the three labels below `view`, returning `None` if any is
    /// missing or empty.
    fn from_view(view: &UIElement) -> Option<Self> {
        let text_of = |identifier: &str| {
            matcher::find_first(&view.children, &Matcher::id(identifier))
                .and_then(|label| label.text().map(str::to_string))
                .filter(|text| !text.is_empty())
        };
        Some(Self {
            eta: text_of(ids::ETA_LABEL)?,
            tta: text_of(ids::DURATION_LABEL)?,
            distance: text_of(ids::DISTANCE_LABEL)?,
        })
    }
}

impl fmt::Display for EtaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ETA = {}, TTA = {}, Distance = {}", self.eta, self.tta, self.distance)
    }
}

/// Guidance test helpers bound to one automation driver.
pub struct DriveNavigation {
    driver: Arc<dyn AutomationDriver>,
    timings: Timings,
    palette: Palette,
    steps: Mutex<Vec<StepLog>>,
}

impl DriveNavigation {
    /// Creates helpers with default timings and palette.
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self {
            driver,
            timings: Timings::default(),
            palette: Palette::default(),
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Creates helpers using the timings and palette from `config`.
    pub fn from_config(driver: Arc<dyn AutomationDriver>, config: &NavcheckConfig) -> Self {
        Self::new(driver)
            .with_timings(config.timings.clone())
            .with_palette(config.palette.clone())
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn driver(&self) -> &dyn AutomationDriver {
        self.driver.as_ref()
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Returns a copy of every step recorded so far.
    pub async fn steps(&self) -> Vec<StepLog> {
        self.steps.lock().await.clone()
    }

    /// Drains the recorded steps.
    pub async fn take_steps(&self) -> Vec<StepLog> {
        std::mem::take(&mut *self.steps.lock().await)
    }

    /// Runs one helper body inside a span and records its outcome.
    async fn record<T, F>(&self, step: Step, body: F) -> Result<T, ActionError>
    where
        T: Serialize,
        F: Future<Output = Result<T, ActionError>>,
    {
        let span = info_span!("helper", step = step.name());
        async move {
            let start = Instant::now();
            let result = body.await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let log = match &result {
                Ok(value) => {
                    let log = StepLog::new(step, StepResult::Success, Some(duration_ms));
                    match serde_json::to_value(value) {
                        Ok(serde_json::Value::Null) | Err(_) => log,
                        Ok(data) => log.with_data(data),
                    }
                }
                Err(e) => {
                    let log = StepLog::new(step, StepResult::Failure(e.to_string()), Some(duration_ms));
                    match e.screenshot() {
                        Some(png) => log.with_screenshot(png.to_string()),
                        None => log,
                    }
                }
            };
            info!(duration_ms, success = log.is_success(), "helper complete");
            self.steps.lock().await.push(log);
            result
        }
        .instrument(span)
        .await
    }

    /// Waits for the location permission alert and dismisses it without animation.
    pub async fn dismiss_alert(&self) -> Result<(), ActionError> {
        self.record(Step::DismissAlert, async {
            let driver = self.driver();
            interaction::wait_until_visible(
                driver,
                &Matcher::id(ids::PERMISSIONS_ALERT),
                self.timings.visibility_timeout(),
                self.timings.medium_poll_interval(),
            )
            .await?;
            driver.dismiss_alert(ids::PERMISSIONS_ALERT).await?;
            Ok(())
        })
        .await
    }

    /// Waits for the simulation alert, then taps the button titled `title`.
    pub async fn select_action_on_simulation_alert(&self, title: &str) -> Result<(), ActionError> {
        self.record(
            Step::SelectSimulationAlertAction { title: title.to_string() },
            async {
                let driver = self.driver();
                interaction::wait_until_visible(
                    driver,
                    &Matcher::id(ids::SIMULATION_ALERT),
                    self.timings.visibility_timeout(),
                    self.timings.medium_poll_interval(),
                )
                .await?;
                driver.tap_by_label(title).await?;
                Ok(())
            },
        )
        .await
    }

    /// Asserts that the route overview shows its back button, start button and map.
    pub async fn check_route_overview_elements_are_visible(&self) -> Result<(), ActionError> {
        self.record(Step::CheckRouteOverview, async {
            let driver = self.driver();
            for id in [ids::BACK_BUTTON, ids::START_NAVIGATION_BUTTON, ids::DRIVE_NAV_MAP_VIEW] {
                interaction::assert_visible(driver, &Matcher::id(id)).await?;
            }
            Ok(())
        })
        .await
    }

    /// Asserts that the waypoint map is shown and no destination is chosen yet.
    pub async fn verify_waypoint_map_view_with_no_destination_is_visible(&self) -> Result<(), ActionError> {
        self.record(Step::VerifyWaypointMapView, async {
            self.waypoint_map_without_destination().await.map(|_| ())
        })
        .await
    }

    /// Drops a destination marker on the waypoint map at `point`, relative to
    /// the map's frame.
    ///
    /// Verifies the empty waypoint map first. Afterwards only checks that the
    /// "tap or long press" hint is gone, since the resolved address depends on
    /// the current location.
    pub async fn set_destination(&self, gesture: Gesture, point: Point) -> Result<(), ActionError> {
        self.record(Step::SetDestination { gesture, point }, async {
            let driver = self.driver();
            let map = self.waypoint_map_without_destination().await?;
            match gesture {
                Gesture::Tap => interaction::tap_in(driver, &map, point).await?,
                Gesture::LongPress => interaction::long_press_in(driver, &map, point).await?,
            }
            interaction::assert_not_visible(
                driver,
                &Matcher::containing_text(ids::TAP_OR_LONG_PRESS_ON_THE_MAP),
            )
            .await
        })
        .await
    }

    /// Follows the maneuver panel through a route simulation.
    ///
    /// For each expected maneuver, in order, waits until the panel shows its
    /// address and then asserts that its icon is visible. Portrait and
    /// landscape panels both stay in the hierarchy, so the icon is looked up
    /// at index 1 in landscape and 0 in portrait. Stops at the first mismatch.
    pub async fn check_displayed_maneuvers_during_simulation(
        &self,
        maneuvers: &[Maneuver],
        is_landscape: bool,
    ) -> Result<(), ActionError> {
        let step = Step::CheckManeuvers {
            count: maneuvers.len(),
            landscape: is_landscape,
        };
        self.record(step, async {
            let driver = self.driver();
            let icon_index = if is_landscape { 1 } else { 0 };

            for (position, maneuver) in maneuvers.iter().enumerate() {
                let expected = maneuver.address.as_str();
                let shown = Condition::new(
                    "Wait for correct address",
                    MANEUVER_ADDRESS_TIMEOUT,
                    MANEUVER_ADDRESS_POLL_INTERVAL,
                )
                .wait(move || async move { self.address_text().await.as_deref() == Some(expected) })
                .await;

                if !shown {
                    return Err(fail(
                        driver,
                        format!(
                            "Maneuver {}: address '{}' was not displayed after {} seconds",
                            position + 1,
                            expected,
                            MANEUVER_ADDRESS_TIMEOUT.as_secs()
                        ),
                    )
                    .await);
                }
                debug!(position, address = expected, "maneuver address displayed");

                let icon = Matcher::id(maneuver.icon_accessibility_identifier.as_str())
                    .inside(Matcher::id(ids::MANEUVER_VIEW));
                interaction::assert_visible_at(driver, &icon, icon_index).await?;
            }
            Ok(())
        })
        .await
    }

    /// Waits until the address label turns the arrival accent color.
    pub async fn wait_for_arrival(&self) -> Result<(), ActionError> {
        self.record(Step::WaitForArrival, async {
            let accent = self.palette.accent_light;
            let arrived = Condition::new("Wait for destination", ARRIVAL_TIMEOUT, ARRIVAL_POLL_INTERVAL)
                .wait(|| async move { self.address_text_color().await == Some(accent) })
                .await;
            if !arrived {
                return Err(fail(
                    self.driver(),
                    format!(
                        "Destination was not reached after {} seconds",
                        ARRIVAL_TIMEOUT.as_secs()
                    ),
                )
                .await);
            }
            Ok(())
        })
        .await
    }

    /// Returns whether the address label shows the arrival accent color.
    ///
    /// Returns `false` when no color could be read within the short wait.
    pub async fn has_arrived(&self) -> Result<bool, ActionError> {
        self.record(Step::HasArrived, async {
            let color = Condition::new(
                "Wait for label text color retrieval",
                self.timings.short_wait(),
                self.timings.medium_poll_interval(),
            )
            .wait_for(|| self.address_text_color())
            .await;
            Ok(color == Some(self.palette.accent_light))
        })
        .await
    }

    /// Waits until the speed view shows the overspeed colors (`is_speeding`)
    /// or the regular driving colors.
    pub async fn verify_speeding(&self, is_speeding: bool) -> Result<(), ActionError> {
        self.record(Step::VerifySpeeding { speeding: is_speeding }, async {
            let timeout = self.timings.long_wait();
            let palette = &self.palette;
            let correct = Condition::new(
                "Speed view must have correct color",
                timeout,
                self.timings.medium_poll_interval(),
            )
            .wait(|| async move {
                let (label, background) = self.speed_view_colors().await;
                if is_speeding {
                    label == Some(palette.negative) || background == Some(palette.negative)
                } else {
                    label == Some(palette.foreground) || background == Some(palette.background_brand)
                }
            })
            .await;
            if !correct {
                return Err(fail(
                    self.driver(),
                    format!(
                        "Correct color was not displayed after waiting for {} seconds",
                        timeout.as_secs_f64()
                    ),
                )
                .await);
            }
            Ok(())
        })
        .await
    }

    /// Slows the route simulation down so the app goes idle often enough to be
    /// driven.
    ///
    /// Synchronization is switched off while the data source is reconfigured
    /// and switched back on afterwards, also when the data source never
    /// appears.
    pub async fn adapt_simulation_to_automation(&self) -> Result<(), ActionError> {
        self.record(Step::AdaptSimulation, async {
            let driver = self.driver();
            driver.set_synchronization(false).await?;

            let ready = Condition::new("Data source set", DATA_SOURCE_TIMEOUT, DATA_SOURCE_POLL_INTERVAL)
                .wait(|| async move {
                    match driver.position_source().await {
                        Ok(source) => source.is_route_simulation(),
                        Err(e) => {
                            debug!(error = %e, "position source probe failed");
                            false
                        }
                    }
                })
                .await;
            if !ready {
                if let Err(e) = driver.set_synchronization(true).await {
                    warn!(error = %e, "failed to re-enable synchronization");
                }
                return Err(fail(driver, "Data source not set").await);
            }

            let reconfigured = self.reconfigure_simulation(self.timings.normal_simulation()).await;
            let resynced = driver.set_synchronization(true).await;
            if let Err(e) = reconfigured {
                if let Err(sync_err) = resynced {
                    warn!(error = %sync_err, "failed to re-enable synchronization");
                }
                return Err(e);
            }
            resynced?;
            Ok(())
        })
        .await
    }

    /// Switches a running route simulation to the fast speed and slow update
    /// interval. Leaves other data sources untouched apart from restarting
    /// positioning.
    pub async fn increase_simulation_movement_speed(&self) -> Result<(), ActionError> {
        self.record(Step::IncreaseSimulationSpeed, async {
            self.reconfigure_simulation(self.timings.fast_simulation()).await
        })
        .await
    }

    /// Pauses the test for one minute.
    pub async fn sleep_one_minute(&self) -> Result<(), ActionError> {
        self.sleep(ONE_MINUTE).await
    }

    /// Pauses long enough for one simulated position update to reach the views.
    pub async fn sleep_until_views_updated(&self) -> Result<(), ActionError> {
        self.sleep(self.timings.views_update_delay()).await
    }

    /// Reads the ETA, trip duration and remaining distance from the
    /// estimated-arrival widget.
    pub async fn estimated_arrival_data(&self) -> Result<EtaData, ActionError> {
        self.record(Step::EstimatedArrival, async {
            let data = Condition::new(
                "Wait for ETA data",
                self.timings.short_wait(),
                self.timings.long_poll_interval(),
            )
            .wait_for(|| self.read_eta())
            .await;
            match data {
                Some(data) => {
                    info!(eta = %data.eta, tta = %data.tta, distance = %data.distance, "arrival data");
                    Ok(data)
                }
                None => Err(fail(self.driver(), "the data is not retrieved").await),
            }
        })
        .await
    }

    async fn sleep(&self, duration: Duration) -> Result<(), ActionError> {
        let step = Step::Sleep {
            seconds: duration.as_secs_f64(),
        };
        self.record(step, async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }

    async fn waypoint_map_without_destination(&self) -> Result<UIElement, ActionError> {
        let driver = self.driver();
        let map = interaction::assert_visible(driver, &Matcher::id(ids::WAYPOINT_MAP_VIEW)).await?;
        interaction::assert_visible(
            driver,
            &Matcher::containing_text(ids::TAP_THE_MAP_TO_SET_YOUR_DESTINATION),
        )
        .await?;
        Ok(map)
    }

    /// Stops positioning, applies `settings` if a route simulation is
    /// installed, and starts positioning again.
    ///
    /// Once positioning is stopped it is always restarted. A failed restart
    /// is only logged when applying the settings already failed.
    async fn reconfigure_simulation(
        &self,
        settings: SimulationSettings,
    ) -> Result<(), ActionError> {
        let driver = self.driver();
        driver.stop_positioning().await?;
        let applied = self.apply_simulation_settings(settings).await;
        let restarted = driver.start_positioning().await;
        if let Err(e) = applied {
            if let Err(start_err) = restarted {
                warn!(error = %start_err, "failed to restart positioning");
            }
            return Err(e.into());
        }
        restarted?;
        Ok(())
    }

    async fn apply_simulation_settings(&self, settings: SimulationSettings) -> Result<(), DriverError> {
        let driver = self.driver();
        let source = driver.position_source().await?;
        if source.is_route_simulation() {
            debug!(
                update_interval = settings.update_interval,
                movement_speed = settings.movement_speed,
                "configuring route simulation"
            );
            driver.configure_position_source(settings).await
        } else {
            debug!(kind = ?source.kind, "not a route simulation, leaving data source as is");
            Ok(())
        }
    }

    /// The label on the maneuver panel that shows the next address.
    async fn address_label(&self) -> Option<UIElement> {
        match interaction::select(
            self.driver(),
            &Matcher::id(ids::MANEUVER_VIEW_TEXT),
            ids::ADDRESS_LABEL_INDEX,
        )
        .await
        {
            Ok(label) => label,
            Err(e) => {
                debug!(error = %e, "address label lookup failed");
                None
            }
        }
    }

    async fn address_text(&self) -> Option<String> {
        self.address_label()
            .await
            .and_then(|label| label.text().map(str::to_string))
    }

    async fn address_text_color(&self) -> Option<Color> {
        self.address_label().await.and_then(|label| label.text_color)
    }

    /// Value-label text color and background color of the visible speed view.
    async fn speed_view_colors(&self) -> (Option<Color>, Option<Color>) {
        let view = match interaction::select(
            self.driver(),
            &Matcher::id(ids::CURRENT_SPEED_VIEW),
            ids::CURRENT_SPEED_INDEX,
        )
        .await
        {
            Ok(Some(view)) => view,
            Ok(None) => return (None, None),
            Err(e) => {
                debug!(error = %e, "speed view lookup failed");
                return (None, None);
            }
        };
        let label_color = matcher::find_first(&view.children, &Matcher::id(ids::SPEED_VALUE_LABEL))
            .and_then(|label| label.text_color);
        (label_color, view.background_color)
    }

    async fn read_eta(&self) -> Option<EtaData> {
        match interaction::select(self.driver(), &Matcher::id(ids::ESTIMATED_ARRIVAL_VIEW), 0).await {
            Ok(view) => view.as_ref().and_then(EtaData::from_view),
            Err(e) => {
                debug!(error = %e, "estimated arrival lookup failed");
                None
            }
        }
    }
}
