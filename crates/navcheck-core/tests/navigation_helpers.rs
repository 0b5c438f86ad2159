//! Behavior of the drive-navigation helpers against a scripted driver.
//!
//! All tests run on a paused clock: the scripted screens change at fixed
//! offsets and the helpers' timeouts elapse instantly, so the timing
//! assertions below are exact.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use common::*;
use navcheck_core::agent_driver::AgentDriver;
use navcheck_core::color::{Color, Palette};
use navcheck_core::ids;
use navcheck_core::interaction::{ActionError, LONG_PRESS_DURATION};
use navcheck_core::navigation::{DriveNavigation, Gesture, Maneuver, DEFAULT_DESTINATION_POINT};
use navcheck_core::simulation::{PositionSourceKind, SimulationSettings};
use navcheck_core::step::{Step, StepResult};

const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

fn accent() -> Color {
    Palette::default().accent_light
}

fn reason(err: &ActionError) -> String {
    match err {
        ActionError::Assertion { reason, .. } => reason.clone(),
        other => panic!("expected an assertion failure, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Alerts and static screens
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn dismiss_alert_waits_for_permissions_alert() {
    let driver = ScriptedDriver::new(vec![])
        .then_at(1.5, alert_screen(ids::PERMISSIONS_ALERT, &["Allow"]));
    let (nav, driver) = navigation(driver);
    let start = Instant::now();

    nav.dismiss_alert().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_millis(1500));
    assert_eq!(driver.calls(), vec![Call::DismissAlert(ids::PERMISSIONS_ALERT.to_string())]);
}

#[tokio::test(start_paused = true)]
async fn dismiss_alert_fails_when_alert_never_shows() {
    let (nav, driver) = navigation(ScriptedDriver::new(vec![]));
    let start = Instant::now();

    let err = nav.dismiss_alert().await.unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert!(reason(&err).contains(ids::PERMISSIONS_ALERT));
    assert!(driver.calls().is_empty(), "nothing may be dismissed");
}

#[tokio::test(start_paused = true)]
async fn select_action_taps_button_by_title() {
    let driver = ScriptedDriver::new(alert_screen(ids::SIMULATION_ALERT, &["Yes", "No"]));
    let (nav, driver) = navigation(driver);

    nav.select_action_on_simulation_alert("Yes").await.unwrap();

    assert_eq!(driver.calls(), vec![Call::TapByLabel("Yes".to_string())]);
}

#[tokio::test]
async fn route_overview_elements_visible() {
    let (nav, driver) = navigation(ScriptedDriver::new(route_overview_screen()));
    nav.check_route_overview_elements_are_visible().await.unwrap();
    assert_eq!(driver.dump_count(), 3);
}

#[tokio::test]
async fn route_overview_fails_on_hidden_start_button() {
    let mut screen = route_overview_screen();
    screen[0].children[1] = hidden(view(ids::START_NAVIGATION_BUTTON, vec![]));
    let (nav, _driver) = navigation(ScriptedDriver::new(screen));

    let err = nav.check_route_overview_elements_are_visible().await.unwrap_err();

    assert!(reason(&err).contains(ids::START_NAVIGATION_BUTTON));
    assert!(reason(&err).contains("not sufficiently visible"));
    assert_eq!(err.screenshot(), Some("cG5n"));
}

#[tokio::test]
async fn waypoint_map_requires_destination_hint() {
    let (nav, _driver) = navigation(ScriptedDriver::new(waypoint_screen()));
    nav.verify_waypoint_map_view_with_no_destination_is_visible().await.unwrap();

    let (nav, _driver) = navigation(ScriptedDriver::new(destination_set_screen()));
    let err = nav
        .verify_waypoint_map_view_with_no_destination_is_visible()
        .await
        .unwrap_err();
    assert!(reason(&err).contains(ids::TAP_THE_MAP_TO_SET_YOUR_DESTINATION));
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_destination_long_press_at_default_point() {
    let driver = ScriptedDriver::new(waypoint_screen()).after_gesture(destination_set_screen());
    let (nav, driver) = navigation(driver);

    nav.set_destination(Gesture::LongPress, DEFAULT_DESTINATION_POINT).await.unwrap();

    // Map frame starts at y=64.
    assert_eq!(driver.calls(), vec![Call::LongPress(110, 174, LONG_PRESS_DURATION)]);
}

#[tokio::test]
async fn set_destination_tap_at_custom_point() {
    let driver = ScriptedDriver::new(waypoint_screen()).after_gesture(destination_set_screen());
    let (nav, driver) = navigation(driver);

    nav.set_destination(Gesture::Tap, navcheck_core::element::Point::new(10.0, 20.0))
        .await
        .unwrap();

    assert_eq!(driver.calls(), vec![Call::TapLocation(10, 84)]);
}

#[tokio::test]
async fn set_destination_fails_when_prompt_stays() {
    let (nav, driver) = navigation(ScriptedDriver::new(waypoint_screen()));

    let err = nav.set_destination(Gesture::Tap, DEFAULT_DESTINATION_POINT).await.unwrap_err();

    assert_eq!(driver.calls().len(), 1, "the tap happens before the check");
    assert_eq!(
        reason(&err),
        format!("Element text containing '{}' is visible", ids::TAP_OR_LONG_PRESS_ON_THE_MAP)
    );
}

#[tokio::test]
async fn set_destination_does_not_touch_map_without_hint() {
    let (nav, driver) = navigation(ScriptedDriver::new(destination_set_screen()));
    assert!(nav.set_destination(Gesture::Tap, DEFAULT_DESTINATION_POINT).await.is_err());
    assert!(driver.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Maneuvers
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn maneuvers_checked_in_order() {
    let driver = ScriptedDriver::new(maneuver_screen("Invalidenstr.", "maneuver_icon_11", WHITE))
        .then_at(5.0, maneuver_screen("Chausseestr.", "maneuver_icon_4", WHITE));
    let (nav, _driver) = navigation(driver);
    let start = Instant::now();

    nav.check_displayed_maneuvers_during_simulation(
        &[
            Maneuver::new("Invalidenstr.", "maneuver_icon_11"),
            Maneuver::new("Chausseestr.", "maneuver_icon_4"),
        ],
        false,
    )
    .await
    .unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn maneuvers_fail_on_first_mismatch_without_skipping_ahead() {
    let driver = ScriptedDriver::new(maneuver_screen("Invalidenstr.", "maneuver_icon_11", WHITE))
        .then_at(5.0, maneuver_screen("Chausseestr.", "maneuver_icon_4", WHITE));
    let (nav, _driver) = navigation(driver);
    let start = Instant::now();

    // The third maneuver does show up, but the second never does.
    let err = nav
        .check_displayed_maneuvers_during_simulation(
            &[
                Maneuver::new("Invalidenstr.", "maneuver_icon_11"),
                Maneuver::new("Torstr.", "maneuver_icon_2"),
                Maneuver::new("Chausseestr.", "maneuver_icon_4"),
            ],
            false,
        )
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(120));
    assert_eq!(
        reason(&err),
        "Maneuver 2: address 'Torstr.' was not displayed after 120 seconds"
    );
}

#[tokio::test(start_paused = true)]
async fn maneuvers_do_not_go_back() {
    let driver = ScriptedDriver::new(maneuver_screen("Invalidenstr.", "maneuver_icon_11", WHITE))
        .then_at(5.0, maneuver_screen("Chausseestr.", "maneuver_icon_4", WHITE));
    let (nav, _driver) = navigation(driver);
    let start = Instant::now();

    let err = nav
        .check_displayed_maneuvers_during_simulation(
            &[
                Maneuver::new("Chausseestr.", "maneuver_icon_4"),
                Maneuver::new("Invalidenstr.", "maneuver_icon_11"),
            ],
            false,
        )
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(125));
    assert!(reason(&err).starts_with("Maneuver 2:"));
}

#[tokio::test(start_paused = true)]
async fn maneuver_icon_mismatch_fails_immediately() {
    let (nav, _driver) = navigation(ScriptedDriver::new(maneuver_screen(
        "Invalidenstr.",
        "maneuver_icon_11",
        WHITE,
    )));
    let start = Instant::now();

    let err = nav
        .check_displayed_maneuvers_during_simulation(
            &[Maneuver::new("Invalidenstr.", "maneuver_icon_99")],
            false,
        )
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(reason(&err).contains("maneuver_icon_99"));
}

#[tokio::test(start_paused = true)]
async fn maneuver_icon_index_depends_on_orientation() {
    let expected = [Maneuver::new("Invalidenstr.", "maneuver_icon_11")];

    let (nav, _driver) = navigation(ScriptedDriver::new(portrait_only_icon_screen(
        "Invalidenstr.",
        "maneuver_icon_11",
    )));
    nav.check_displayed_maneuvers_during_simulation(&expected, false)
        .await
        .unwrap();

    let err = nav
        .check_displayed_maneuvers_during_simulation(&expected, true)
        .await
        .unwrap_err();
    assert!(reason(&err).contains("Index 1 out of range"));

    let (nav, _driver) = navigation(ScriptedDriver::new(maneuver_screen(
        "Invalidenstr.",
        "maneuver_icon_11",
        WHITE,
    )));
    nav.check_displayed_maneuvers_during_simulation(&expected, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn empty_maneuver_list_passes() {
    let (nav, driver) = navigation(ScriptedDriver::new(vec![]));
    nav.check_displayed_maneuvers_during_simulation(&[], true).await.unwrap();
    assert_eq!(driver.dump_count(), 0);
}

// ---------------------------------------------------------------------------
// Arrival
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn wait_for_arrival_detects_accent_color() {
    let driver = ScriptedDriver::new(maneuver_screen("Invalidenstr.", "maneuver_icon_11", WHITE))
        .then_at(3.0, maneuver_screen("Invalidenstr.", "maneuver_icon_11", accent()));
    let (nav, _driver) = navigation(driver);
    let start = Instant::now();

    nav.wait_for_arrival().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn wait_for_arrival_times_out_after_three_minutes() {
    let (nav, _driver) = navigation(ScriptedDriver::new(maneuver_screen(
        "Invalidenstr.",
        "maneuver_icon_11",
        WHITE,
    )));
    let start = Instant::now();

    let err = nav.wait_for_arrival().await.unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(180));
    assert_eq!(reason(&err), "Destination was not reached after 180 seconds");
    assert_eq!(err.screenshot(), Some("cG5n"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_arrival_uses_configured_palette() {
    let green = Color::rgb(0, 0xFF, 0);
    let driver = ScriptedDriver::new(maneuver_screen("Invalidenstr.", "maneuver_icon_11", green));
    let nav = DriveNavigation::new(Arc::new(driver)).with_palette(Palette {
        accent_light: green,
        ..Palette::default()
    });
    nav.wait_for_arrival().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn has_arrived_reads_color_once_available() {
    let (nav, _driver) = navigation(ScriptedDriver::new(maneuver_screen(
        "Invalidenstr.",
        "maneuver_icon_11",
        accent(),
    )));
    assert!(nav.has_arrived().await.unwrap());

    let (nav, _driver) = navigation(ScriptedDriver::new(maneuver_screen(
        "Invalidenstr.",
        "maneuver_icon_11",
        WHITE,
    )));
    let start = Instant::now();
    assert!(!nav.has_arrived().await.unwrap());
    assert_eq!(start.elapsed(), Duration::ZERO, "a non-accent color is still an answer");
}

#[tokio::test(start_paused = true)]
async fn has_arrived_is_false_when_no_color_is_read() {
    let (nav, _driver) = navigation(ScriptedDriver::new(vec![]));
    let start = Instant::now();
    assert!(!nav.has_arrived().await.unwrap());
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn driver_errors_while_polling_count_as_not_met() {
    let nav = DriveNavigation::new(Arc::new(AgentDriver::new("localhost", 9800)));
    let start = Instant::now();
    assert!(!nav.has_arrived().await.unwrap());
    assert_eq!(start.elapsed(), Duration::from_secs(10));

    let err = nav.estimated_arrival_data().await.unwrap_err();
    assert_eq!(reason(&err), "the data is not retrieved");
    assert!(err.screenshot().is_none());
}

#[tokio::test]
async fn driver_errors_outside_polling_are_reported() {
    let nav = DriveNavigation::new(Arc::new(AgentDriver::new("localhost", 9800)));
    let err = nav.check_route_overview_elements_are_visible().await.unwrap_err();
    assert!(matches!(err, ActionError::Driver(_)));
    assert!(!err.is_assertion());
}

// ---------------------------------------------------------------------------
// Speeding
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn verify_speeding_waits_for_negative_color() {
    let palette = Palette::default();
    let driver = ScriptedDriver::new(speed_screen(palette.foreground, palette.background_brand))
        .then_at(2.5, speed_screen(palette.foreground, palette.negative));
    let (nav, _driver) = navigation(driver);
    let start = Instant::now();

    nav.verify_speeding(true).await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_millis(2500));
}

#[tokio::test(start_paused = true)]
async fn verify_not_speeding_accepts_either_regular_color() {
    let palette = Palette::default();
    let (nav, _driver) = navigation(ScriptedDriver::new(speed_screen(WHITE, palette.background_brand)));
    nav.verify_speeding(false).await.unwrap();

    let (nav, _driver) = navigation(ScriptedDriver::new(speed_screen(palette.foreground, WHITE)));
    nav.verify_speeding(false).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn verify_speeding_times_out_with_reason() {
    let palette = Palette::default();
    let (nav, _driver) = navigation(ScriptedDriver::new(speed_screen(palette.negative, palette.negative)));
    let start = Instant::now();

    let err = nav.verify_speeding(false).await.unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(60));
    assert_eq!(reason(&err), "Correct color was not displayed after waiting for 60 seconds");
}

#[tokio::test(start_paused = true)]
async fn verify_speeding_reads_second_speed_view() {
    // The first (hidden) speed view is grey; only the second one counts.
    let palette = Palette::default();
    let (nav, _driver) = navigation(ScriptedDriver::new(speed_screen(WHITE, WHITE)));
    assert!(nav.verify_speeding(true).await.is_err());
    assert!(nav.verify_speeding(false).await.is_err());

    let (nav, _driver) = navigation(ScriptedDriver::new(speed_screen(palette.negative, WHITE)));
    nav.verify_speeding(true).await.unwrap();
}

// ---------------------------------------------------------------------------
// Simulation control
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn adapt_simulation_reconfigures_route_simulation() {
    let driver = ScriptedDriver::new(vec![]).source_at(2.0, PositionSourceKind::RouteSimulation);
    let (nav, driver) = navigation(driver);
    let start = Instant::now();

    nav.adapt_simulation_to_automation().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert_eq!(
        driver.calls(),
        vec![
            Call::SetSynchronization(false),
            Call::StopPositioning,
            Call::ConfigurePositionSource(SimulationSettings {
                update_interval: 2.0,
                movement_speed: 15.0,
            }),
            Call::StartPositioning,
            Call::SetSynchronization(true),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn adapt_simulation_fails_without_data_source() {
    let driver = ScriptedDriver::new(vec![]).source_at(0.0, PositionSourceKind::Live);
    let (nav, driver) = navigation(driver);
    let start = Instant::now();

    let err = nav.adapt_simulation_to_automation().await.unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(reason(&err), "Data source not set");
    assert_eq!(
        driver.calls(),
        vec![Call::SetSynchronization(false), Call::SetSynchronization(true)]
    );
}

#[tokio::test]
async fn adapt_simulation_restores_positioning_and_sync_when_configuration_fails() {
    let driver = ScriptedDriver::new(vec![])
        .source_at(0.0, PositionSourceKind::RouteSimulation)
        .rejecting_configuration();
    let (nav, driver) = navigation(driver);

    let err = nav.adapt_simulation_to_automation().await.unwrap_err();

    assert!(matches!(err, ActionError::Driver(_)));
    assert!(err.to_string().contains("route simulation rejected settings"));
    assert_eq!(
        driver.calls(),
        vec![
            Call::SetSynchronization(false),
            Call::StopPositioning,
            Call::ConfigurePositionSource(SimulationSettings {
                update_interval: 2.0,
                movement_speed: 15.0,
            }),
            Call::StartPositioning,
            Call::SetSynchronization(true),
        ]
    );
    let steps = nav.steps().await;
    assert!(!steps[0].is_success());
}

#[tokio::test]
async fn increase_speed_restarts_positioning_when_configuration_fails() {
    let driver = ScriptedDriver::new(vec![])
        .source_at(0.0, PositionSourceKind::RouteSimulation)
        .rejecting_configuration();
    let (nav, driver) = navigation(driver);

    let err = nav.increase_simulation_movement_speed().await.unwrap_err();

    assert!(matches!(err, ActionError::Driver(_)));
    assert_eq!(driver.calls().last(), Some(&Call::StartPositioning));
}

#[tokio::test]
async fn increase_speed_configures_route_simulation() {
    let driver = ScriptedDriver::new(vec![]).source_at(0.0, PositionSourceKind::RouteSimulation);
    let (nav, driver) = navigation(driver);

    nav.increase_simulation_movement_speed().await.unwrap();

    assert_eq!(
        driver.calls(),
        vec![
            Call::StopPositioning,
            Call::ConfigurePositionSource(SimulationSettings {
                update_interval: 4.0,
                movement_speed: 40.0,
            }),
            Call::StartPositioning,
        ]
    );
}

#[tokio::test]
async fn increase_speed_leaves_other_sources_alone() {
    let driver = ScriptedDriver::new(vec![]).source_at(0.0, PositionSourceKind::Live);
    let (nav, driver) = navigation(driver);

    nav.increase_simulation_movement_speed().await.unwrap();

    assert_eq!(driver.calls(), vec![Call::StopPositioning, Call::StartPositioning]);
}

#[tokio::test(start_paused = true)]
async fn sleep_helpers_use_timings() {
    let (nav, _driver) = navigation(ScriptedDriver::new(vec![]));

    let start = Instant::now();
    nav.sleep_until_views_updated().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(3));

    let start = Instant::now();
    nav.sleep_one_minute().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(60));

    let steps = nav.steps().await;
    assert_eq!(steps[0].step, Step::Sleep { seconds: 3.0 });
    assert_eq!(steps[1].step, Step::Sleep { seconds: 60.0 });
}

// ---------------------------------------------------------------------------
// Estimated arrival
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn estimated_arrival_waits_for_all_fields() {
    let driver = ScriptedDriver::new(eta_screen("10:42", "", "4.2 km"))
        .then_at(2.0, eta_screen("10:42", "12 min", "4.2 km"));
    let (nav, _driver) = navigation(driver);
    let start = Instant::now();

    let data = nav.estimated_arrival_data().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(2));
    assert_eq!(data.eta, "10:42");
    assert_eq!(data.tta, "12 min");
    assert_eq!(data.distance, "4.2 km");
}

#[tokio::test(start_paused = true)]
async fn estimated_arrival_never_returns_empty_fields() {
    let (nav, _driver) = navigation(ScriptedDriver::new(eta_screen("", "12 min", "4.2 km")));
    let start = Instant::now();

    let err = nav.estimated_arrival_data().await.unwrap_err();

    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert_eq!(reason(&err), "the data is not retrieved");
}

// ---------------------------------------------------------------------------
// Step log
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn steps_record_results_and_data() {
    let (nav, _driver) = navigation(ScriptedDriver::new(maneuver_screen(
        "Invalidenstr.",
        "maneuver_icon_11",
        accent(),
    )));

    assert!(nav.has_arrived().await.unwrap());
    assert!(nav.estimated_arrival_data().await.is_err());

    let steps = nav.take_steps().await;
    assert_eq!(steps.len(), 2);

    assert_eq!(steps[0].step, Step::HasArrived);
    assert!(steps[0].is_success());
    assert_eq!(steps[0].data, Some(serde_json::json!(true)));

    assert_eq!(steps[1].step, Step::EstimatedArrival);
    assert_eq!(
        steps[1].result,
        StepResult::Failure("the data is not retrieved".to_string())
    );
    assert_eq!(steps[1].screenshot.as_deref(), Some("cG5n"));
    assert_eq!(steps[1].duration_ms, Some(10_000));

    assert!(nav.steps().await.is_empty(), "take_steps drains the log");
}
