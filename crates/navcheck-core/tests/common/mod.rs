//! Shared test helpers for navcheck-core integration tests.
//!
//! Two kinds of fixtures live here: a mock TCP agent that speaks the binary
//! protocol, and a [`ScriptedDriver`] whose screens change on a paused-clock
//! timeline so that the polling helpers can be tested without waiting.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::Instant;

use navcheck_core::agent_driver::AgentDriver;
use navcheck_core::color::Color;
use navcheck_core::driver::{AutomationDriver, DriverError};
use navcheck_core::element::{ElementFrame, UIElement};
use navcheck_core::ids;
use navcheck_core::navigation::DriveNavigation;
use navcheck_core::protocol::{decode_request, encode_response, read_frame_length, Request, Response};
use navcheck_core::simulation::{PositionSource, PositionSourceKind, SimulationSettings};

// ---------------------------------------------------------------------------
// Mock TCP agent
// ---------------------------------------------------------------------------

/// Start a mock TCP agent that accepts one connection, answers the heartbeat
/// sent by `AgentDriver::connect()` with `Ok`, then replies to each following
/// request with the next canned response.
///
/// Every decoded request after the heartbeat is forwarded on the returned
/// channel so tests can assert on what the helpers sent.
pub async fn mock_agent(responses: Vec<Response>) -> (SocketAddr, mpsc::UnboundedReceiver<Request>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        for response in std::iter::once(Response::Ok).chain(responses) {
            // Read one request frame: 4-byte LE header + payload.
            let mut header = [0u8; 4];
            if stream.read_exact(&mut header).await.is_err() {
                return;
            }
            let len = read_frame_length(&header) as usize;
            let mut payload = vec![0u8; len];
            if stream.read_exact(&mut payload).await.is_err() {
                return;
            }

            let request = decode_request(&payload).unwrap();
            if request != Request::Heartbeat {
                let _ = tx.send(request);
            }

            let _ = stream.write_all(&encode_response(&response)).await;
            let _ = stream.flush().await;
        }
    });

    (addr, rx)
}

/// Convenience: helpers backed by an `AgentDriver` connected to a mock agent.
pub async fn connected_navigation(
    responses: Vec<Response>,
) -> (DriveNavigation, mpsc::UnboundedReceiver<Request>) {
    let (addr, rx) = mock_agent(responses).await;
    let mut driver = AgentDriver::new(addr.ip().to_string(), addr.port());
    driver.connect().await.unwrap();
    (DriveNavigation::new(Arc::new(driver)), rx)
}

/// Drains every request the mock agent has received so far.
pub fn received(rx: &mut mpsc::UnboundedReceiver<Request>) -> Vec<Request> {
    let mut requests = Vec::new();
    while let Ok(request) = rx.try_recv() {
        requests.push(request);
    }
    requests
}

pub fn tree_response(screen: &[UIElement]) -> Response {
    Response::Tree {
        json: serde_json::to_string(screen).unwrap(),
    }
}

pub fn position_source_response(source: &PositionSource) -> Response {
    Response::PositionSource {
        json: serde_json::to_string(source).unwrap(),
    }
}

// ---------------------------------------------------------------------------
// Scripted driver
// ---------------------------------------------------------------------------

/// A driver call that changes app state, as recorded by [`ScriptedDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    TapLocation(i32, i32),
    TapByLabel(String),
    LongPress(i32, i32, f64),
    DismissAlert(String),
    SetSynchronization(bool),
    ConfigurePositionSource(SimulationSettings),
    StopPositioning,
    StartPositioning,
}

/// In-process driver whose screens and position sources follow a timeline.
///
/// Each timeline entry takes effect at its offset from the driver's creation
/// and stays in effect until the next one. Use with `start_paused = true` so
/// that the offsets line up exactly with the helpers' poll intervals.
pub struct ScriptedDriver {
    created: Instant,
    screens: Vec<(Duration, Vec<UIElement>)>,
    after_gesture: Option<Vec<UIElement>>,
    sources: Vec<(Duration, PositionSource)>,
    reject_configuration: bool,
    calls: Mutex<Vec<Call>>,
    dumps: Mutex<usize>,
}

impl ScriptedDriver {
    pub fn new(screen: Vec<UIElement>) -> Self {
        Self {
            created: Instant::now(),
            screens: vec![(Duration::ZERO, screen)],
            after_gesture: None,
            sources: vec![(Duration::ZERO, source(PositionSourceKind::Unset))],
            reject_configuration: false,
            calls: Mutex::new(Vec::new()),
            dumps: Mutex::new(0),
        }
    }

    /// Shows `screen` from `secs` seconds after creation onward.
    pub fn then_at(mut self, secs: f64, screen: Vec<UIElement>) -> Self {
        self.screens.push((Duration::from_secs_f64(secs), screen));
        self
    }

    /// Shows `screen` once a tap or long press has been performed.
    pub fn after_gesture(mut self, screen: Vec<UIElement>) -> Self {
        self.after_gesture = Some(screen);
        self
    }

    /// Reports `kind` as the position source from `secs` seconds onward.
    pub fn source_at(mut self, secs: f64, kind: PositionSourceKind) -> Self {
        self.sources.push((Duration::from_secs_f64(secs), source(kind)));
        self
    }

    /// Makes every `configure_position_source` call fail after recording it.
    pub fn rejecting_configuration(mut self) -> Self {
        self.reject_configuration = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn dump_count(&self) -> usize {
        *self.dumps.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn gestured(&self) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, Call::TapLocation(..) | Call::LongPress(..)))
    }

    fn current<'a, T>(&self, timeline: &'a [(Duration, T)]) -> &'a T {
        let elapsed = self.created.elapsed();
        timeline
            .iter()
            .rev()
            .find(|(at, _)| *at <= elapsed)
            .map(|(_, value)| value)
            .unwrap_or(&timeline[0].1)
    }
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn tap_location(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.record(Call::TapLocation(x, y));
        Ok(())
    }

    async fn tap_by_label(&self, label: &str) -> Result<(), DriverError> {
        self.record(Call::TapByLabel(label.to_string()));
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32, duration: f64) -> Result<(), DriverError> {
        self.record(Call::LongPress(x, y, duration));
        Ok(())
    }

    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        *self.dumps.lock().unwrap() += 1;
        if let Some(screen) = &self.after_gesture {
            if self.gestured() {
                return Ok(screen.clone());
            }
        }
        Ok(self.current(&self.screens).clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(b"png".to_vec())
    }

    async fn dismiss_alert(&self, identifier: &str) -> Result<(), DriverError> {
        self.record(Call::DismissAlert(identifier.to_string()));
        Ok(())
    }

    async fn set_synchronization(&self, enabled: bool) -> Result<(), DriverError> {
        self.record(Call::SetSynchronization(enabled));
        Ok(())
    }

    async fn position_source(&self) -> Result<PositionSource, DriverError> {
        Ok(self.current(&self.sources).clone())
    }

    async fn configure_position_source(&self, settings: SimulationSettings) -> Result<(), DriverError> {
        self.record(Call::ConfigurePositionSource(settings));
        if self.reject_configuration {
            return Err(DriverError::CommandFailed("route simulation rejected settings".to_string()));
        }
        Ok(())
    }

    async fn stop_positioning(&self) -> Result<(), DriverError> {
        self.record(Call::StopPositioning);
        Ok(())
    }

    async fn start_positioning(&self) -> Result<(), DriverError> {
        self.record(Call::StartPositioning);
        Ok(())
    }
}

/// Helpers over a shared scripted driver, so tests can inspect its calls.
pub fn navigation(driver: ScriptedDriver) -> (DriveNavigation, Arc<ScriptedDriver>) {
    let driver = Arc::new(driver);
    (DriveNavigation::new(driver.clone()), driver)
}

pub fn source(kind: PositionSourceKind) -> PositionSource {
    PositionSource {
        kind,
        update_interval: Some(0.1),
        movement_speed: Some(10.0),
    }
}

// ---------------------------------------------------------------------------
// Screen builders
// ---------------------------------------------------------------------------

pub fn view(id: &str, children: Vec<UIElement>) -> UIElement {
    UIElement {
        identifier: Some(id.to_string()),
        frame: Some(ElementFrame { x: 0.0, y: 0.0, width: 375.0, height: 80.0 }),
        hittable: Some(true),
        children,
        ..Default::default()
    }
}

pub fn text(id: &str, text: &str) -> UIElement {
    UIElement {
        label: Some(text.to_string()),
        element_type: Some("StaticText".to_string()),
        ..view(id, vec![])
    }
}

pub fn colored_text(id: &str, label: &str, color: Color) -> UIElement {
    UIElement {
        text_color: Some(color),
        ..text(id, label)
    }
}

pub fn hidden(element: UIElement) -> UIElement {
    UIElement {
        hittable: Some(false),
        ..element
    }
}

/// Maneuver panel in both orientations. The address label is the third
/// maneuver text label in document order.
pub fn maneuver_screen(address: &str, icon: &str, address_color: Color) -> Vec<UIElement> {
    let panel = || {
        view(
            ids::MANEUVER_VIEW,
            vec![
                view(icon, vec![]),
                text(ids::MANEUVER_VIEW_TEXT, "200 m"),
                text(ids::MANEUVER_VIEW_TEXT, "Turn right onto"),
                colored_text(ids::MANEUVER_VIEW_TEXT, address, address_color),
            ],
        )
    };
    vec![view("root", vec![panel(), panel()])]
}

/// Maneuver panel with the icon only in the portrait variant.
pub fn portrait_only_icon_screen(address: &str, icon: &str) -> Vec<UIElement> {
    let white = Color::rgb(0xFF, 0xFF, 0xFF);
    vec![view(
        "root",
        vec![
            view(
                ids::MANEUVER_VIEW,
                vec![
                    view(icon, vec![]),
                    text(ids::MANEUVER_VIEW_TEXT, "200 m"),
                    text(ids::MANEUVER_VIEW_TEXT, "Turn right onto"),
                    colored_text(ids::MANEUVER_VIEW_TEXT, address, white),
                ],
            ),
            view(ids::MANEUVER_VIEW, vec![]),
        ],
    )]
}

/// Two speed views; the second one is the one the helpers read.
pub fn speed_screen(label_color: Color, background: Color) -> Vec<UIElement> {
    let grey = Color::rgb(0x80, 0x80, 0x80);
    let speed_view = |label: Color, bg: Color| UIElement {
        background_color: Some(bg),
        ..view(
            ids::CURRENT_SPEED_VIEW,
            vec![colored_text(ids::SPEED_VALUE_LABEL, "50", label)],
        )
    };
    vec![view(
        "root",
        vec![hidden(speed_view(grey, grey)), speed_view(label_color, background)],
    )]
}

pub fn eta_screen(eta: &str, tta: &str, distance: &str) -> Vec<UIElement> {
    vec![view(
        ids::ESTIMATED_ARRIVAL_VIEW,
        vec![
            text(ids::ETA_LABEL, eta),
            text(ids::DURATION_LABEL, tta),
            text(ids::DISTANCE_LABEL, distance),
        ],
    )]
}

/// Waypoint map at y=64 with both destination hints shown.
pub fn waypoint_screen() -> Vec<UIElement> {
    vec![
        UIElement {
            frame: Some(ElementFrame { x: 0.0, y: 64.0, width: 375.0, height: 600.0 }),
            ..view(ids::WAYPOINT_MAP_VIEW, vec![])
        },
        text("hint", ids::TAP_THE_MAP_TO_SET_YOUR_DESTINATION),
        text("prompt", ids::TAP_OR_LONG_PRESS_ON_THE_MAP),
    ]
}

/// Waypoint map after a destination marker was dropped.
pub fn destination_set_screen() -> Vec<UIElement> {
    vec![
        UIElement {
            frame: Some(ElementFrame { x: 0.0, y: 64.0, width: 375.0, height: 600.0 }),
            ..view(ids::WAYPOINT_MAP_VIEW, vec![])
        },
        text("address", "Invalidenstr. 116, 10115 Berlin"),
    ]
}

pub fn route_overview_screen() -> Vec<UIElement> {
    vec![view(
        "root",
        vec![
            view(ids::BACK_BUTTON, vec![]),
            view(ids::START_NAVIGATION_BUTTON, vec![]),
            view(ids::DRIVE_NAV_MAP_VIEW, vec![]),
        ],
    )]
}

pub fn alert_screen(id: &str, buttons: &[&str]) -> Vec<UIElement> {
    vec![view(
        id,
        buttons.iter().map(|title| text("button", title)).collect(),
    )]
}
