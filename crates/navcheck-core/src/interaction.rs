//! Element selection, visibility assertions and gestures on top of an
//! [`AutomationDriver`].
//!
//! These are the building blocks the guidance helpers are written in. Each
//! selection fetches a fresh hierarchy from the driver, so results always
//! reflect the current screen.

use std::time::Duration;

use base64::Engine;
use thiserror::Error;
use tracing::{debug, warn};

use crate::driver::{AutomationDriver, DriverError};
use crate::element::{Point, UIElement};
use crate::matcher::Matcher;
use crate::wait::Condition;

/// How long a long press holds, in seconds.
pub const LONG_PRESS_DURATION: f64 = 0.7;

/// Errors produced by the guidance helpers.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The app did not reach the expected state.
    #[error("{reason}")]
    Assertion {
        reason: String,
        /// Screenshot taken at the moment of failure (base64-encoded PNG).
        screenshot: Option<String>,
    },

    /// Talking to the agent failed outside of a polling loop.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ActionError {
    pub fn is_assertion(&self) -> bool {
        matches!(self, ActionError::Assertion { .. })
    }

    pub fn screenshot(&self) -> Option<&str> {
        match self {
            ActionError::Assertion { screenshot, .. } => screenshot.as_deref(),
            ActionError::Driver(_) => None,
        }
    }
}

/// Builds an assertion failure, attaching a screenshot when one can be taken.
pub async fn fail(driver: &dyn AutomationDriver, reason: impl Into<String>) -> ActionError {
    let reason = reason.into();
    let screenshot = match driver.screenshot().await {
        Ok(bytes) if !bytes.is_empty() => {
            Some(base64::engine::general_purpose::STANDARD.encode(&bytes))
        }
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "failure screenshot unavailable");
            None
        }
    };
    warn!(reason = %reason, has_screenshot = screenshot.is_some(), "assertion failed");
    ActionError::Assertion { reason, screenshot }
}

/// Selects the `index`-th element (in document order) matching `matcher`.
pub async fn select(
    driver: &dyn AutomationDriver,
    matcher: &Matcher,
    index: usize,
) -> Result<Option<UIElement>, DriverError> {
    Ok(driver.find_all(matcher).await?.into_iter().nth(index))
}

/// Asserts that the `index`-th element matching `matcher` is sufficiently
/// visible, returning it.
pub async fn assert_visible_at(
    driver: &dyn AutomationDriver,
    matcher: &Matcher,
    index: usize,
) -> Result<UIElement, ActionError> {
    let matches = driver.find_all(matcher).await?;
    visible_at(driver, matcher, matches, index).await
}

/// Asserts that exactly one element matches `matcher` and that it is
/// sufficiently visible.
pub async fn assert_visible(
    driver: &dyn AutomationDriver,
    matcher: &Matcher,
) -> Result<UIElement, ActionError> {
    let matches = driver.find_all(matcher).await?;
    if matches.len() > 1 {
        return Err(fail(
            driver,
            format!("{} elements match {}, expected exactly one", matches.len(), matcher),
        )
        .await);
    }
    visible_at(driver, matcher, matches, 0).await
}

async fn visible_at(
    driver: &dyn AutomationDriver,
    matcher: &Matcher,
    matches: Vec<UIElement>,
    index: usize,
) -> Result<UIElement, ActionError> {
    let count = matches.len();
    let reason = match matches.into_iter().nth(index) {
        Some(element) if element.is_sufficiently_visible() => return Ok(element),
        Some(_) => format!("Element {} at index {} is not sufficiently visible", matcher, index),
        None if count == 0 => format!("No element found matching {}", matcher),
        None => format!("Index {} out of range: {} element(s) match {}", index, count, matcher),
    };
    Err(fail(driver, reason).await)
}

/// Asserts that no element matching `matcher` is visible. Absent elements pass.
pub async fn assert_not_visible(
    driver: &dyn AutomationDriver,
    matcher: &Matcher,
) -> Result<(), ActionError> {
    let matches = driver.find_all(matcher).await?;
    if matches.iter().any(UIElement::is_sufficiently_visible) {
        return Err(fail(driver, format!("Element {} is visible", matcher)).await);
    }
    Ok(())
}

/// Polls until an element matching `matcher` is visible.
///
/// Driver errors while polling count as "not visible yet".
pub async fn wait_until_visible(
    driver: &dyn AutomationDriver,
    matcher: &Matcher,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<UIElement, ActionError> {
    let condition = Condition::new(format!("{} visible", matcher), timeout, poll_interval);
    let found = condition
        .wait_for(move || async move {
            match driver.find_all(matcher).await {
                Ok(matches) => matches.into_iter().find(UIElement::is_sufficiently_visible),
                Err(e) => {
                    debug!(error = %e, "visibility probe failed");
                    None
                }
            }
        })
        .await;
    match found {
        Some(element) => Ok(element),
        None => Err(fail(
            driver,
            format!(
                "Element {} did not become visible within {} seconds",
                matcher,
                timeout.as_secs_f64()
            ),
        )
        .await),
    }
}

/// Resolves `point`, relative to `element`'s frame, to screen coordinates.
async fn screen_point(
    driver: &dyn AutomationDriver,
    element: &UIElement,
    point: Point,
) -> Result<(i32, i32), ActionError> {
    match element.frame {
        Some(frame) => Ok(frame.absolute(point)),
        None => Err(fail(
            driver,
            format!(
                "Element {} has no frame to tap in",
                element.identifier.as_deref().unwrap_or("<unnamed>")
            ),
        )
        .await),
    }
}

/// Taps at `point` relative to `element`'s frame.
pub async fn tap_in(
    driver: &dyn AutomationDriver,
    element: &UIElement,
    point: Point,
) -> Result<(), ActionError> {
    let (x, y) = screen_point(driver, element, point).await?;
    debug!(x, y, "tap");
    driver.tap_location(x, y).await?;
    Ok(())
}

/// Long-presses at `point` relative to `element`'s frame.
pub async fn long_press_in(
    driver: &dyn AutomationDriver,
    element: &UIElement,
    point: Point,
) -> Result<(), ActionError> {
    let (x, y) = screen_point(driver, element, point).await?;
    debug!(x, y, duration = LONG_PRESS_DURATION, "long press");
    driver.long_press(x, y, LONG_PRESS_DURATION).await?;
    Ok(())
}
