//! UI element types reported by the automation agent.
//!
//! The agent serializes the navigation app's accessibility hierarchy as JSON.
//! Besides the usual accessibility attributes it reports the rendered text and
//! background colors of labels and views, which the guidance helpers need to
//! detect arrival and overspeed states.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Represents a UI element from the accessibility hierarchy.
///
/// Elements form a tree via the `children` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    /// The unique accessibility identifier for this element (AXUniqueId).
    #[serde(rename = "AXUniqueId", default)]
    pub identifier: Option<String>,

    /// The accessibility label (AXLabel). For labels this is the displayed text.
    #[serde(rename = "AXLabel", default)]
    pub label: Option<String>,

    /// The current value of the element (AXValue).
    #[serde(rename = "AXValue", default)]
    pub value: Option<String>,

    /// The type of UI element (e.g., "Button", "StaticText", "Map").
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,

    /// The element's frame in screen coordinates.
    #[serde(default)]
    pub frame: Option<ElementFrame>,

    /// Whether the agent considers the element hittable.
    #[serde(default)]
    pub hittable: Option<bool>,

    /// Rendered text color, for text-bearing elements.
    #[serde(rename = "textColor", default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<Color>,

    /// Rendered background color.
    #[serde(rename = "backgroundColor", default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,

    /// Child elements nested within this element.
    #[serde(default)]
    pub children: Vec<UIElement>,
}

impl UIElement {
    /// The text displayed by this element: its label, falling back to its value.
    pub fn text(&self) -> Option<&str> {
        self.label.as_deref().or(self.value.as_deref())
    }

    /// Returns true if the element would be considered visible on screen.
    ///
    /// An element is visible when the agent did not flag it as non-hittable
    /// and its frame, if reported, covers a positive area.
    pub fn is_sufficiently_visible(&self) -> bool {
        if self.hittable == Some(false) {
            return false;
        }
        self.frame.as_ref().map_or(true, |f| f.width > 0.0 && f.height > 0.0)
    }
}

/// The frame (position and dimensions) of a UI element.
///
/// Coordinates are in screen points, with the origin at the top-left
/// corner of the screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementFrame {
    /// Converts a point relative to this frame's origin into screen coordinates.
    pub fn absolute(&self, point: Point) -> (i32, i32) {
        ((self.x + point.x).round() as i32, (self.y + point.y).round() as i32)
    }
}

/// A point in screen points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
