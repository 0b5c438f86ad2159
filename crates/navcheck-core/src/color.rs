//! Colors rendered by the navigation app and the palette the helpers compare against.
//!
//! The agent reports colors as hex strings (`#RRGGBB` or `#RRGGBBAA`). Arrival
//! and overspeed states are only observable through these colors, so the
//! palette values must match the app's color constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing a hex color string.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color must start with '#': {0}")]
    MissingHash(String),

    #[error("color must have 6 or 8 hex digits: {0}")]
    InvalidLength(String),

    #[error("invalid hex digits in color: {0}")]
    InvalidHex(String),
}

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(s.to_string()))?;
        if hex.len() != 6 && hex.len() != 8 {
            return Err(ColorParseError::InvalidLength(s.to_string()));
        }
        // from_str_radix alone would accept a sign such as "+1".
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidHex(s.to_string()));
        }
        let byte = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ColorParseError::InvalidHex(s.to_string()))
        };
        let a = if hex.len() == 8 { byte(6)? } else { 0xFF };
        Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, a))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xFF {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// The app color constants the guidance helpers assert against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Address label color once the destination is reached.
    pub accent_light: Color,
    /// Speed view color while overspeeding.
    pub negative: Color,
    /// Speed value label color during regular driving.
    pub foreground: Color,
    /// Speed view background during regular driving.
    pub background_brand: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            accent_light: Color::rgb(0x48, 0xDA, 0xD0),
            negative: Color::rgb(0xE6, 0x32, 0x00),
            foreground: Color::rgb(0x00, 0x00, 0x00),
            background_brand: Color::rgb(0x12, 0x1C, 0x2B),
        }
    }
}
