//! Colour values as the engine sees them (opaque strings) and as the
//! terminal renderer needs them (RGB triples).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Rgb = (u8, u8, u8);

pub const WHITE: Rgb = (255, 255, 255);

/// An opaque colour string such as `#ffd700`.
///
/// The simulation never looks inside; only the renderer parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorValue(String);

impl ColorValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ColorValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ColorValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("empty color string")]
    Empty,
    #[error("invalid color length {0}, expected 3 or 6 hex digits")]
    InvalidLength(usize),
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("a palette needs at least one color")]
    Empty,
}

/// Parse `#RGB` or `#RRGGBB` (the `#` is optional).
pub fn parse_hex(value: &str) -> Result<Rgb, ColorError> {
    let hex = value.trim().trim_start_matches('#');
    if hex.is_empty() {
        return Err(ColorError::Empty);
    }
    if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(c));
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| ColorError::InvalidLength(hex.len()));

    match hex.len() {
        3 => {
            let r = channel(&hex[0..1])? * 17;
            let g = channel(&hex[1..2])? * 17;
            let b = channel(&hex[2..3])? * 17;
            Ok((r, g, b))
        }
        6 => Ok((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        n => Err(ColorError::InvalidLength(n)),
    }
}

/// An ordered, non-empty list of colours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColorValue>", into = "Vec<ColorValue>")]
pub struct Palette {
    colors: Vec<ColorValue>,
}

impl Palette {
    pub fn new(colors: Vec<ColorValue>) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[ColorValue] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Uniform pick.
    pub fn choose(&self, rng: &mut fastrand::Rng) -> &ColorValue {
        &self.colors[rng.usize(0..self.colors.len())]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec!["#ff0000".into(), "#ffd700".into(), "#ffffff".into()],
        }
    }
}

impl TryFrom<Vec<ColorValue>> for Palette {
    type Error = PaletteError;

    fn try_from(colors: Vec<ColorValue>) -> Result<Self, Self::Error> {
        Self::new(colors)
    }
}

impl From<Palette> for Vec<ColorValue> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}
