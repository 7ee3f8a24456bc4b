//! Desktop driver: the screen-capture, OCR and input-injection primitives
//! the built-in capabilities are layered over.
//!
//! The engine never performs OCR or image matching itself; a platform
//! backend implements [`DesktopDriver`]. [`HeadlessDriver`] is used when no
//! backend is available and fails every primitive.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

impl FromStr for MouseButton {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            other => Err(CapabilityError::InvalidArgument(format!(
                "unknown mouse button '{}' (expected left, right or middle)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Centre of a recognised word on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMatch {
    pub x: i64,
    pub y: i64,
    pub confidence: f64,
}

/// Full-screen OCR result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenText {
    pub width: u32,
    pub height: u32,
    pub text: String,
}

/// Screen rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Region {
    /// Rectangle spanned by two corners; the second must lie below-right of the first.
    pub fn from_corners(x1: i64, y1: i64, x2: i64, y2: i64) -> Result<Self, CapabilityError> {
        if x2 <= x1 || y2 <= y1 {
            return Err(CapabilityError::InvalidArgument(format!(
                "empty region ({}, {}) -> ({}, {})",
                x1, y1, x2, y2
            )));
        }
        let (width, height) = x2
            .checked_sub(x1)
            .zip(y2.checked_sub(y1))
            .ok_or_else(|| {
                CapabilityError::InvalidArgument(format!(
                    "region ({}, {}) -> ({}, {}) is out of range",
                    x1, y1, x2, y2
                ))
            })?;
        Ok(Self {
            left: x1,
            top: y1,
            width,
            height,
        })
    }
}

/// Blocking desktop primitives.
///
/// Calls run on the engine's single execution thread; implementations may
/// block for as long as the primitive takes.
pub trait DesktopDriver: Send + Sync {
    fn save_screenshot(&self, path: &Path) -> Result<(), CapabilityError>;

    fn read_screen(&self) -> Result<ScreenText, CapabilityError>;

    /// Case-insensitive search for `target` among recognised words.
    fn find_text(&self, target: &str) -> Result<Option<TextMatch>, CapabilityError>;

    fn read_region(&self, region: Region) -> Result<String, CapabilityError>;

    fn click(&self, x: i64, y: i64, button: MouseButton) -> Result<(), CapabilityError>;

    fn type_text(&self, text: &str, interval: Duration) -> Result<(), CapabilityError>;

    fn paste_text(&self, text: &str) -> Result<(), CapabilityError>;

    fn press_hotkey(&self, keys: &[String]) -> Result<(), CapabilityError>;

    /// Centre of the best match of a PNG template above `confidence`.
    fn locate_image(
        &self,
        template_png: &[u8],
        confidence: f64,
    ) -> Result<Option<(i64, i64)>, CapabilityError>;
}

/// Driver for environments without a desktop session.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDriver;

impl HeadlessDriver {
    fn unavailable<T>(&self, primitive: &str) -> Result<T, CapabilityError> {
        Err(CapabilityError::Unavailable(format!(
            "no desktop backend for '{}'",
            primitive
        )))
    }
}

impl DesktopDriver for HeadlessDriver {
    fn save_screenshot(&self, _path: &Path) -> Result<(), CapabilityError> {
        self.unavailable("screenshot")
    }

    fn read_screen(&self) -> Result<ScreenText, CapabilityError> {
        self.unavailable("ocr")
    }

    fn find_text(&self, _target: &str) -> Result<Option<TextMatch>, CapabilityError> {
        self.unavailable("ocr")
    }

    fn read_region(&self, _region: Region) -> Result<String, CapabilityError> {
        self.unavailable("ocr")
    }

    fn click(&self, _x: i64, _y: i64, _button: MouseButton) -> Result<(), CapabilityError> {
        self.unavailable("mouse")
    }

    fn type_text(&self, _text: &str, _interval: Duration) -> Result<(), CapabilityError> {
        self.unavailable("keyboard")
    }

    fn paste_text(&self, _text: &str) -> Result<(), CapabilityError> {
        self.unavailable("clipboard")
    }

    fn press_hotkey(&self, _keys: &[String]) -> Result<(), CapabilityError> {
        self.unavailable("keyboard")
    }

    fn locate_image(
        &self,
        _template_png: &[u8],
        _confidence: f64,
    ) -> Result<Option<(i64, i64)>, CapabilityError> {
        self.unavailable("image matching")
    }
}
