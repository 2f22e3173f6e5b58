//! Caption styling and placement.

use crate::fonts::default_font_family;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_FONT_SIZE: f32 = 50.0;
pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// One of the two caption slots.
///
/// The names are a convention: either caption can be dragged anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Top,
    Bottom,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Top, Slot::Bottom];

    pub fn index(self) -> usize {
        match self {
            Slot::Top => 0,
            Slot::Bottom => 1,
        }
    }

    pub fn default_anchor(self) -> Anchor {
        match self {
            Slot::Top => Anchor::new(0.5, 0.15),
            Slot::Bottom => Anchor::new(0.5, 0.85),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Top => write!(f, "top"),
            Slot::Bottom => write!(f, "bottom"),
        }
    }
}

/// Caption position as fractions of the image width and height.
///
/// Values are expected in `[0, 1]` but are not clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Position in pixels for an image of the given size.
    pub fn to_pixels(self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

impl FromStr for Anchor {
    type Err = String;

    /// Parses `x,y`, e.g. `0.5,0.15`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| format!("invalid coordinate '{}': {}", v.trim(), e))
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

/// Everything needed to draw one caption.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSpec {
    pub text: String,
    /// CSS-style family stack, e.g. `Impact, sans-serif`.
    pub font_family: String,
    pub font_size: f32,
    /// Fill colour as `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
    pub color: String,
    pub anchor: Anchor,
    /// Whether the caption currently has focus in the editor. Has no effect
    /// on drawing.
    pub active: bool,
}

impl CaptionSpec {
    /// The reset state of a slot.
    pub fn for_slot(slot: Slot) -> Self {
        Self {
            text: String::new(),
            font_family: default_font_family().to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR.to_string(),
            anchor: slot.default_anchor(),
            active: false,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// A caption is drawn only when it has text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Both slots at their defaults.
pub fn default_captions() -> [CaptionSpec; 2] {
    Slot::ALL.map(CaptionSpec::for_slot)
}
