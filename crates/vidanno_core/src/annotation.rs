//! Annotation data model.
//!
//! This module provides the core record types for frame annotations:
//! - `AnnotationKind`: the closed set of shapes (point, circle, rectangle, text)
//! - `Argb`: an ARGB color with a `#aarrggbb` wire representation
//! - `AnnotationStyle`: optional per-annotation style overrides
//! - `Annotation`: one normalized geometric + styling record
//!
//! All coordinates are normalized to the source image (`0.0..=1.0`), so an
//! annotation stays valid across zoom, pan and image resize.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Kind
// ============================================================================

/// The shape of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// A single marker. Only `(x2, y2)` is meaningful.
    Point,
    /// A circle with center `(x, y)` and a rim point `(x2, y2)`.
    Circle,
    /// An axis-aligned box with sorted corners.
    #[default]
    Rectangle,
    /// A labelled box; same geometry as `Rectangle`.
    Text,
}

impl AnnotationKind {
    /// Wire name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Point => "point",
            AnnotationKind::Circle => "circle",
            AnnotationKind::Rectangle => "rectangle",
            AnnotationKind::Text => "text",
        }
    }

    /// All kinds, in the order the drawing tools list them.
    pub fn all() -> &'static [AnnotationKind] {
        &[
            AnnotationKind::Rectangle,
            AnnotationKind::Text,
            AnnotationKind::Circle,
            AnnotationKind::Point,
        ]
    }

    /// Whether this kind stores a sorted axis-aligned box.
    pub fn is_boxed(&self) -> bool {
        matches!(self, AnnotationKind::Rectangle | AnnotationKind::Text)
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnnotationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown annotation kind '{}'", s))
    }
}

// ============================================================================
// Color
// ============================================================================

/// An 8-bit ARGB color.
///
/// Serialized as `"#aarrggbb"`. Deserialization also accepts `"#rrggbb"`
/// and `[r, g, b]` / `[r, g, b, a]` arrays, which is what detectors emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Argb {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Argb {
    pub const TRANSPARENT: Argb = Argb::new(0, 0, 0, 0);
    pub const GREEN: Argb = Argb::rgb(0, 255, 0);

    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(255, r, g, b)
    }

    /// Parse `#rrggbb` or `#aarrggbb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Lowercase `#aarrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
    }

    /// RGB complement with the given alpha. Used as the label background
    /// when no explicit text fill is set.
    pub fn inverted(&self, alpha: u8) -> Self {
        Self::new(alpha, 255 - self.r, 255 - self.g, 255 - self.b)
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Argb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Argb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArgbVisitor;

        impl<'de> Visitor<'de> for ArgbVisitor {
            type Value = Argb;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a \"#aarrggbb\" string or an [r, g, b(, a)] array")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Argb, E> {
                Argb::from_hex(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Argb, A::Error> {
                let mut channels: Vec<u8> = Vec::with_capacity(4);
                while let Some(channel) = seq.next_element::<u8>()? {
                    channels.push(channel);
                }
                match channels[..] {
                    [r, g, b] => Ok(Argb::rgb(r, g, b)),
                    [r, g, b, a] => Ok(Argb::new(a, r, g, b)),
                    _ => Err(de::Error::invalid_length(channels.len(), &self)),
                }
            }
        }

        deserializer.deserialize_any(ArgbVisitor)
    }
}

// ============================================================================
// Style overrides
// ============================================================================

/// Optional per-annotation style. Unset fields fall back to the global
/// defaults at render time (see [`crate::style::StyleDefaults::resolve`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_fill_color: Option<Argb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    /// Font size as a fraction of frame height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Line thickness as a fraction of frame height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
}

impl AnnotationStyle {
    /// True when no override is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// Annotation
// ============================================================================

/// A single annotation on a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub style: AnnotationStyle,
}

impl Annotation {
    /// Create an annotation from raw corners. No ordering is applied;
    /// call [`Annotation::finalize`] once the geometry is final.
    pub fn new(kind: AnnotationKind, x: f64, y: f64, x2: f64, y2: f64) -> Self {
        Self {
            kind,
            x,
            y,
            x2,
            y2,
            text: None,
            style: AnnotationStyle::default(),
        }
    }

    /// A point marker at `(x, y)`.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(AnnotationKind::Point, x, y, x, y)
    }

    /// A circle centered at `(cx, cy)` passing through `(rim_x, rim_y)`.
    pub fn circle(cx: f64, cy: f64, rim_x: f64, rim_y: f64) -> Self {
        Self::new(AnnotationKind::Circle, cx, cy, rim_x, rim_y)
    }

    /// A finalized rectangle spanning the two corners.
    pub fn rectangle(x: f64, y: f64, x2: f64, y2: f64) -> Self {
        Self::new(AnnotationKind::Rectangle, x, y, x2, y2).finalized()
    }

    /// A finalized text box spanning the two corners.
    pub fn text_box(x: f64, y: f64, x2: f64, y2: f64, text: impl Into<String>) -> Self {
        Self::new(AnnotationKind::Text, x, y, x2, y2)
            .finalized()
            .with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_color(mut self, color: Argb) -> Self {
        self.style.color = Some(color);
        self
    }

    /// Sort the corners of boxed kinds so that `x <= x2` and `y <= y2`.
    /// Points and circles keep their stored order.
    pub fn finalize(&mut self) {
        if self.kind.is_boxed() {
            if self.x > self.x2 {
                std::mem::swap(&mut self.x, &mut self.x2);
            }
            if self.y > self.y2 {
                std::mem::swap(&mut self.y, &mut self.y2);
            }
        }
    }

    pub fn finalized(mut self) -> Self {
        self.finalize();
        self
    }

    /// Whether the corner-order invariant holds for this kind.
    pub fn is_finalized(&self) -> bool {
        !self.kind.is_boxed() || (self.x <= self.x2 && self.y <= self.y2)
    }

    /// Non-empty label text, if any.
    pub fn label(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Normalized anchor used for hit-testing and label placement:
    /// the point location, the circle center, or the box center.
    pub fn center(&self) -> (f64, f64) {
        match self.kind {
            AnnotationKind::Point => (self.x2, self.y2),
            AnnotationKind::Circle => (self.x, self.y),
            AnnotationKind::Rectangle | AnnotationKind::Text => {
                ((self.x + self.x2) / 2.0, (self.y + self.y2) / 2.0)
            }
        }
    }

    /// Move all stored coordinates by a normalized offset, clamped to the image.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let clamp = |v: f64| v.clamp(0.0, 1.0);
        Self {
            x: clamp(self.x + dx),
            y: clamp(self.y + dy),
            x2: clamp(self.x2 + dx),
            y2: clamp(self.y2 + dy),
            ..self.clone()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
