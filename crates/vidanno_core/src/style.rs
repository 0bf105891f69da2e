//! Global style defaults and the style-resolution rule.
//!
//! Interactive display and export resolve styles the same way: every field set
//! explicitly on an annotation wins, everything else comes from the current
//! global defaults.

use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationStyle, Argb};

/// Fully specified style used to draw an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDefaults {
    #[serde(default = "default_color")]
    pub color: Argb,
    #[serde(default = "default_fill_color")]
    pub fill_color: Argb,
    #[serde(default = "default_color")]
    pub text_color: Argb,
    #[serde(default = "default_text_fill_color")]
    pub text_fill_color: Argb,
    #[serde(default = "default_font_name")]
    pub font_name: String,
    /// Fraction of frame height.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Fraction of frame height.
    #[serde(default = "default_thickness")]
    pub thickness: f64,
}

fn default_color() -> Argb {
    Argb::GREEN
}

fn default_fill_color() -> Argb {
    Argb::TRANSPARENT
}

fn default_text_fill_color() -> Argb {
    Argb::GREEN.inverted(128)
}

fn default_font_name() -> String {
    "Sans".to_string()
}

fn default_font_size() -> f64 {
    0.03
}

fn default_thickness() -> f64 {
    0.005
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            color: default_color(),
            fill_color: default_fill_color(),
            text_color: default_color(),
            text_fill_color: default_text_fill_color(),
            font_name: default_font_name(),
            font_size: default_font_size(),
            thickness: default_thickness(),
        }
    }
}

impl StyleDefaults {
    /// Apply per-annotation overrides on top of these defaults.
    pub fn resolve(&self, overrides: &AnnotationStyle) -> StyleDefaults {
        StyleDefaults {
            color: overrides.color.unwrap_or(self.color),
            fill_color: overrides.fill_color.unwrap_or(self.fill_color),
            text_color: overrides.text_color.unwrap_or(self.text_color),
            text_fill_color: overrides.text_fill_color.unwrap_or(self.text_fill_color),
            font_name: overrides
                .font_name
                .clone()
                .unwrap_or_else(|| self.font_name.clone()),
            font_size: overrides.font_size.unwrap_or(self.font_size),
            thickness: overrides.thickness.unwrap_or(self.thickness),
        }
    }

    /// Line thickness in pixels for a frame of the given height (at least 1).
    pub fn thickness_px(&self, frame_height: u32) -> u32 {
        ((self.thickness * f64::from(frame_height)).round() as u32).max(1)
    }

    /// Font size in pixels for a frame of the given height (at least 1).
    pub fn font_px(&self, frame_height: u32) -> u32 {
        ((self.font_size * f64::from(frame_height)).round() as u32).max(1)
    }
}
