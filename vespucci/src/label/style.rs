//! Text styling and placement parameters for labels.

use nalgebra::Vector2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::Point2d;

/// Outline drawn behind the label text to keep it readable over busy backgrounds.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Halo {
    /// Color of the halo.
    pub color: Color,
    /// Radius of the halo in pixels.
    pub radius: f64,
}

/// Visual style of label text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextStyle {
    /// Preferred font families, most specific first.
    pub font_family: Vec<String>,
    /// Font size in pixels.
    pub font_size: f64,
    /// Text color. When not set the text is drawn in opaque black.
    pub fill: Option<Color>,
    /// Optional halo behind the text.
    pub halo: Option<Halo>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: Vec::new(),
            font_size: 12.0,
            fill: None,
            halo: None,
        }
    }
}

/// How a label is anchored to its geometry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LabelPlacementMode {
    /// Anchor at a representative point of the geometry.
    Point,
    /// Lay the label along a line.
    Line,
}

/// Placement parameters of a label.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelPlacement {
    /// Placement mode.
    pub mode: LabelPlacementMode,
    /// Anchor inside the label box as fractions of its size.
    ///
    /// For line placement only the x component is used, as the fraction of the line
    /// length the label is centered at.
    pub anchor: Point2d,
    /// Offset of the label from its anchor point, in pixels. Only honored for point
    /// placement.
    pub displacement: Vector2<f64>,
    /// Offset normal to the line the label follows, in pixels. Positive values move
    /// an upright label above its line. Only honored for line placement.
    pub perpendicular_offset: f64,
    /// Rotation of the label in radians. Only honored for point placement.
    pub rotation: f64,
}

impl Default for LabelPlacement {
    fn default() -> Self {
        Self {
            mode: LabelPlacementMode::Point,
            anchor: Point2d::new(0.5, 0.5),
            displacement: Vector2::zeros(),
            perpendicular_offset: 0.0,
            rotation: 0.0,
        }
    }
}

impl LabelPlacement {
    /// Point placement with the given anchor fractions.
    pub fn point(anchor_x: f64, anchor_y: f64) -> Self {
        Self {
            anchor: Point2d::new(anchor_x, anchor_y),
            ..Self::default()
        }
    }

    /// Line placement with the given position along the line.
    pub fn line(anchor_x: f64) -> Self {
        Self {
            mode: LabelPlacementMode::Line,
            anchor: Point2d::new(anchor_x, 0.5),
            ..Self::default()
        }
    }
}

/// Source of label values for features of type `F`.
///
/// One symbolizer describes a whole layer; per-feature values (the text itself, the
/// priority) are extracted through it.
pub trait TextSymbolizer<F> {
    /// Label text for the feature. `None` or an empty string suppress the label.
    fn label(&self, feature: &F) -> Option<String>;

    /// Priority of the feature's label. Higher values win conflicts.
    fn priority(&self, _feature: &F) -> Option<f64> {
        None
    }

    /// Free-form option by name, such as `"group"` or `"spaceAround"`.
    fn vendor_option(&self, _name: &str) -> Option<&str> {
        None
    }

    /// Text style shared by all labels of the symbolizer.
    fn style(&self) -> &TextStyle;

    /// Placement parameters shared by all labels of the symbolizer.
    fn placement(&self) -> &LabelPlacement;
}
