//! Current state of the viewport the pipeline renders into.

use crate::geometry::{Point2d, Rect};
use crate::transform::AffineTransform;

/// Size of the render target in pixels.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    /// Creates a new size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width in pixels.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns true if both dimensions are positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Position and extent of the viewport over the map.
///
/// The view is in display coordinates: `center` is a point in the display reference
/// system and `resolution` is the size of one pixel in display units. Screen
/// coordinates have the origin in the top left corner with the y axis pointing down.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapView {
    center: Point2d,
    resolution: f64,
    size: Size,
}

impl MapView {
    /// Creates a view centered at `center` with the given resolution and target size.
    pub fn new(center: Point2d, resolution: f64, size: Size) -> Self {
        Self {
            center,
            resolution,
            size,
        }
    }

    /// Center of the view in display coordinates.
    pub fn center(&self) -> Point2d {
        self.center
    }

    /// Size of one pixel in display units.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Size of the render target in pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns a copy of the view moved to the given center.
    pub fn with_center(&self, center: Point2d) -> Self {
        Self { center, ..*self }
    }

    /// Returns a copy of the view at the given resolution.
    pub fn with_resolution(&self, resolution: f64) -> Self {
        Self {
            resolution,
            ..*self
        }
    }

    /// Area of the display reference system covered by the view.
    pub fn bounding_rect(&self) -> Rect {
        let half_width = self.size.width * self.resolution / 2.0;
        let half_height = self.size.height * self.resolution / 2.0;
        Rect::new(
            self.center.x - half_width,
            self.center.y - half_height,
            self.center.x + half_width,
            self.center.y + half_height,
        )
    }

    /// Affine from display coordinates to screen pixels (y axis flipped).
    pub fn world_to_screen_transform(&self) -> Option<AffineTransform> {
        if !self.size.is_valid() || self.resolution <= 0.0 {
            return None;
        }

        let bounds = self.bounding_rect();
        let scale = 1.0 / self.resolution;
        Some(AffineTransform::new(
            scale,
            0.0,
            0.0,
            -scale,
            -bounds.x_min() * scale,
            bounds.y_max() * scale,
        ))
    }

    /// Affine from screen pixels to display coordinates.
    pub fn screen_to_world_transform(&self) -> Option<AffineTransform> {
        self.world_to_screen_transform()?.try_inverse()
    }

    /// Projects a display point to screen pixels.
    pub fn world_to_screen(&self, point: Point2d) -> Option<Point2d> {
        Some(self.world_to_screen_transform()?.apply(point))
    }

    /// Projects a screen point to display coordinates.
    pub fn screen_to_world(&self, point: Point2d) -> Option<Point2d> {
        Some(self.screen_to_world_transform()?.apply(point))
    }
}
