//! Scale and projection helpers shared by render backends.

use crate::geometry::Rect;
use crate::transform::AffineTransform;
use crate::view::Size;

/// Meters per degree of longitude at the equator.
const METERS_PER_DEGREE: f64 = 111_319.490_793_273_58;

/// Meters in one inch.
const METERS_PER_INCH: f64 = 0.0254;

/// Default render target density in dots per inch.
pub const DEFAULT_DPI: f64 = 96.0;

/// Affine from a map area to a screen of the given size, with the y axis flipped.
///
/// Returns `None` when either the map area or the screen is degenerate. The x and y
/// scales are independent, so a non-matching aspect ratio stretches the map rather
/// than cropping it.
pub fn world_to_screen(map_area: &Rect, screen: Size) -> Option<AffineTransform> {
    if map_area.width() <= 0.0 || map_area.height() <= 0.0 || !screen.is_valid() {
        return None;
    }

    let sx = screen.width() / map_area.width();
    let sy = screen.height() / map_area.height();
    Some(AffineTransform::new(
        sx,
        0.0,
        0.0,
        -sy,
        -map_area.x_min() * sx,
        map_area.y_max() * sy,
    ))
}

/// Affine from screen pixels back to the map area.
pub fn screen_to_world(map_area: &Rect, screen: Size) -> Option<AffineTransform> {
    world_to_screen(map_area, screen)?.try_inverse()
}

/// Scale denominator of a map drawn into `width_px` pixels at `dpi`.
///
/// For a geographic map area the width is converted from degrees of longitude to
/// meters at the middle latitude; coordinates are clamped to the valid longitude and
/// latitude ranges first so areas crossing the antimeridian or spanning a pole do
/// not produce nonsense scales.
pub fn scale_denominator(map_area: &Rect, geographic: bool, width_px: f64, dpi: f64) -> f64 {
    if width_px <= 0.0 || dpi <= 0.0 {
        return 0.0;
    }

    let width_meters = if geographic {
        let x_min = map_area.x_min().clamp(-180.0, 180.0);
        let x_max = map_area.x_max().clamp(-180.0, 180.0);
        let y_min = map_area.y_min().clamp(-90.0, 90.0);
        let y_max = map_area.y_max().clamp(-90.0, 90.0);

        let mid_lat = ((y_min + y_max) / 2.0).to_radians();
        (x_max - x_min) * METERS_PER_DEGREE * mid_lat.cos()
    } else {
        map_area.width()
    };

    let screen_meters = width_px * METERS_PER_INCH / dpi;
    width_meters / screen_meters
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::geometry::Point2d;

    #[test]
    fn world_to_screen_maps_corners() {
        let area = Rect::new(100.0, 200.0, 300.0, 300.0);
        let transform = world_to_screen(&area, Size::new(400.0, 200.0)).expect("valid input");

        assert_abs_diff_eq!(
            transform.apply(Point2d::new(100.0, 300.0)),
            Point2d::new(0.0, 0.0),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            transform.apply(Point2d::new(300.0, 200.0)),
            Point2d::new(400.0, 200.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn projected_scale_is_ground_over_screen() {
        // 1000 m drawn into 1000 px at 96 dpi.
        let area = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let scale = scale_denominator(&area, false, 1000.0, DEFAULT_DPI);
        assert_relative_eq!(scale, 1000.0 / (1000.0 * 0.0254 / 96.0), epsilon = 1e-9);
    }

    #[test]
    fn geographic_scale_shrinks_with_latitude() {
        let equator = Rect::new(0.0, -1.0, 1.0, 1.0);
        let arctic = Rect::new(0.0, 59.0, 1.0, 61.0);

        let at_equator = scale_denominator(&equator, true, 1000.0, DEFAULT_DPI);
        let at_60 = scale_denominator(&arctic, true, 1000.0, DEFAULT_DPI);

        assert_relative_eq!(at_60 / at_equator, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn geographic_scale_clamps_invalid_extents() {
        // An area spilling past the antimeridian counts only the valid part.
        let wrapped = Rect::new(170.0, 0.0, 190.0, 10.0);
        let clamped = Rect::new(170.0, 0.0, 180.0, 10.0);

        assert_relative_eq!(
            scale_denominator(&wrapped, true, 1000.0, DEFAULT_DPI),
            scale_denominator(&clamped, true, 1000.0, DEFAULT_DPI),
            epsilon = 1e-9
        );
    }

    #[test]
    fn degenerate_input_gives_zero_scale() {
        let area = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        assert_eq!(scale_denominator(&area, false, 0.0, DEFAULT_DPI), 0.0);
    }
}
