//! Clipping of contours and polygons to a rectangle.
//!
//! The label placement engine clips every candidate geometry to the display area
//! before measuring it. Clipping failures are reported, not panicked on, so the
//! caller can fall back to the unclipped geometry.

use crate::error::VespucciError;
use crate::geometry::{Contour, Point2d, Polygon, Rect};

/// Clips a contour to a rectangle, returning the pieces that lie inside it.
///
/// A ring is clipped as a sequence of segments (including its closing segment), so
/// the result is always a set of open polylines. An empty result means the contour
/// lies fully outside the rectangle.
pub fn clip_contour(contour: &Contour, rect: &Rect) -> Result<Vec<Contour>, VespucciError> {
    if contour.points.len() < 2 {
        return Err(VespucciError::DegenerateGeometry(
            "contour with less than 2 points".into(),
        ));
    }
    if contour.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(VespucciError::DegenerateGeometry(
            "contour with non-finite coordinates".into(),
        ));
    }

    let mut segments: Vec<(Point2d, Point2d)> = contour
        .points
        .windows(2)
        .map(|w| (w[0], w[1]))
        .collect();
    if contour.is_closed && contour.points.len() > 2 {
        segments.push((contour.points[contour.points.len() - 1], contour.points[0]));
    }

    let mut pieces: Vec<Contour> = Vec::new();
    for (start, end) in segments {
        let Some((a, b)) = clip_segment(start, end, rect) else {
            continue;
        };

        match pieces.last_mut() {
            Some(piece)
                if piece
                    .points
                    .last()
                    .is_some_and(|last| (last - a).norm() <= JOIN_TOLERANCE) =>
            {
                piece.points.push(b);
            }
            _ => pieces.push(Contour::open(vec![a, b])),
        }
    }

    pieces.retain(|piece| piece.length() > 0.0);
    Ok(pieces)
}

/// Clips a polygon to a rectangle.
///
/// The exterior and interior rings are clipped independently against the (convex)
/// rectangle. `Ok(None)` means the polygon lies fully outside of it.
pub fn clip_polygon(polygon: &Polygon, rect: &Rect) -> Result<Option<Polygon>, VespucciError> {
    if polygon.outer.points.len() < 3 {
        return Err(VespucciError::DegenerateGeometry(
            "polygon ring with less than 3 points".into(),
        ));
    }
    if polygon
        .rings()
        .flat_map(|ring| ring.points.iter())
        .any(|p| !p.x.is_finite() || !p.y.is_finite())
    {
        return Err(VespucciError::DegenerateGeometry(
            "polygon with non-finite coordinates".into(),
        ));
    }

    let outer = clip_ring(&polygon.outer.points, rect);
    if outer.len() < 3 {
        return Ok(None);
    }

    let inners = polygon
        .inners
        .iter()
        .map(|ring| clip_ring(&ring.points, rect))
        .filter(|points| points.len() >= 3)
        .map(Contour::closed)
        .collect();

    Ok(Some(Polygon::with_inners(Contour::closed(outer), inners)))
}

const JOIN_TOLERANCE: f64 = 1e-9;

/// Liang-Barsky clipping of one segment.
fn clip_segment(start: Point2d, end: Point2d, rect: &Rect) -> Option<(Point2d, Point2d)> {
    let d = end - start;
    let mut t_min = 0.0_f64;
    let mut t_max = 1.0_f64;

    let checks = [
        (-d.x, start.x - rect.x_min()),
        (d.x, rect.x_max() - start.x),
        (-d.y, start.y - rect.y_min()),
        (d.y, rect.y_max() - start.y),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t_min = t_min.max(t);
            } else {
                t_max = t_max.min(t);
            }
            if t_min > t_max {
                return None;
            }
        }
    }

    Some((start + d * t_min, start + d * t_max))
}

/// Sutherland-Hodgman clipping of a ring against the rectangle.
fn clip_ring(ring: &[Point2d], rect: &Rect) -> Vec<Point2d> {
    enum Edge {
        Left(f64),
        Right(f64),
        Bottom(f64),
        Top(f64),
    }

    impl Edge {
        fn is_inside(&self, p: &Point2d) -> bool {
            match self {
                Edge::Left(x) => p.x >= *x,
                Edge::Right(x) => p.x <= *x,
                Edge::Bottom(y) => p.y >= *y,
                Edge::Top(y) => p.y <= *y,
            }
        }

        fn intersect(&self, a: &Point2d, b: &Point2d) -> Point2d {
            let d = b - a;
            match self {
                Edge::Left(x) | Edge::Right(x) => {
                    let t = if d.x == 0.0 { 0.0 } else { (x - a.x) / d.x };
                    a + d * t
                }
                Edge::Bottom(y) | Edge::Top(y) => {
                    let t = if d.y == 0.0 { 0.0 } else { (y - a.y) / d.y };
                    a + d * t
                }
            }
        }
    }

    let edges = [
        Edge::Left(rect.x_min()),
        Edge::Right(rect.x_max()),
        Edge::Bottom(rect.y_min()),
        Edge::Top(rect.y_max()),
    ];

    let mut output: Vec<Point2d> = ring.to_vec();
    for edge in &edges {
        if output.is_empty() {
            break;
        }

        let input = std::mem::take(&mut output);
        for i in 0..input.len() {
            let current = input[i];
            let previous = input[(i + input.len() - 1) % input.len()];

            let current_inside = edge.is_inside(&current);
            let previous_inside = edge.is_inside(&previous);

            if current_inside {
                if !previous_inside {
                    output.push(edge.intersect(&previous, &current));
                }
                output.push(current);
            } else if previous_inside {
                output.push(edge.intersect(&previous, &current));
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn line_crossing_the_rect_is_trimmed() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let line = Contour::open(vec![Point2d::new(-5.0, 5.0), Point2d::new(15.0, 5.0)]);

        let pieces = clip_contour(&line, &rect).expect("valid input");
        assert_eq!(pieces.len(), 1);
        assert_abs_diff_eq!(pieces[0].points[0], Point2d::new(0.0, 5.0), epsilon = 1e-9);
        assert_abs_diff_eq!(pieces[0].points[1], Point2d::new(10.0, 5.0), epsilon = 1e-9);
    }

    #[test]
    fn line_outside_yields_no_pieces() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let line = Contour::open(vec![Point2d::new(-5.0, 20.0), Point2d::new(15.0, 20.0)]);

        assert!(clip_contour(&line, &rect).expect("valid input").is_empty());
    }

    #[test]
    fn line_leaving_and_reentering_splits() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let line = Contour::open(vec![
            Point2d::new(1.0, 1.0),
            Point2d::new(1.0, 20.0),
            Point2d::new(9.0, 20.0),
            Point2d::new(9.0, 1.0),
        ]);

        let pieces = clip_contour(&line, &rect).expect("valid input");
        assert_eq!(pieces.len(), 2);
    }

    #[test]
    fn degenerate_contour_is_an_error() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let line = Contour::open(vec![Point2d::new(1.0, 1.0)]);
        assert_matches!(
            clip_contour(&line, &rect),
            Err(VespucciError::DegenerateGeometry(_))
        );

        let nan = Contour::open(vec![Point2d::new(f64::NAN, 0.0), Point2d::new(1.0, 1.0)]);
        assert_matches!(
            clip_contour(&nan, &rect),
            Err(VespucciError::DegenerateGeometry(_))
        );
    }

    #[test]
    fn polygon_clipped_to_quarter() {
        let rect = Rect::new(0.0, 0.0, 5.0, 5.0);
        let polygon = Polygon::new(Contour::closed(vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(10.0, 10.0),
            Point2d::new(0.0, 10.0),
        ]));

        let clipped = clip_polygon(&polygon, &rect)
            .expect("valid input")
            .expect("overlaps the rect");
        assert_abs_diff_eq!(clipped.area(), 25.0, epsilon = 1e-9);
    }

    #[test]
    fn polygon_outside_is_none() {
        let rect = Rect::new(100.0, 100.0, 105.0, 105.0);
        let polygon = Polygon::new(Contour::closed(vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(10.0, 10.0),
        ]));

        assert_matches!(clip_polygon(&polygon, &rect), Ok(None));
    }
}
