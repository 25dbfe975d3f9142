//! Screen-resolution decimation of geometry before rendering.

use crate::geometry::{Contour, Geom, Point2d, Polygon};
use crate::transform::MathTransform;

/// Removes vertices that are indistinguishable at the display resolution.
///
/// The span is the size of one display pixel in world units, obtained by pushing the
/// unit square corners `(0, 0)` and `(1, 1)` through the screen-to-world transform.
/// Decimation is a single greedy pass: a vertex survives only if it moves by more
/// than the span in either axis from the last surviving vertex.
pub struct Decimator {
    span_x: f64,
    span_y: f64,
}

impl Decimator {
    /// Creates a decimator for the given screen-to-world transform.
    ///
    /// With no transform the spans are zero and every vertex survives.
    pub fn new(screen_to_world: Option<&dyn MathTransform>) -> Self {
        let (span_x, span_y) = match screen_to_world {
            Some(transform) => {
                let origin = transform.apply(Point2d::new(0.0, 0.0));
                let corner = transform.apply(Point2d::new(1.0, 1.0));
                ((corner.x - origin.x).abs(), (corner.y - origin.y).abs())
            }
            None => (0.0, 0.0),
        };

        Self { span_x, span_y }
    }

    /// Creates a decimator with explicit world-unit spans.
    pub fn with_spans(span_x: f64, span_y: f64) -> Self {
        Self { span_x, span_y }
    }

    /// Decimates any geometry. Points and multipoints pass through unchanged.
    pub fn decimate(&self, geom: &Geom) -> Geom {
        match geom {
            Geom::Point(p) => Geom::Point(*p),
            Geom::MultiPoint(points) => Geom::MultiPoint(points.clone()),
            Geom::Contour(contour) => Geom::Contour(self.decimate_contour(contour)),
            Geom::MultiContour(contours) => Geom::MultiContour(
                contours.iter().map(|c| self.decimate_contour(c)).collect(),
            ),
            Geom::Polygon(polygon) => Geom::Polygon(self.decimate_polygon(polygon)),
            Geom::MultiPolygon(polygons) => Geom::MultiPolygon(
                polygons.iter().map(|p| self.decimate_polygon(p)).collect(),
            ),
        }
    }

    /// Decimates one contour.
    ///
    /// A contour whose bounding rectangle fits within the span collapses to its two
    /// endpoints. Closed contours keep at least three vertices; if decimation leaves
    /// fewer, the original vertices are kept.
    pub fn decimate_contour(&self, contour: &Contour) -> Contour {
        let points = &contour.points;
        if points.len() <= 2 || (self.span_x == 0.0 && self.span_y == 0.0) {
            return contour.clone();
        }

        if let Some(bounds) = contour.bounding_rect() {
            if bounds.width() <= self.span_x && bounds.height() <= self.span_y {
                // A closed contour this small has no renderable interior either, so
                // the result is always an open two-point stub.
                return Contour::open(vec![points[0], points[points.len() - 1]]);
            }
        }

        let kept = self.thin(points);

        let min_len = if contour.is_closed { 3 } else { 2 };
        if kept.len() < min_len {
            return contour.clone();
        }

        if contour.is_closed {
            Contour::closed(kept)
        } else {
            Contour::open(kept)
        }
    }

    /// Decimates a polygon's rings. Holes that collapse below three vertices are
    /// dropped.
    pub fn decimate_polygon(&self, polygon: &Polygon) -> Polygon {
        if self.span_x == 0.0 && self.span_y == 0.0 {
            return polygon.clone();
        }

        let outer = self.thin_ring(&polygon.outer);
        let inners = polygon
            .inners
            .iter()
            .filter_map(|ring| {
                if ring.points.len() < 3 {
                    return None;
                }
                let kept = self.thin(&ring.points);
                (kept.len() >= 3).then(|| Contour::closed(kept))
            })
            .collect();

        Polygon::with_inners(outer, inners)
    }

    fn thin_ring(&self, ring: &Contour) -> Contour {
        if ring.points.len() < 3 {
            return ring.clone();
        }
        let kept = self.thin(&ring.points);
        if kept.len() < 3 {
            ring.clone()
        } else {
            Contour::closed(kept)
        }
    }

    fn thin(&self, points: &[Point2d]) -> Vec<Point2d> {
        let mut kept = Vec::with_capacity(points.len());
        kept.push(points[0]);

        let mut last = points[0];
        for point in &points[1..points.len() - 1] {
            if (point.x - last.x).abs() > self.span_x || (point.y - last.y).abs() > self.span_y {
                kept.push(*point);
                last = *point;
            }
        }

        // The final vertex always survives so endpoints stay exact.
        kept.push(points[points.len() - 1]);
        kept
    }
}
