//! Screen-space geometry primitives used by the rendering pipeline.
//!
//! Geometries are represented by the closed [`Geom`] union, so all processing code
//! dispatches with a single `match` instead of downcasting. Only the operations the
//! pipeline actually needs are implemented here; anything heavier (validity repair,
//! boolean overlays between arbitrary geometries) belongs to the geometry kernel
//! collaborator.

use std::cmp::Ordering;

pub mod clip;
mod rect;

pub use rect::{EdgeRule, Rect};

/// A point in 2d cartesian coordinates.
pub type Point2d = nalgebra::Point2<f64>;

/// Sequence of points, either an open polyline or a closed ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    /// Vertices of the contour.
    pub points: Vec<Point2d>,
    /// Whether the last point connects back to the first one.
    pub is_closed: bool,
}

impl Contour {
    /// Creates an open contour (polyline).
    pub fn open(points: Vec<Point2d>) -> Self {
        Self {
            points,
            is_closed: false,
        }
    }

    /// Creates a closed contour (ring).
    pub fn closed(points: Vec<Point2d>) -> Self {
        Self {
            points,
            is_closed: true,
        }
    }

    /// Sum of the lengths of all segments. The closing segment of a ring is included.
    pub fn length(&self) -> f64 {
        let open_len: f64 = self
            .points
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum();
        if self.is_closed && self.points.len() > 2 {
            let first = self.points[0];
            let last = self.points[self.points.len() - 1];
            open_len + (first - last).norm()
        } else {
            open_len
        }
    }

    /// Bounding rectangle of the contour, or `None` if it has no points.
    pub fn bounding_rect(&self) -> Option<Rect> {
        Rect::from_points(self.points.iter().copied())
    }

    /// Point at the given fraction of the contour length, together with the direction
    /// (in radians) of the segment it lies on.
    ///
    /// The fraction is clamped to `[0.0, 1.0]`. Returns `None` for an empty contour; a
    /// single-point contour yields that point with a zero angle.
    pub fn point_at_fraction(&self, fraction: f64) -> Option<(Point2d, f64)> {
        let first = *self.points.first()?;
        if self.points.len() < 2 {
            return Some((first, 0.0));
        }

        let total = self.length();
        if total <= 0.0 {
            return Some((first, 0.0));
        }

        let target = total * fraction.clamp(0.0, 1.0);
        let mut travelled = 0.0;
        let mut segments: Vec<(Point2d, Point2d)> =
            self.points.windows(2).map(|w| (w[0], w[1])).collect();
        if self.is_closed && self.points.len() > 2 {
            segments.push((self.points[self.points.len() - 1], self.points[0]));
        }

        for (start, end) in &segments {
            let segment = end - start;
            let len = segment.norm();
            if travelled + len >= target && len > 0.0 {
                let t = (target - travelled) / len;
                return Some((start + segment * t, segment.y.atan2(segment.x)));
            }
            travelled += len;
        }

        // Numerical leftovers put the target past the last segment.
        let (start, end) = segments[segments.len() - 1];
        let segment = end - start;
        Some((end, segment.y.atan2(segment.x)))
    }
}

/// A polygon with one exterior ring and zero or more interior rings (holes).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Exterior ring.
    pub outer: Contour,
    /// Interior rings.
    pub inners: Vec<Contour>,
}

impl Polygon {
    /// Creates a polygon from its exterior ring. The ring is forced closed.
    pub fn new(mut outer: Contour) -> Self {
        outer.is_closed = true;
        Self {
            outer,
            inners: Vec::new(),
        }
    }

    /// Creates a polygon with holes. All rings are forced closed.
    pub fn with_inners(mut outer: Contour, mut inners: Vec<Contour>) -> Self {
        outer.is_closed = true;
        for ring in &mut inners {
            ring.is_closed = true;
        }
        Self { outer, inners }
    }

    /// Unsigned area of the polygon (exterior minus holes).
    pub fn area(&self) -> f64 {
        let outer = ring_signed_area(&self.outer.points).abs();
        let holes: f64 = self
            .inners
            .iter()
            .map(|ring| ring_signed_area(&ring.points).abs())
            .sum();
        (outer - holes).max(0.0)
    }

    /// Area-weighted centroid of the polygon, or `None` when the rings are degenerate.
    pub fn centroid(&self) -> Option<Point2d> {
        let mut weight = ring_signed_area(&self.outer.points).abs();
        let mut acc = ring_centroid(&self.outer.points)?.coords * weight;
        for ring in &self.inners {
            let hole_weight = ring_signed_area(&ring.points).abs();
            if let Some(c) = ring_centroid(&ring.points) {
                acc -= c.coords * hole_weight;
                weight -= hole_weight;
            }
        }

        if weight > f64::EPSILON {
            Some(Point2d::from(acc / weight))
        } else {
            None
        }
    }

    /// Bounding rectangle of the exterior ring.
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.outer.bounding_rect()
    }

    /// All rings of the polygon as contours, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &Contour> {
        std::iter::once(&self.outer).chain(self.inners.iter())
    }

    /// Returns true if the point is inside the polygon (holes excluded).
    pub fn contains(&self, point: &Point2d) -> bool {
        if !point_in_ring(point, &self.outer.points) {
            return false;
        }
        !self.inners.iter().any(|ring| point_in_ring(point, &ring.points))
    }

    /// Distance from the point to the polygon. Zero for points inside it.
    pub fn distance(&self, point: &Point2d) -> Option<f64> {
        if self.outer.points.is_empty() {
            return None;
        }
        if self.contains(point) {
            return Some(0.0);
        }

        self.rings()
            .flat_map(|ring| ring_segments(&ring.points))
            .map(|(a, b)| distance_to_segment(point, &a, &b))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }
}

/// A geometry that can be submitted to the rendering pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Geom {
    /// A single point.
    Point(Point2d),
    /// A set of points sharing one style.
    MultiPoint(Vec<Point2d>),
    /// A polyline or a ring.
    Contour(Contour),
    /// A set of polylines.
    MultiContour(Vec<Contour>),
    /// A polygon.
    Polygon(Polygon),
    /// A set of polygons.
    MultiPolygon(Vec<Polygon>),
}

impl Geom {
    /// Bounding rectangle of the geometry, or `None` for an empty one.
    pub fn bounding_rect(&self) -> Option<Rect> {
        match self {
            Geom::Point(p) => Some(Rect::new(p.x, p.y, p.x, p.y)),
            Geom::MultiPoint(points) => Rect::from_points(points.iter().copied()),
            Geom::Contour(c) => c.bounding_rect(),
            Geom::MultiContour(cs) => merge_rects(cs.iter().map(|c| c.bounding_rect())),
            Geom::Polygon(p) => p.bounding_rect(),
            Geom::MultiPolygon(ps) => merge_rects(ps.iter().map(|p| p.bounding_rect())),
        }
    }

    /// A single point representing the geometry.
    pub fn centroid(&self) -> Option<Point2d> {
        match self {
            Geom::Point(p) => Some(*p),
            Geom::MultiPoint(points) => points.first().copied(),
            Geom::Contour(c) => c.point_at_fraction(0.5).map(|(p, _)| p),
            Geom::MultiContour(cs) => cs.first().and_then(|c| c.point_at_fraction(0.5)).map(|(p, _)| p),
            Geom::Polygon(p) => p
                .centroid()
                .or_else(|| ring_centroid(&p.outer.points))
                .or_else(|| p.outer.points.first().copied()),
            Geom::MultiPolygon(ps) => ps.first().and_then(|p| Geom::Polygon(p.clone()).centroid()),
        }
    }
}

impl From<Point2d> for Geom {
    fn from(value: Point2d) -> Self {
        Self::Point(value)
    }
}

impl From<Contour> for Geom {
    fn from(value: Contour) -> Self {
        Self::Contour(value)
    }
}

impl From<Polygon> for Geom {
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}

fn merge_rects(rects: impl Iterator<Item = Option<Rect>>) -> Option<Rect> {
    rects
        .flatten()
        .reduce(|acc, r| acc.merge(r))
}

/// Greedily merges contours that share endpoints, longest first.
///
/// The longest contour absorbs any shorter one whose endpoint lies within `tolerance`
/// of one of its endpoints; the scan repeats until no more joins are possible. Closed
/// contours are never merged.
pub fn merge_contours(mut lines: Vec<Contour>, tolerance: f64) -> Vec<Contour> {
    lines.retain(|l| l.points.len() >= 2);

    loop {
        lines.sort_by(|a, b| {
            b.length()
                .partial_cmp(&a.length())
                .unwrap_or(Ordering::Equal)
        });

        let mut joined = None;
        'search: for i in 0..lines.len() {
            if lines[i].is_closed {
                continue;
            }
            for j in (i + 1)..lines.len() {
                if lines[j].is_closed {
                    continue;
                }
                if let Some(merged) = try_join(&lines[i], &lines[j], tolerance) {
                    joined = Some((i, j, merged));
                    break 'search;
                }
            }
        }

        match joined {
            Some((i, j, merged)) => {
                lines[i] = merged;
                lines.remove(j);
            }
            None => break,
        }
    }

    lines
}

fn try_join(a: &Contour, b: &Contour, tolerance: f64) -> Option<Contour> {
    let a_first = *a.points.first()?;
    let a_last = *a.points.last()?;
    let b_first = *b.points.first()?;
    let b_last = *b.points.last()?;

    let close = |p: Point2d, q: Point2d| (p - q).norm() <= tolerance;

    let mut points = a.points.clone();
    if close(a_last, b_first) {
        points.extend(b.points.iter().skip(1).copied());
    } else if close(a_last, b_last) {
        points.extend(b.points.iter().rev().skip(1).copied());
    } else if close(a_first, b_last) {
        points = b.points.clone();
        points.extend(a.points.iter().skip(1).copied());
    } else if close(a_first, b_first) {
        points = b.points.iter().rev().copied().collect();
        points.extend(a.points.iter().skip(1).copied());
    } else {
        return None;
    }

    Some(Contour::open(points))
}

fn ring_segments(points: &[Point2d]) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
    let closing = if points.len() > 2 {
        Some((points[points.len() - 1], points[0]))
    } else {
        None
    };
    points
        .windows(2)
        .map(|w| (w[0], w[1]))
        .chain(closing)
}

fn ring_signed_area(points: &[Point2d]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    ring_segments(points)
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>()
        / 2.0
}

fn ring_centroid(points: &[Point2d]) -> Option<Point2d> {
    let area = ring_signed_area(points);
    if area.abs() > f64::EPSILON {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for (a, b) in ring_segments(points) {
            let cross = a.x * b.y - b.x * a.y;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        return Some(Point2d::new(cx / (6.0 * area), cy / (6.0 * area)));
    }

    // Degenerate ring, use the vertex average.
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
    Some(Point2d::from(sum / points.len() as f64))
}

fn point_in_ring(point: &Point2d, ring: &[Point2d]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    for (a, b) in ring_segments(ring) {
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
    }

    inside
}

fn distance_to_segment(point: &Point2d, a: &Point2d, b: &Point2d) -> f64 {
    let segment = b - a;
    let len_sq = segment.norm_squared();
    if len_sq <= 0.0 {
        return (point - a).norm();
    }

    let t = ((point - a).dot(&segment) / len_sq).clamp(0.0, 1.0);
    (point - (a + segment * t)).norm()
}
