//! Math transforms between coordinate reference systems.
//!
//! The general transform construction is delegated to a [`TransformFactory`]
//! collaborator; this module only defines the seam and the affine transform used for
//! fitted reference systems and screen mapping.

use std::sync::Arc;

use crate::crs::Crs;
use crate::error::VespucciError;
use crate::geometry::{Contour, Geom, Point2d, Polygon, Rect};

/// A transform from one coordinate reference system to another.
pub trait MathTransform: std::fmt::Debug + Send + Sync {
    /// Transforms a single point.
    fn apply(&self, point: Point2d) -> Point2d;

    /// Transforms a coordinate array in place.
    fn apply_many(&self, points: &mut [Point2d]) {
        for point in points {
            *point = self.apply(*point);
        }
    }

    /// Returns true if the transform maps every point to itself.
    fn is_identity(&self) -> bool {
        false
    }
}

/// Constructs transforms between reference systems that are not trivially related.
///
/// This is the expensive general path; [`TransformCache`](crate::TransformCache) calls
/// it only on a cache miss.
pub trait TransformFactory: std::fmt::Debug + Send + Sync {
    /// Creates a transform from `source` to `target`.
    fn create(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Arc<dyn MathTransform>, VespucciError>;
}

/// A factory that refuses to relate differing reference systems.
///
/// Useful as a default when all layers share the display reference system (the
/// identity and fitted shortcuts never reach the factory).
#[derive(Debug, Default, Copy, Clone)]
pub struct NullTransformFactory;

impl TransformFactory for NullTransformFactory {
    fn create(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Arc<dyn MathTransform>, VespucciError> {
        Err(VespucciError::TransformCreation {
            source_crs: source.code().to_string(),
            target_crs: target.code().to_string(),
        })
    }
}

/// 2d affine transform.
///
/// Maps `(x, y)` to `(m11 * x + m12 * y + tx, m21 * x + m22 * y + ty)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AffineTransform {
    m11: f64,
    m12: f64,
    m21: f64,
    m22: f64,
    tx: f64,
    ty: f64,
}

impl AffineTransform {
    /// Creates a transform from its matrix coefficients.
    pub fn new(m11: f64, m12: f64, m21: f64, m22: f64, tx: f64, ty: f64) -> Self {
        Self {
            m11,
            m12,
            m21,
            m22,
            tx,
            ty,
        }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// A pure translation.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    /// A pure scale around the origin.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Transforms a point.
    pub fn apply(&self, p: Point2d) -> Point2d {
        Point2d::new(
            self.m11 * p.x + self.m12 * p.y + self.tx,
            self.m21 * p.x + self.m22 * p.y + self.ty,
        )
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.m11 * self.m22 - self.m12 * self.m21
    }

    /// Inverse transform, or `None` if the transform is singular.
    pub fn try_inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let m11 = self.m22 / det;
        let m12 = -self.m12 / det;
        let m21 = -self.m21 / det;
        let m22 = self.m11 / det;
        Some(Self {
            m11,
            m12,
            m21,
            m22,
            tx: -(m11 * self.tx + m12 * self.ty),
            ty: -(m21 * self.tx + m22 * self.ty),
        })
    }

    /// Composition applying `self` first and `other` after it.
    pub fn then(&self, other: &Self) -> Self {
        Self {
            m11: other.m11 * self.m11 + other.m12 * self.m21,
            m12: other.m11 * self.m12 + other.m12 * self.m22,
            m21: other.m21 * self.m11 + other.m22 * self.m21,
            m22: other.m21 * self.m12 + other.m22 * self.m22,
            tx: other.m11 * self.tx + other.m12 * self.ty + other.tx,
            ty: other.m21 * self.tx + other.m22 * self.ty + other.ty,
        }
    }
}

impl MathTransform for AffineTransform {
    fn apply(&self, point: Point2d) -> Point2d {
        AffineTransform::apply(self, point)
    }

    fn is_identity(&self) -> bool {
        *self == AffineTransform::identity()
    }
}

/// Bounding rectangle of the transformed rectangle corners.
pub fn transform_rect(transform: &dyn MathTransform, rect: &Rect) -> Rect {
    let corners = rect.corners().map(|c| transform.apply(c));
    Rect::from_points(corners).unwrap_or(*rect)
}

/// Applies a transform to every vertex of a geometry.
pub fn transform_geom(transform: &dyn MathTransform, geom: &Geom) -> Geom {
    let map_points =
        |points: &[Point2d]| -> Vec<Point2d> { points.iter().map(|p| transform.apply(*p)).collect() };
    let map_contour = |c: &Contour| Contour {
        points: map_points(&c.points),
        is_closed: c.is_closed,
    };
    let map_polygon = |p: &Polygon| Polygon {
        outer: map_contour(&p.outer),
        inners: p.inners.iter().map(|c| map_contour(c)).collect(),
    };

    match geom {
        Geom::Point(p) => Geom::Point(transform.apply(*p)),
        Geom::MultiPoint(points) => Geom::MultiPoint(map_points(points)),
        Geom::Contour(c) => Geom::Contour(map_contour(c)),
        Geom::MultiContour(cs) => Geom::MultiContour(cs.iter().map(|c| map_contour(c)).collect()),
        Geom::Polygon(p) => Geom::Polygon(map_polygon(p)),
        Geom::MultiPolygon(ps) => Geom::MultiPolygon(ps.iter().map(|p| map_polygon(p)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn inverse_round_trip() {
        let transform = AffineTransform::new(2.0, 0.0, 0.0, -3.0, 10.0, 20.0);
        let inverse = transform.try_inverse().expect("invertible");

        let p = Point2d::new(7.0, -2.0);
        assert_abs_diff_eq!(inverse.apply(transform.apply(p)), p, epsilon = 1e-12);
    }

    #[test]
    fn singular_has_no_inverse() {
        let transform = AffineTransform::new(1.0, 2.0, 2.0, 4.0, 0.0, 0.0);
        assert!(transform.try_inverse().is_none());
    }

    #[test]
    fn composition_order() {
        let scale = AffineTransform::scale(2.0, 2.0);
        let translate = AffineTransform::translation(10.0, 0.0);

        let scale_then_translate = scale.then(&translate);
        assert_abs_diff_eq!(
            scale_then_translate.apply(Point2d::new(1.0, 1.0)),
            Point2d::new(12.0, 2.0)
        );
    }

    #[test]
    fn rect_transform_flips_axes() {
        let flip = AffineTransform::new(1.0, 0.0, 0.0, -1.0, 0.0, 100.0);
        let rect = Rect::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(
            transform_rect(&flip, &rect),
            Rect::new(0.0, 80.0, 10.0, 100.0)
        );
    }
}
