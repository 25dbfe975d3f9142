//! Computes where on the screen a label should be drawn.
//!
//! All geometry here is in screen pixels; conversion from the display reference
//! system happens when the label is submitted to the cache.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Vector2;

use crate::geometry::clip::{clip_contour, clip_polygon};
use crate::geometry::{merge_contours, Contour, Geom, Point2d, Polygon, Rect};
use crate::label::style::{LabelPlacement, LabelPlacementMode};
use crate::label::ShapedGlyph;

/// Tolerance for joining line fragments that belong to the same feature group.
const MERGE_TOLERANCE: f64 = 1e-6;

/// Number of sample points used to estimate how well a label fits its polygon.
const FIT_SAMPLES: usize = 10;

/// Position and rotation of a shaped label on screen.
///
/// The label box spans `(0, 0)` to `(width, height)` in its local coordinates with
/// the y axis pointing down; the transform rotates the box around its local origin
/// and then translates it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacementTransform {
    /// Screen position of the label box origin.
    pub translation: Vector2<f64>,
    /// Rotation in radians, applied before the translation.
    pub rotation: f64,
}

impl PlacementTransform {
    /// Creates a transform from its parts.
    pub fn new(translation: Vector2<f64>, rotation: f64) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Maps a point from label-local coordinates to the screen.
    pub fn apply(&self, point: Point2d) -> Point2d {
        let (sin, cos) = self.rotation.sin_cos();
        Point2d::new(
            cos * point.x - sin * point.y + self.translation.x,
            sin * point.x + cos * point.y + self.translation.y,
        )
    }

    /// Screen bounding rectangle of a label box of the given size.
    pub fn bounds(&self, width: f64, height: f64) -> Rect {
        let corners = [
            Point2d::new(0.0, 0.0),
            Point2d::new(width, 0.0),
            Point2d::new(width, height),
            Point2d::new(0.0, height),
        ];
        Rect::from_points(corners.iter().map(|c| self.apply(*c)))
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0))
    }
}

/// A computed label position together with the geometry it was derived from.
pub(crate) struct Placement {
    pub transform: PlacementTransform,
    pub representative: Geom,
}

/// Chooses the placement strategy from the item's first geometry.
///
/// A polygon or a closed ring dispatches to polygon placement, an open line to line
/// placement, a point to point placement. Later geometries of a grouped item follow
/// the first one's strategy.
fn classify(geometry: &[Geom]) -> Option<LabelKind> {
    let kind = match geometry.first()? {
        Geom::Polygon(_) | Geom::MultiPolygon(_) => LabelKind::Polygon,
        Geom::Contour(c) => {
            if c.is_closed {
                LabelKind::Polygon
            } else {
                LabelKind::Line
            }
        }
        Geom::MultiContour(cs) => {
            if cs.iter().any(|c| c.is_closed) {
                LabelKind::Polygon
            } else {
                LabelKind::Line
            }
        }
        Geom::Point(_) | Geom::MultiPoint(_) => LabelKind::Point,
    };
    Some(kind)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LabelKind {
    Point,
    Line,
    Polygon,
}

/// Computes the screen placement of a label, or `None` when no part of the geometry
/// produces a usable position.
pub(crate) fn place(
    geometry: &[Geom],
    glyph: &ShapedGlyph,
    placement: &LabelPlacement,
    screen: &Rect,
) -> Option<Placement> {
    match classify(geometry)? {
        LabelKind::Point => place_point(geometry, glyph, placement, screen),
        LabelKind::Line => place_line(geometry, glyph, placement, screen),
        LabelKind::Polygon => place_polygon(geometry, glyph, placement, screen),
    }
}

fn anchored_translation(
    anchor_point: Point2d,
    anchor: Point2d,
    glyph: &ShapedGlyph,
    rotation: f64,
    displacement: Vector2<f64>,
) -> Vector2<f64> {
    let (sin, cos) = rotation.sin_cos();
    let local = Vector2::new(glyph.width * anchor.x, glyph.height * anchor.y);
    let rotated = Vector2::new(cos * local.x - sin * local.y, sin * local.x + cos * local.y);
    anchor_point.coords - rotated + displacement
}

/// Offset normal to a label rotated by `rotation`; positive values move an upright
/// label up the screen.
fn perpendicular_displacement(offset: f64, rotation: f64) -> Vector2<f64> {
    let (sin, cos) = rotation.sin_cos();
    Vector2::new(sin * offset, -cos * offset)
}

fn place_point(
    geometry: &[Geom],
    glyph: &ShapedGlyph,
    placement: &LabelPlacement,
    screen: &Rect,
) -> Option<Placement> {
    // The first candidate point inside the display area carries the label. Grouped
    // companions that are not point-like contribute their centroid.
    let point = geometry
        .iter()
        .flat_map(|geom| match geom {
            Geom::Point(p) => vec![*p],
            Geom::MultiPoint(points) => points.clone(),
            other => other.centroid().into_iter().collect(),
        })
        .find(|p| screen.contains(p))?;

    // A single point has no direction to follow, so line placement over it never
    // rotates and applies only the perpendicular offset.
    let (rotation, displacement) = match placement.mode {
        LabelPlacementMode::Point => (placement.rotation, placement.displacement),
        LabelPlacementMode::Line => (
            0.0,
            perpendicular_displacement(placement.perpendicular_offset, 0.0),
        ),
    };

    let translation = anchored_translation(point, placement.anchor, glyph, rotation, displacement);

    Some(Placement {
        transform: PlacementTransform::new(translation, rotation),
        representative: Geom::Point(point),
    })
}

fn place_line(
    geometry: &[Geom],
    glyph: &ShapedGlyph,
    placement: &LabelPlacement,
    screen: &Rect,
) -> Option<Placement> {
    let mut lines = Vec::new();
    for geom in geometry {
        match geom {
            Geom::Contour(c) => lines.push(c.clone()),
            Geom::MultiContour(cs) => lines.extend(cs.iter().cloned()),
            _ => {}
        }
    }

    let merged = merge_contours(lines, MERGE_TOLERANCE);

    // The longest on-screen piece carries the label.
    let mut best: Option<Contour> = None;
    for line in &merged {
        let pieces = match clip_contour(line, screen) {
            Ok(pieces) => pieces,
            Err(e) => {
                // An unclippable line still gets a chance at its full extent.
                log::debug!("label line could not be clipped: {e}");
                vec![line.clone()]
            }
        };

        for piece in pieces {
            if best
                .as_ref()
                .map(|b| piece.length() > b.length())
                .unwrap_or(true)
            {
                best = Some(piece);
            }
        }
    }
    let line = best?;

    let fraction = match placement.mode {
        // Point placement along a line pins the label to its middle.
        LabelPlacementMode::Point => 0.5,
        LabelPlacementMode::Line => placement.anchor.x.clamp(0.01, 0.99),
    };
    let (point, tangent) = line.point_at_fraction(fraction)?;

    let rotation = match placement.mode {
        // Point placement uses the declared rotation, not the line direction.
        LabelPlacementMode::Point => placement.rotation,
        // Follow the tangent, but keep the text upright.
        LabelPlacementMode::Line => {
            if tangent > FRAC_PI_2 {
                tangent - PI
            } else if tangent < -FRAC_PI_2 {
                tangent + PI
            } else {
                tangent
            }
        }
    };

    let displacement = match placement.mode {
        LabelPlacementMode::Point => placement.displacement,
        LabelPlacementMode::Line => {
            perpendicular_displacement(placement.perpendicular_offset, rotation)
        }
    };

    let translation = anchored_translation(point, Point2d::new(0.5, 0.5), glyph, rotation, displacement);

    Some(Placement {
        transform: PlacementTransform::new(translation, rotation),
        representative: Geom::Contour(line),
    })
}

fn place_polygon(
    geometry: &[Geom],
    glyph: &ShapedGlyph,
    placement: &LabelPlacement,
    screen: &Rect,
) -> Option<Placement> {
    let mut polygons = Vec::new();
    for geom in geometry {
        match geom {
            Geom::Polygon(p) => polygons.push(p.clone()),
            Geom::MultiPolygon(ps) => polygons.extend(ps.iter().cloned()),
            // Closed rings label as the area they enclose.
            Geom::Contour(c) if c.is_closed => polygons.push(Polygon::new(c.clone())),
            Geom::MultiContour(cs) => {
                polygons.extend(cs.iter().filter(|c| c.is_closed).map(|c| Polygon::new(c.clone())))
            }
            _ => {}
        }
    }

    // The largest visible polygon carries the label.
    let mut best: Option<Polygon> = None;
    for polygon in &polygons {
        let clipped = match clip_polygon(polygon, screen) {
            Ok(Some(clipped)) => clipped,
            Ok(None) => continue,
            Err(e) => {
                log::debug!("label polygon could not be clipped: {e}");
                polygon.clone()
            }
        };

        if best
            .as_ref()
            .map(|b| clipped.area() > b.area())
            .unwrap_or(true)
        {
            best = Some(clipped);
        }
    }
    let polygon = best?;

    let anchor_point = Geom::Polygon(polygon.clone()).centroid()?;

    let rotation = match placement.mode {
        LabelPlacementMode::Point => placement.rotation,
        LabelPlacementMode::Line => 0.0,
    };

    let translation = anchored_translation(
        anchor_point,
        placement.anchor,
        glyph,
        rotation,
        placement.displacement,
    );

    Some(Placement {
        transform: PlacementTransform::new(translation, rotation),
        representative: Geom::Polygon(polygon),
    })
}

/// Estimates how well a placed label fits its geometry, in `[0.0, 1.0]`.
///
/// Point and line labels always fit. For polygons the label centerline is sampled
/// and each sample within one glyph height of the polygon counts towards the fit;
/// a polygon without usable interior falls back to the overlap ratio of the
/// bounding rectangles.
pub(crate) fn goodness_of_fit(
    transform: &PlacementTransform,
    glyph: &ShapedGlyph,
    representative: &Geom,
) -> f64 {
    let Geom::Polygon(polygon) = representative else {
        return 1.0;
    };

    if polygon.area() > 0.0 {
        let mut hits = 0;
        for i in 0..FIT_SAMPLES {
            let x = glyph.width * (i as f64 + 0.5) / FIT_SAMPLES as f64;
            let sample = transform.apply(Point2d::new(x, glyph.height / 2.0));
            let close_enough = polygon
                .distance(&sample)
                .map(|d| d <= glyph.height)
                .unwrap_or(false);
            if close_enough {
                hits += 1;
            }
        }
        return hits as f64 / FIT_SAMPLES as f64;
    }

    let label_bounds = transform.bounds(glyph.width, glyph.height);
    match (polygon.bounding_rect(), label_bounds.area()) {
        (Some(poly_bounds), label_area) if label_area > 0.0 => label_bounds
            .intersection(&poly_bounds)
            .map(|overlap| overlap.area() / label_area)
            .unwrap_or(0.0),
        _ => 0.0,
    }
}
