use nalgebra::{Point2, Scalar};
use num_traits::Num;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect<N = f64> {
    x_min: N,
    y_min: N,
    x_max: N,
    y_max: N,
}

/// Specifies how rectangle containment tests treat shared edges.
///
/// The aggregate display area maintenance uses both flavors: a removed area is only
/// provably irrelevant when it lies strictly inside the aggregate ([`EdgeRule::Strict`]),
/// while an added area is redundant even when it touches the aggregate boundary
/// ([`EdgeRule::AllowTouch`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EdgeRule {
    /// An inner rectangle sharing an edge coordinate with the outer one still counts as
    /// contained.
    AllowTouch,
    /// The inner rectangle must lie strictly inside the outer one.
    Strict,
}

impl<N: Num + Copy + PartialOrd + Scalar> Rect<N> {
    /// Creates a new rectangle from its edge coordinates.
    pub fn new(x_min: N, y_min: N, x_max: N, y_max: N) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Minimum X coordinate.
    pub fn x_min(&self) -> N {
        self.x_min
    }

    /// Minimum Y coordinate.
    pub fn y_min(&self) -> N {
        self.y_min
    }

    /// Maximum X coordinate.
    pub fn x_max(&self) -> N {
        self.x_max
    }

    /// Maximum Y coordinate.
    pub fn y_max(&self) -> N {
        self.y_max
    }

    /// Width of the rectangle.
    pub fn width(&self) -> N {
        self.x_max - self.x_min
    }

    /// Height of the rectangle.
    pub fn height(&self) -> N {
        self.y_max - self.y_min
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> Point2<N> {
        let two = N::one() + N::one();
        Point2::new(
            (self.x_min + self.x_max) / two,
            (self.y_min + self.y_max) / two,
        )
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn merge(&self, other: Self) -> Self {
        Self {
            x_min: min(self.x_min, other.x_min),
            y_min: min(self.y_min, other.y_min),
            x_max: max(self.x_max, other.x_max),
            y_max: max(self.y_max, other.y_max),
        }
    }

    /// Intersection of the two rectangles, or `None` if they do not overlap.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x_min = max(self.x_min, other.x_min);
        let y_min = max(self.y_min, other.y_min);
        let x_max = min(self.x_max, other.x_max);
        let y_max = min(self.y_max, other.y_max);
        if x_min <= x_max && y_min <= y_max {
            Some(Self {
                x_min,
                y_min,
                x_max,
                y_max,
            })
        } else {
            None
        }
    }

    /// Returns true if the rectangles have at least one common point.
    pub fn intersects(&self, other: &Self) -> bool {
        self.x_min <= other.x_max
            && self.x_max >= other.x_min
            && self.y_min <= other.y_max
            && self.y_max >= other.y_min
    }

    /// Returns true if the point lies inside the rectangle or on its boundary.
    pub fn contains(&self, point: &Point2<N>) -> bool {
        self.x_min <= point.x
            && self.x_max >= point.x
            && self.y_min <= point.y
            && self.y_max >= point.y
    }

    /// Returns true if `other` lies inside `self` under the given [`EdgeRule`].
    pub fn contains_rect(&self, other: &Self, edges: EdgeRule) -> bool {
        match edges {
            EdgeRule::AllowTouch => {
                self.x_min <= other.x_min
                    && self.y_min <= other.y_min
                    && self.x_max >= other.x_max
                    && self.y_max >= other.y_max
            }
            EdgeRule::Strict => {
                self.x_min < other.x_min
                    && self.y_min < other.y_min
                    && self.x_max > other.x_max
                    && self.y_max > other.y_max
            }
        }
    }

    /// Grows the rectangle by `amount` in every direction.
    pub fn pad(&self, amount: N) -> Self {
        Self {
            x_min: self.x_min - amount,
            y_min: self.y_min - amount,
            x_max: self.x_max + amount,
            y_max: self.y_max + amount,
        }
    }

    /// Bounding rectangle of a set of points, or `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Point2<N>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut rect = Self::new(first.x, first.y, first.x, first.y);
        for p in points {
            rect.x_min = min(rect.x_min, p.x);
            rect.y_min = min(rect.y_min, p.y);
            rect.x_max = max(rect.x_max, p.x);
            rect.y_max = max(rect.y_max, p.y);
        }

        Some(rect)
    }

    /// Corners of the rectangle in counter-clockwise order.
    pub fn corners(&self) -> [Point2<N>; 4] {
        [
            Point2::new(self.x_min, self.y_min),
            Point2::new(self.x_max, self.y_min),
            Point2::new(self.x_max, self.y_max),
            Point2::new(self.x_min, self.y_max),
        ]
    }
}

impl Rect<f64> {
    /// Area of the rectangle.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

fn min<N: PartialOrd>(a: N, b: N) -> N {
    if a < b {
        a
    } else {
        b
    }
}

fn max<N: PartialOrd>(a: N, b: N) -> N {
    if a > b {
        a
    } else {
        b
    }
}
