//! Coordinate reference system descriptors.
//!
//! This is not a CRS database: a [`Crs`] only carries what the pipeline needs to
//! relate systems to each other - an identity code, whether coordinates are angular,
//! and, for affine-derived ("fitted") systems, the base system and the affine that
//! links them.

use crate::transform::AffineTransform;

/// A coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    code: String,
    kind: CrsKind,
}

/// Kind of a reference system.
#[derive(Debug, Clone, PartialEq)]
pub enum CrsKind {
    /// Angular coordinates (longitude, latitude) in degrees.
    Geographic,
    /// Planar coordinates in linear units.
    Projected,
    /// A system derived from a base system by an affine transform.
    Fitted {
        /// The system this one is derived from.
        base: Box<Crs>,
        /// Transform from this system's coordinates to the base system.
        to_base: AffineTransform,
    },
}

impl Crs {
    /// WGS84 geographic coordinates.
    pub fn wgs84() -> Self {
        Self::geographic("EPSG:4326")
    }

    /// Web Mercator projection used by most web maps.
    pub fn web_mercator() -> Self {
        Self::projected("EPSG:3857")
    }

    /// Creates a geographic reference system with the given code.
    pub fn geographic(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: CrsKind::Geographic,
        }
    }

    /// Creates a projected reference system with the given code.
    pub fn projected(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: CrsKind::Projected,
        }
    }

    /// Creates a fitted reference system derived from `base` by `to_base`.
    pub fn fitted(code: impl Into<String>, base: Crs, to_base: AffineTransform) -> Self {
        Self {
            code: code.into(),
            kind: CrsKind::Fitted {
                base: Box::new(base),
                to_base,
            },
        }
    }

    /// Identity code of the system.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Kind of the system.
    pub fn kind(&self) -> &CrsKind {
        &self.kind
    }

    /// Returns true if coordinates in this system are angular.
    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic)
    }

    /// For a fitted system, its base system and the stored affine to it.
    pub fn base_transform(&self) -> Option<(&Crs, &AffineTransform)> {
        match &self.kind {
            CrsKind::Fitted { base, to_base } => Some((base, to_base)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        assert_eq!(Crs::wgs84(), Crs::geographic("EPSG:4326"));
        assert_ne!(Crs::wgs84(), Crs::web_mercator());

        let fitted = Crs::fitted("local", Crs::web_mercator(), AffineTransform::scale(2.0, 2.0));
        assert_eq!(
            fitted.base_transform().map(|(base, _)| base.code()),
            Some("EPSG:3857")
        );
    }
}
