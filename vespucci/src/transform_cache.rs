//! Memoization of coordinate transforms to the display reference system.

use std::sync::Arc;

use ahash::HashMap;

use crate::crs::Crs;
use crate::error::VespucciError;
use crate::transform::{AffineTransform, MathTransform, TransformFactory};

/// Cache of math transforms into a fixed display reference system.
///
/// Constructing a transform through the general [`TransformFactory`] path is
/// expensive, so transforms targeting the display system are memoized by their
/// source system code. The whole cache is discarded when either the display system
/// or the factory changes.
pub struct TransformCache {
    display_crs: Crs,
    factory: Arc<dyn TransformFactory>,
    identity: Arc<dyn MathTransform>,
    cache: HashMap<String, Arc<dyn MathTransform>>,
}

impl TransformCache {
    /// Creates a cache with the given display reference system.
    pub fn new(display_crs: Crs, factory: Arc<dyn TransformFactory>) -> Self {
        Self {
            display_crs,
            factory,
            identity: Arc::new(AffineTransform::identity()),
            cache: HashMap::default(),
        }
    }

    /// The display reference system transforms are cached for.
    pub fn display_crs(&self) -> &Crs {
        &self.display_crs
    }

    /// Changes the display reference system, discarding all cached transforms.
    pub fn set_display_crs(&mut self, crs: Crs) {
        if self.display_crs != crs {
            self.display_crs = crs;
            self.cache.clear();
        }
    }

    /// Replaces the transform factory, discarding all cached transforms.
    pub fn set_factory(&mut self, factory: Arc<dyn TransformFactory>) {
        self.factory = factory;
        self.cache.clear();
    }

    /// Returns a transform from `source` to `target`.
    ///
    /// Lookup order: the memoized display-target entry, then the fitted-system
    /// shortcuts (in both directions), then the identity fast path, and only then the
    /// general factory. Factory failures are returned to the caller, never swallowed.
    pub fn transform_for(
        &mut self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Arc<dyn MathTransform>, VespucciError> {
        let to_display = *target == self.display_crs;
        if to_display {
            if let Some(cached) = self.cache.get(source.code()) {
                return Ok(cached.clone());
            }
        }

        let transform = self.create_transform(source, target)?;
        if to_display {
            self.cache
                .insert(source.code().to_string(), transform.clone());
        }

        Ok(transform)
    }

    fn create_transform(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Arc<dyn MathTransform>, VespucciError> {
        if let Some((base, to_base)) = source.base_transform() {
            if base == target {
                return Ok(Arc::new(*to_base));
            }
        }

        if let Some((base, to_base)) = target.base_transform() {
            if base == source {
                let from_base =
                    to_base
                        .try_inverse()
                        .ok_or_else(|| VespucciError::TransformCreation {
                            source_crs: source.code().to_string(),
                            target_crs: target.code().to_string(),
                        })?;
                return Ok(Arc::new(from_base));
            }
        }

        if source == target {
            return Ok(self.identity.clone());
        }

        self.factory.create(source, target)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;
    use crate::geometry::Point2d;
    use crate::transform::NullTransformFactory;

    #[derive(Debug)]
    struct CountingFactory {
        calls: AtomicUsize,
    }

    impl CountingFactory {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TransformFactory for CountingFactory {
        fn create(
            &self,
            _source: &Crs,
            _target: &Crs,
        ) -> Result<Arc<dyn MathTransform>, VespucciError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(AffineTransform::scale(2.0, 2.0)))
        }
    }

    #[test]
    fn identity_for_equal_systems() {
        let mut cache = TransformCache::new(Crs::web_mercator(), Arc::new(NullTransformFactory));
        let transform = cache
            .transform_for(&Crs::wgs84(), &Crs::wgs84())
            .expect("identity never fails");
        assert!(transform.is_identity());
    }

    #[test]
    fn display_transforms_are_cached() {
        let factory = Arc::new(CountingFactory::new());
        let mut cache = TransformCache::new(Crs::web_mercator(), factory.clone());

        let first = cache
            .transform_for(&Crs::wgs84(), &Crs::web_mercator())
            .expect("factory provides it");
        let second = cache
            .transform_for(&Crs::wgs84(), &Crs::web_mercator())
            .expect("cached");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_display_targets_are_not_cached() {
        let factory = Arc::new(CountingFactory::new());
        let mut cache = TransformCache::new(Crs::web_mercator(), factory.clone());

        let overlay = Crs::projected("overlay");
        cache
            .transform_for(&Crs::wgs84(), &overlay)
            .expect("factory provides it");
        cache
            .transform_for(&Crs::wgs84(), &overlay)
            .expect("factory provides it");

        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cache_invalidated_on_display_crs_change() {
        let factory = Arc::new(CountingFactory::new());
        let mut cache = TransformCache::new(Crs::web_mercator(), factory.clone());

        let first = cache
            .transform_for(&Crs::wgs84(), &Crs::web_mercator())
            .expect("factory provides it");
        cache.set_display_crs(Crs::projected("EPSG:32633"));
        cache.set_display_crs(Crs::web_mercator());
        let second = cache
            .transform_for(&Crs::wgs84(), &Crs::web_mercator())
            .expect("factory provides it");

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fitted_shortcut_bypasses_factory() {
        let display = Crs::web_mercator();
        let to_base = AffineTransform::new(2.0, 0.0, 0.0, 2.0, 100.0, -50.0);
        let fitted = Crs::fitted("screen", display.clone(), to_base);

        let mut cache = TransformCache::new(display.clone(), Arc::new(NullTransformFactory));

        // Fitted -> base uses the stored affine.
        let forward = cache
            .transform_for(&fitted, &display)
            .expect("shortcut applies");
        assert_abs_diff_eq!(
            forward.apply(Point2d::new(1.0, 1.0)),
            Point2d::new(102.0, -48.0)
        );

        // Base -> fitted uses the inverse.
        let inverse = cache
            .transform_for(&display, &fitted)
            .expect("shortcut applies");
        assert_abs_diff_eq!(
            inverse.apply(Point2d::new(102.0, -48.0)),
            Point2d::new(1.0, 1.0)
        );

        // Anything else still goes to the factory, which reports the failure.
        assert_matches!(
            cache.transform_for(&Crs::wgs84(), &Crs::projected("other")),
            Err(VespucciError::TransformCreation { .. })
        );
    }
}
