//! The [`LayerRegistry`] holding the ordered set of renderable layers.

mod area;

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use ahash::HashMap;
use parking_lot::Mutex;

use crate::crs::Crs;
use crate::error::VespucciError;
use crate::geometry::Rect;
use crate::layer::{LayerChange, LayerListener, MapLayer};
use crate::transform::{transform_rect, MathTransform, NullTransformFactory, TransformFactory};
use crate::transform_cache::TransformCache;

use area::{change_area, AreaUpdate};

/// Hint key for the resolution the layers should prepare their data for.
pub const HINT_TARGET_RESOLUTION: &str = "target-resolution";
/// Hint key telling layers whether they may prefetch data outside the visible area.
pub const HINT_PREFETCH_ALLOWED: &str = "prefetch-allowed";
/// Hint key overriding the transform factory used by the transform cache.
pub const HINT_TRANSFORM_FACTORY: &str = "transform-factory";

/// Value of a render hint.
///
/// Unrecognized hint keys are stored and otherwise ignored, so layers are free to
/// define their own.
#[derive(Debug, Clone)]
pub enum HintValue {
    /// A numeric hint.
    Float(f64),
    /// A boolean hint.
    Bool(bool),
    /// A textual hint.
    Text(String),
    /// A transform factory override.
    TransformFactory(Arc<dyn TransformFactory>),
}

/// Change notification emitted by a [`LayerRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    /// The union of the layers' preferred display areas changed.
    AggregateAreaChanged {
        /// The new aggregate area in the display reference system.
        area: Option<Rect>,
    },
    /// A member layer was shown or hidden.
    LayerVisibilityChanged {
        /// The new visibility.
        visible: bool,
    },
    /// A member layer changed its z-order.
    LayerZOrderChanged,
}

/// Host surface that can deliver pointer events to the registry's layers.
pub trait EventSurface: Send + Sync {
    /// Starts delivering pointer events.
    fn register_pointer_listener(&mut self);
    /// Stops delivering pointer events.
    fn deregister_pointer_listener(&mut self);
}

type Listener = Box<dyn Fn(&RegistryEvent) + Send + Sync>;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Ordered collection of map layers.
///
/// The registry owns its layers (a layer can belong to at most one registry),
/// maintains their z-order lazily, and keeps the union of their preferred display
/// areas up to date incrementally. All methods are safe to call from any thread; the
/// registry state is guarded by a single lock, so mutations are serialized.
pub struct LayerRegistry {
    shared: Arc<RegistryShared>,
}

struct RegistryShared {
    id: u64,
    inner: Mutex<RegistryInner>,
    listeners: Mutex<Vec<Listener>>,
}

struct RegistryInner {
    layers: Vec<MapLayer>,
    order_stale: bool,
    aggregate_area: Option<Rect>,
    transforms: TransformCache,
    hints: HashMap<String, HintValue>,
    surface: Option<Box<dyn EventSurface>>,
}

impl LayerRegistry {
    /// Creates a registry rendering to the given display reference system.
    ///
    /// Transforms between differing systems require a factory; see
    /// [`LayerRegistry::with_transform_factory`].
    pub fn new(display_crs: Crs) -> Self {
        Self::with_transform_factory(display_crs, Arc::new(NullTransformFactory))
    }

    /// Creates a registry with a transform factory for the general transform path.
    pub fn with_transform_factory(display_crs: Crs, factory: Arc<dyn TransformFactory>) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                id: NEXT_REGISTRY_ID.fetch_add(1, AtomicOrdering::Relaxed),
                inner: Mutex::new(RegistryInner {
                    layers: Vec::new(),
                    order_stale: false,
                    aggregate_area: None,
                    transforms: TransformCache::new(display_crs, factory),
                    hints: HashMap::default(),
                    surface: None,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Adds a layer to the registry, taking ownership of it.
    ///
    /// Adding a layer that is already in this registry is a no-op. Adding a layer
    /// owned by another registry fails with [`VespucciError::LayerOwnership`] and
    /// leaves both registries unchanged. The layer is forced visible.
    pub fn add_layer(&self, layer: &MapLayer) -> Result<(), VespucciError> {
        match layer.owner() {
            Some(id) if id == self.shared.id => return Ok(()),
            Some(_) => return Err(VespucciError::LayerOwnership),
            None => {}
        }

        let event = {
            let mut inner = self.shared.inner.lock();
            let weak = Arc::downgrade(&self.shared);
            let listener: Weak<dyn LayerListener> = weak;
            layer.bind(self.shared.id, listener);

            inner.layers.push(layer.clone());
            inner.order_stale = true;
            let event = inner.fold_area_change(&layer.crs(), None, layer.preferred_area());
            inner.sync_pointer_listener();
            event
        };

        self.shared.emit_all(event);
        Ok(())
    }

    /// Removes a layer from the registry.
    ///
    /// Removing a layer that belongs to no registry is a no-op; removing one owned by
    /// a different registry fails with [`VespucciError::LayerOwnership`]. The removed
    /// layer is hidden, its internal caches are dropped and its registry backlink is
    /// cleared.
    pub fn remove_layer(&self, layer: &MapLayer) -> Result<(), VespucciError> {
        match layer.owner() {
            None => return Ok(()),
            Some(id) if id != self.shared.id => return Err(VespucciError::LayerOwnership),
            Some(_) => {}
        }

        let old_contribution = if layer.is_visible() {
            layer.preferred_area()
        } else {
            None
        };
        let crs = layer.crs();

        let event = {
            let mut inner = self.shared.inner.lock();
            layer.unbind();
            inner.layers.retain(|l| !l.ptr_eq(layer));
            let event = inner.fold_area_change(&crs, old_contribution, None);
            inner.sync_pointer_listener();
            event
        };

        self.shared.emit_all(event);
        Ok(())
    }

    /// Removes every layer from the registry and resets the aggregate area.
    pub fn remove_all_layers(&self) {
        let event = {
            let mut inner = self.shared.inner.lock();
            let layers = std::mem::take(&mut inner.layers);
            for layer in &layers {
                layer.unbind();
            }
            inner.order_stale = false;
            let changed = inner.aggregate_area.is_some();
            inner.aggregate_area = None;
            inner.sync_pointer_listener();
            changed.then_some(RegistryEvent::AggregateAreaChanged { area: None })
        };

        self.shared.emit_all(event);
    }

    /// Returns a copy of the layer list sorted ascending by z-order.
    ///
    /// The sort is lazy: it only runs when a z-order change happened since the last
    /// call.
    pub fn layers(&self) -> Vec<MapLayer> {
        let mut inner = self.shared.inner.lock();
        if inner.order_stale {
            inner.layers.sort_by(|a, b| {
                a.z_order()
                    .partial_cmp(&b.z_order())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            inner.order_stale = false;
        }

        inner.layers.clone()
    }

    /// Number of layers in the registry.
    pub fn layer_count(&self) -> usize {
        self.shared.inner.lock().layers.len()
    }

    /// The union of all visible layers' preferred areas, in the display reference
    /// system.
    pub fn aggregate_area(&self) -> Option<Rect> {
        self.shared.inner.lock().aggregate_area
    }

    /// The display reference system of the registry.
    pub fn display_crs(&self) -> Crs {
        self.shared.inner.lock().transforms.display_crs().clone()
    }

    /// Changes the display reference system.
    ///
    /// All cached transforms are discarded and the aggregate area is recomputed in
    /// the new system.
    pub fn set_display_crs(&self, crs: Crs) {
        let event = {
            let mut inner = self.shared.inner.lock();
            inner.transforms.set_display_crs(crs);
            let recomputed = inner.recompute_aggregate();
            if recomputed != inner.aggregate_area {
                inner.aggregate_area = recomputed;
                Some(RegistryEvent::AggregateAreaChanged { area: recomputed })
            } else {
                None
            }
        };

        self.shared.emit_all(event);
    }

    /// Returns a transform from `source` to `target`, using the registry's cache.
    pub fn transform_for(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Arc<dyn MathTransform>, VespucciError> {
        self.shared.inner.lock().transforms.transform_for(source, target)
    }

    /// Stores a render hint.
    ///
    /// Setting [`HINT_TRANSFORM_FACTORY`] with a factory value replaces the transform
    /// factory and discards all cached transforms. Unrecognized keys are stored but
    /// have no effect.
    pub fn set_hint(&self, key: impl Into<String>, value: HintValue) {
        let key = key.into();
        let mut inner = self.shared.inner.lock();
        if key == HINT_TRANSFORM_FACTORY {
            if let HintValue::TransformFactory(factory) = &value {
                inner.transforms.set_factory(factory.clone());
            }
        }
        inner.hints.insert(key, value);
    }

    /// Returns a previously stored render hint.
    pub fn hint(&self, key: &str) -> Option<HintValue> {
        self.shared.inner.lock().hints.get(key).cloned()
    }

    /// Registers a listener for registry change events.
    pub fn add_listener(&self, listener: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        self.shared.listeners.lock().push(Box::new(listener));
    }

    /// Attaches the host surface pointer events are (de)registered on.
    pub fn set_event_surface(&self, surface: Box<dyn EventSurface>) {
        let mut inner = self.shared.inner.lock();
        inner.surface = Some(surface);
        inner.sync_pointer_listener();
    }
}

impl RegistryShared {
    fn emit_all(&self, events: impl IntoIterator<Item = RegistryEvent>) {
        let listeners = self.listeners.lock();
        for event in events {
            for listener in listeners.iter() {
                listener(&event);
            }
        }
    }
}

impl LayerListener for RegistryShared {
    fn on_layer_change(&self, layer: &MapLayer, change: LayerChange) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            match change {
                LayerChange::Area { old, new } => {
                    if layer.is_visible() {
                        events.extend(inner.fold_area_change(&layer.crs(), old, new));
                    }
                }
                LayerChange::ZOrder => {
                    inner.order_stale = true;
                    events.push(RegistryEvent::LayerZOrderChanged);
                }
                LayerChange::Visibility {
                    was_visible,
                    visible,
                } => {
                    let area = layer.preferred_area();
                    let old = if was_visible { area } else { None };
                    let new = if visible { area } else { None };
                    events.extend(inner.fold_area_change(&layer.crs(), old, new));
                    inner.sync_pointer_listener();
                    events.push(RegistryEvent::LayerVisibilityChanged { visible });
                }
                LayerChange::ToolCapability => {
                    inner.sync_pointer_listener();
                }
            }
        }

        self.emit_all(events);
    }
}

impl RegistryInner {
    /// Folds one layer's area change into the aggregate.
    ///
    /// `old` and `new` are in the layer's own reference system. A transform failure
    /// here is recovered by a full recompute (which logs and skips the offending
    /// layer) rather than propagated.
    fn fold_area_change(
        &mut self,
        layer_crs: &Crs,
        old: Option<Rect>,
        new: Option<Rect>,
    ) -> Option<RegistryEvent> {
        let display = self.transforms.display_crs().clone();
        let update = match self.transforms.transform_for(layer_crs, &display) {
            Ok(transform) => change_area(
                self.aggregate_area,
                old.map(|r| transform_rect(transform.as_ref(), &r)),
                new.map(|r| transform_rect(transform.as_ref(), &r)),
            ),
            Err(e) => {
                log::warn!("cannot transform layer area to the display system: {e}");
                AreaUpdate::Recompute
            }
        };

        let new_aggregate = match update {
            AreaUpdate::Unchanged => return None,
            AreaUpdate::Grown(rect) => Some(rect),
            AreaUpdate::Recompute => self.recompute_aggregate(),
        };

        if new_aggregate == self.aggregate_area {
            return None;
        }

        self.aggregate_area = new_aggregate;
        Some(RegistryEvent::AggregateAreaChanged {
            area: new_aggregate,
        })
    }

    /// Recomputes the aggregate area from scratch over all visible layers.
    fn recompute_aggregate(&mut self) -> Option<Rect> {
        let display = self.transforms.display_crs().clone();
        let layers = self.layers.clone();

        let mut aggregate: Option<Rect> = None;
        for layer in layers {
            if !layer.is_visible() {
                continue;
            }
            let Some(area) = layer.preferred_area() else {
                continue;
            };

            match self.transforms.transform_for(&layer.crs(), &display) {
                Ok(transform) => {
                    let area = transform_rect(transform.as_ref(), &area);
                    aggregate = Some(match aggregate {
                        Some(acc) => acc.merge(area),
                        None => area,
                    });
                }
                Err(e) => log::warn!("layer area skipped in the aggregate: {e}"),
            }
        }

        aggregate
    }

    /// Brings the host surface pointer registration in sync with the layers.
    ///
    /// Always deregisters before registering again, so repeated property changes
    /// cannot pile up duplicate registrations.
    fn sync_pointer_listener(&mut self) {
        let wanted = self
            .layers
            .iter()
            .any(|l| l.is_visible() && l.interaction_handler().is_some());

        if let Some(surface) = &mut self.surface {
            surface.deregister_pointer_listener();
            if wanted {
                surface.register_pointer_listener();
            }
        }
    }
}
