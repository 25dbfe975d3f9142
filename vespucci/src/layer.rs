//! [Layers](MapLayer) tie a renderable data source to its display properties.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::crs::Crs;
use crate::geometry::{Point2d, Rect};
use crate::render::RenderPass;

/// The renderable payload of a layer.
///
/// A source submits its geometry to the given [`RenderPass`]; how the data is stored,
/// fetched or styled is of no concern to the pipeline.
pub trait LayerSource: Send + Sync {
    /// Submits the source's renderable content to the pass.
    fn draw(&self, pass: &mut RenderPass<'_>);

    /// Drops any internal render caches. Called when the layer is removed from its
    /// registry.
    fn clear_cache(&mut self) {}
}

/// Pointer event forwarded from the host surface.
#[derive(Debug, Copy, Clone)]
pub struct PointerEvent {
    /// Position of the pointer in screen pixels.
    pub screen_position: Point2d,
}

/// Per-layer handler for pointer events ("tool capability").
pub trait InteractionHandler: Send + Sync {
    /// Handles the event. Returns true if the event was consumed.
    fn handle_pointer(&self, event: &PointerEvent) -> bool;
}

/// Receives property change notifications from a layer.
pub(crate) trait LayerListener: Send + Sync {
    fn on_layer_change(&self, layer: &MapLayer, change: LayerChange);
}

/// A property change of one layer.
pub(crate) enum LayerChange {
    /// The preferred display area changed. Areas are in the layer's own CRS.
    Area {
        old: Option<Rect>,
        new: Option<Rect>,
    },
    ZOrder,
    Visibility {
        was_visible: bool,
        visible: bool,
    },
    ToolCapability,
}

struct LayerState {
    z_order: f64,
    visible: bool,
    preferred_area: Option<Rect>,
    crs: Crs,
    source: Box<dyn LayerSource>,
    handler: Option<Arc<dyn InteractionHandler>>,
    owner: Option<u64>,
    listener: Option<Weak<dyn LayerListener>>,
}

/// A renderable unit of the map.
///
/// The handle is cheaply cloneable and shares state; identity is by handle, not by
/// value ([`MapLayer::ptr_eq`]). A layer is owned by at most one
/// [`LayerRegistry`](crate::LayerRegistry) at a time; while owned, property changes
/// are reported to the owning registry.
#[derive(Clone)]
pub struct MapLayer {
    state: Arc<RwLock<LayerState>>,
}

impl MapLayer {
    /// Creates a layer over the given source, with coordinates in `crs`.
    pub fn new(crs: Crs, source: Box<dyn LayerSource>) -> Self {
        Self {
            state: Arc::new(RwLock::new(LayerState {
                z_order: 0.0,
                visible: true,
                preferred_area: None,
                crs,
                source,
                handler: None,
                owner: None,
                listener: None,
            })),
        }
    }

    /// Z-order of the layer. Layers with higher values are drawn on top.
    pub fn z_order(&self) -> f64 {
        self.state.read().z_order
    }

    /// Sets the z-order of the layer.
    pub fn set_z_order(&self, z_order: f64) {
        {
            let mut state = self.state.write();
            if state.z_order == z_order {
                return;
            }
            state.z_order = z_order;
        }
        self.notify(LayerChange::ZOrder);
    }

    /// Returns true if the layer is rendered.
    pub fn is_visible(&self) -> bool {
        self.state.read().visible
    }

    /// Shows or hides the layer.
    pub fn set_visible(&self, visible: bool) {
        let was_visible;
        {
            let mut state = self.state.write();
            if state.visible == visible {
                return;
            }
            was_visible = state.visible;
            state.visible = visible;
        }
        self.notify(LayerChange::Visibility {
            was_visible,
            visible,
        });
    }

    /// The area this layer prefers to be displayed in, in the layer's own CRS.
    pub fn preferred_area(&self) -> Option<Rect> {
        self.state.read().preferred_area
    }

    /// Changes the preferred display area of the layer.
    pub fn set_preferred_area(&self, area: Option<Rect>) {
        let old;
        {
            let mut state = self.state.write();
            if state.preferred_area == area {
                return;
            }
            old = state.preferred_area;
            state.preferred_area = area;
        }
        self.notify(LayerChange::Area { old, new: area });
    }

    /// Reference system of the layer's coordinates.
    pub fn crs(&self) -> Crs {
        self.state.read().crs.clone()
    }

    /// The layer's pointer event handler, if any.
    pub fn interaction_handler(&self) -> Option<Arc<dyn InteractionHandler>> {
        self.state.read().handler.clone()
    }

    /// Sets or clears the layer's pointer event handler.
    pub fn set_interaction_handler(&self, handler: Option<Arc<dyn InteractionHandler>>) {
        {
            let mut state = self.state.write();
            state.handler = handler;
        }
        self.notify(LayerChange::ToolCapability);
    }

    /// Submits the layer's content to the render pass.
    pub fn draw(&self, pass: &mut RenderPass<'_>) {
        self.state.read().source.draw(pass)
    }

    /// Returns true if the two handles refer to the same layer.
    pub fn ptr_eq(&self, other: &MapLayer) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn owner(&self) -> Option<u64> {
        self.state.read().owner
    }

    /// Takes ownership of the layer for a registry. Forces the layer visible.
    pub(crate) fn bind(&self, owner: u64, listener: Weak<dyn LayerListener>) {
        let mut state = self.state.write();
        state.owner = Some(owner);
        state.listener = Some(listener);
        state.visible = true;
    }

    /// Releases the layer from its registry: hides it, drops its render caches and
    /// nulls the registry backlink.
    pub(crate) fn unbind(&self) {
        let mut state = self.state.write();
        state.owner = None;
        state.listener = None;
        state.visible = false;
        state.source.clear_cache();
    }

    fn notify(&self, change: LayerChange) {
        // The state lock is released before notifying: the listener is free to read
        // the layer back.
        let listener = self.state.read().listener.clone();
        if let Some(listener) = listener.and_then(|weak| weak.upgrade()) {
            listener.on_layer_change(self, change);
        }
    }
}
