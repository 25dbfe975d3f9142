//! The render driver walking the registry's layers into a backend canvas.

pub mod utils;

use crate::color::Color;
use crate::decimation::Decimator;
use crate::error::VespucciError;
use crate::geometry::Geom;
use crate::label::{LabelCache, LabelSurface, TextSymbolizer};
use crate::map::LayerRegistry;
use crate::transform::{transform_geom, AffineTransform, MathTransform};
use crate::view::MapView;

/// Style of one painted feature.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FeaturePaint {
    /// Interior color, `None` for unfilled features.
    pub fill: Option<Color>,
    /// Outline color, `None` for strokeless features.
    pub stroke: Option<Color>,
    /// Outline width in pixels.
    pub stroke_width: f64,
}

impl FeaturePaint {
    /// A fill-only paint.
    pub fn fill(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            stroke_width: 0.0,
        }
    }

    /// A stroke-only paint.
    pub fn stroke(color: Color, width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            stroke_width: width,
        }
    }
}

/// Render backend the pipeline draws features into.
///
/// Geometry arrives in screen pixels, already decimated to the display resolution.
pub trait Canvas {
    /// Draws one geometry.
    fn draw_geometry(&mut self, geometry: &Geom, paint: &FeaturePaint);
}

/// One layer's window into the render pipeline.
///
/// A [`LayerSource`](crate::LayerSource) receives a pass in its `draw` call and
/// submits features and labels through it; the pass handles decimation and the
/// world-to-screen projection.
pub struct RenderPass<'a> {
    decimator: &'a Decimator,
    canvas: &'a mut dyn Canvas,
    labels: &'a mut LabelCache,
    view: &'a MapView,
    world_to_screen: AffineTransform,
}

impl RenderPass<'_> {
    /// The view being rendered.
    pub fn view(&self) -> &MapView {
        self.view
    }

    /// Draws a geometry given in display coordinates.
    pub fn paint(&mut self, geometry: &Geom, paint: &FeaturePaint) {
        let thinned = self.decimator.decimate(geometry);
        let on_screen = transform_geom(&self.world_to_screen, &thinned);
        self.canvas.draw_geometry(&on_screen, paint);
    }

    /// Queues a label for a feature; the geometry is in display coordinates.
    ///
    /// Labels are not drawn here. They are resolved against each other and drawn
    /// when the whole pass is over.
    pub fn label<F>(
        &mut self,
        symbolizer: &dyn TextSymbolizer<F>,
        feature: &F,
        geometry: &Geom,
        scale_range: Option<(f64, f64)>,
    ) {
        let on_screen = transform_geom(&self.world_to_screen, geometry);
        self.labels.put(symbolizer, feature, on_screen, scale_range);
    }
}

/// Draws the registry's layers into a canvas, bottom layer first.
pub struct Renderer {
    dpi: f64,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Creates a renderer for a standard density target.
    pub fn new() -> Self {
        Self {
            dpi: utils::DEFAULT_DPI,
        }
    }

    /// Creates a renderer for a target with the given density.
    pub fn with_dpi(dpi: f64) -> Self {
        Self { dpi }
    }

    /// Renders all visible layers of the registry into the canvas.
    ///
    /// Layers draw in ascending z-order. Labels collected along the way are resolved
    /// and drawn onto `label_surface` after the last layer. Returns the number of
    /// labels drawn.
    pub fn render(
        &self,
        registry: &LayerRegistry,
        view: &MapView,
        canvas: &mut dyn Canvas,
        label_surface: &mut dyn LabelSurface,
        labels: &mut LabelCache,
    ) -> Result<usize, VespucciError> {
        let world_to_screen = view
            .world_to_screen_transform()
            .ok_or_else(|| VespucciError::Generic("cannot render into a degenerate view".into()))?;
        let screen_to_world = view
            .screen_to_world_transform()
            .ok_or_else(|| VespucciError::Generic("cannot render into a degenerate view".into()))?;
        let decimator = Decimator::new(Some(&screen_to_world as &dyn MathTransform));

        labels.start();
        labels.set_scale_denominator(utils::scale_denominator(
            &view.bounding_rect(),
            registry.display_crs().is_geographic(),
            view.size().width(),
            self.dpi,
        ));

        for (index, layer) in registry.layers().iter().enumerate() {
            if !layer.is_visible() {
                continue;
            }

            labels.start_layer(index);
            let mut pass = RenderPass {
                decimator: &decimator,
                canvas: &mut *canvas,
                labels: &mut *labels,
                view,
                world_to_screen,
            };
            layer.draw(&mut pass);
        }

        Ok(labels.end(label_surface, view.size()))
    }
}
