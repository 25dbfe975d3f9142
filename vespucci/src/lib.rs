//! Map rendering support pipeline.
//!
//! Vespucci is the machinery that sits between a map application and its render
//! backend. It does not fetch data and it does not rasterize pixels; it owns
//! everything in between:
//!
//! * [`LayerRegistry`] keeps the ordered set of [layers](MapLayer), their ownership
//!   and visibility, and maintains the union of their preferred display areas
//!   incrementally.
//! * [`TransformCache`] memoizes coordinate transforms into the display reference
//!   system, with shortcuts for affine-derived systems.
//! * [`Decimator`] thins geometry down to what is distinguishable at the display
//!   resolution before it reaches the backend.
//! * [`LabelCache`](label::LabelCache) collects labels during a render pass and
//!   resolves their fights for screen space by priority afterwards.
//! * [`Renderer`](render::Renderer) drives a full pass over the registry's layers
//!   into a backend [`Canvas`](render::Canvas).
//!
//! The backend seams are small traits: a [`Canvas`](render::Canvas) that draws
//! screen-space geometry, a [`LabelSurface`](label::LabelSurface) that shapes and
//! draws text, and a [`TransformFactory`](transform::TransformFactory) for reference
//! systems that are not trivially related.

pub mod color;
pub mod crs;
pub mod decimation;
pub mod error;
pub mod geometry;
pub mod label;
pub mod layer;
pub mod map;
pub mod render;
pub mod transform;
pub mod transform_cache;
pub mod view;

pub use color::Color;
pub use crs::Crs;
pub use decimation::Decimator;
pub use error::VespucciError;
pub use label::LabelCache;
pub use layer::{LayerSource, MapLayer};
pub use map::LayerRegistry;
pub use render::{Canvas, RenderPass, Renderer};
pub use transform_cache::TransformCache;
pub use view::{MapView, Size};
