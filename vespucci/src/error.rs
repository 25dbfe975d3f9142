//! Error types used by the crate.

use thiserror::Error;

/// Vespucci error type.
#[derive(Debug, Error)]
pub enum VespucciError {
    /// A layer was added to or removed from a registry that does not own it.
    #[error("layer is owned by another registry")]
    LayerOwnership,
    /// The transform factory could not relate two reference systems.
    #[error("cannot create transform from {source_crs} to {target_crs}")]
    TransformCreation {
        /// Code of the source reference system.
        source_crs: String,
        /// Code of the target reference system.
        target_crs: String,
    },
    /// Text shaping failed for a label.
    #[error("failed to shape label text: {0}")]
    Shaping(String),
    /// Geometry is degenerate or empty and cannot be processed.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}
