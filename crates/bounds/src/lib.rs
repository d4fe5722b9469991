//! Bounding volumes: axis-aligned boxes and spheres.
//!
//! # Invariants
//! - A non-empty `AabbData` always has `min <= max` component-wise.
//! - World bounds are recomputed only when handed a different `MatrixHandle`
//!   object than the one they were last computed from.

mod aabb;
mod handle;
mod sphere;

pub use aabb::{Aabb, AabbData};
pub use handle::MatrixHandle;
pub use sphere::{BoundingSphere, SphereData, max_axis_scale};

/// Errors from validating bounding volume input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsError {
    #[error("inverted bounds on {axis} axis: min {min} > max {max}")]
    Inverted { axis: char, min: f32, max: f32 },
    #[error("bounds contain a non-finite component")]
    NonFinite,
    #[error("negative sphere radius: {0}")]
    NegativeRadius(f32),
}
