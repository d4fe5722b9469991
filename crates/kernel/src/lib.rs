//! World kernel: transform hierarchy, spatial entities, simulation stepping.
//!
//! # Invariants
//! - The transform hierarchy is acyclic; reparenting that would close a loop is rejected.
//! - World matrices are composed fresh from the chain; caching lives in the bounds layer.
//! - A chain whose stamp has not changed keeps its `MatrixHandle`, so bounds skip work.

pub mod hierarchy;
pub mod world;

pub use hierarchy::{HierarchyError, NodeId, TransformTree};
pub use world::{SpatialEntity, StepStats, World, WorldError};
