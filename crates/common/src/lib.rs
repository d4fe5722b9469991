//! Shared types used across the vista crates.

mod types;

pub use types::{EntityId, MaterialHandle, MeshHandle, Renderable, Transform};
