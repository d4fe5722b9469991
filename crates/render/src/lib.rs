//! Render-side visibility: cameras, frustums, published frame snapshots, culling.
//!
//! # Invariants
//! - After any camera setter returns, projection, view-projection and frustum agree.
//! - Culling reads only a published `FrameSnapshot`, never the simulation world.
//! - Culling may keep invisible boxes near frustum edges; it never drops visible ones.

mod camera;
mod cull;
mod frustum;
mod gpu;
mod material;
mod renderer;
mod snapshot;

pub use camera::{Camera, CameraDefaults, CameraSnapshot};
pub use cull::{CullStats, DrawItem, Visibility, cull, cull_into, draw_list};
pub use frustum::{Frustum, FrustumPlane};
pub use gpu::{CameraUniform, InstanceData, instance_data};
pub use material::{MapKind, MaterialMaps, MaterialTable, TextureHandle};
pub use renderer::{DebugTextRenderer, Renderer};
pub use snapshot::{EntityBounds, FrameSnapshot};

pub fn crate_info() -> &'static str {
    "vista-render v0.1.0"
}
