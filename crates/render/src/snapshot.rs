use glam::Mat4;
use serde::Serialize;
use vista_bounds::{AabbData, SphereData};
use vista_common::{EntityId, Renderable};
use vista_kernel::World;

use crate::camera::{Camera, CameraSnapshot};

/// World-space bounds of one entity as published for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityBounds {
    pub id: EntityId,
    pub model: Mat4,
    pub aabb: AabbData,
    pub sphere: SphereData,
    pub renderable: Option<Renderable>,
}

/// Everything the render context reads for one frame.
///
/// Lives inside the triple buffer. The simulation side refills the write
/// instance each tick with [`FrameSnapshot::capture_into`], reusing its
/// allocations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub camera: CameraSnapshot,
    pub entities: Vec<EntityBounds>,
}

impl FrameSnapshot {
    pub fn capture(world: &World, camera: &Camera) -> Self {
        let mut snapshot = Self::default();
        snapshot.capture_into(world, camera);
        snapshot
    }

    /// Overwrite this snapshot with the current world and camera state.
    pub fn capture_into(&mut self, world: &World, camera: &Camera) {
        self.tick = world.tick();
        self.camera = camera.snapshot();
        self.entities.clear();
        self.entities
            .extend(world.entities().iter().map(|(id, e)| EntityBounds {
                id: *id,
                model: *e.world_matrix().matrix(),
                aabb: *e.aabb().world(),
                sphere: *e.sphere().world(),
                renderable: e.renderable().copied(),
            }));
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
