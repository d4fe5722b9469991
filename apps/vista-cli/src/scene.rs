use glam::{Quat, Vec3};
use vista_bounds::AabbData;
use vista_common::{EntityId, MaterialHandle, MeshHandle, Renderable, Transform};
use vista_kernel::{StepStats, World, WorldError};
use vista_render::{Camera, MapKind, MaterialMaps, MaterialTable, TextureHandle};

use crate::config::SceneConfig;

const MESHES: u64 = 3;
const MATERIALS: u64 = 4;
/// Pivot rotation per simulation tick, in radians.
const SPIN_RATE: f32 = 0.02;

/// Demo scene: a square grid of boxes parented to one pivot, seen by a
/// camera hovering above one edge.
///
/// The pivot turns on even ticks only, so odd ticks reuse every world
/// matrix from the tick before.
pub struct Scene {
    pub world: World,
    pub camera: Camera,
    pub materials: MaterialTable,
    pivot: EntityId,
}

impl Scene {
    pub fn new(config: &SceneConfig) -> Result<Self, WorldError> {
        let mut world = World::new();
        let unit = AabbData::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5));
        let pivot = world.spawn(&Transform::default(), unit);

        let n = config.grid_size;
        let offset = (n.saturating_sub(1)) as f32 * config.grid_spacing / 2.0;
        for i in 0..n {
            for j in 0..n {
                let position = Vec3::new(
                    i as f32 * config.grid_spacing - offset,
                    0.0,
                    j as f32 * config.grid_spacing - offset,
                );
                let id = world.spawn(&Transform::from_position(position), unit);
                world.set_parent(id, Some(pivot))?;
                world.set_renderable(
                    id,
                    Some(Renderable {
                        mesh: MeshHandle((i + j) as u64 % MESHES),
                        material: MaterialHandle(i as u64 % MATERIALS),
                    }),
                )?;
            }
        }

        let mut materials = MaterialTable::new();
        for m in 0..MATERIALS {
            let mut maps = MaterialMaps::new().with(MapKind::Albedo, TextureHandle(m * 2));
            if m % 2 == 0 {
                maps.set(MapKind::Normal, Some(TextureHandle(m * 2 + 1)));
            }
            materials.insert(MaterialHandle(m), maps);
        }

        let mut camera = Camera::new(&config.camera);
        let reach = offset.max(1.0);
        camera.look_at(Vec3::new(0.0, reach, reach * 2.0), Vec3::ZERO, Vec3::Y);
        camera.update();
        world.step();

        tracing::debug!(entities = world.entity_count(), "scene built");
        Ok(Self {
            world,
            camera,
            materials,
            pivot,
        })
    }

    /// Advance one simulation tick.
    pub fn advance(&mut self) -> Result<StepStats, WorldError> {
        let next = self.world.tick() + 1;
        if next % 2 == 0 {
            let angle = next as f32 * SPIN_RATE;
            self.world.set_transform(
                self.pivot,
                &Transform::default().with_rotation(Quat::from_rotation_y(angle)),
            )?;
        }
        self.camera.update();
        Ok(self.world.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SceneConfig {
        SceneConfig {
            grid_size: 3,
            grid_spacing: 2.0,
            ..SceneConfig::default()
        }
    }

    #[test]
    fn builds_grid_under_pivot() {
        let scene = Scene::new(&small()).unwrap();
        assert_eq!(scene.world.entity_count(), 10);
        assert_eq!(scene.world.tick(), 1);
        assert_eq!(scene.materials.len(), MATERIALS as usize);
        let children = scene
            .world
            .entities()
            .values()
            .filter(|e| e.renderable().is_some())
            .count();
        assert_eq!(children, 9);
    }

    #[test]
    fn odd_ticks_reuse_matrices() {
        let mut scene = Scene::new(&small()).unwrap();
        // Tick 2 turns the pivot, tick 3 leaves it alone.
        let turned = scene.advance().unwrap();
        assert_eq!(turned.matrices_rebuilt, 10);
        let idle = scene.advance().unwrap();
        assert_eq!(idle.matrices_rebuilt, 0);
        assert_eq!(idle.bounds_recomputed, 0);
    }

    #[test]
    fn empty_grid_keeps_pivot() {
        let config = SceneConfig {
            grid_size: 0,
            ..SceneConfig::default()
        };
        let scene = Scene::new(&config).unwrap();
        assert_eq!(scene.world.entity_count(), 1);
        assert!(scene.world.get(scene.pivot).is_some());
    }
}
