//! Visibility culling against a published snapshot.
//!
//! Each entity goes through a sphere test first and, if it survives, the
//! per-plane corner test on its world box. Both are conservative: nothing
//! visible is ever rejected, a few invisible boxes near frustum edges pass.

use glam::Mat4;
use serde::Serialize;
use vista_common::{EntityId, MaterialHandle, MeshHandle};

use crate::snapshot::FrameSnapshot;

/// Counters from one culling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CullStats {
    pub tested: usize,
    pub visible: usize,
    pub rejected_by_sphere: usize,
    pub rejected_by_box: usize,
}

/// Indices into [`FrameSnapshot::entities`] that survived culling.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Visibility {
    pub visible: Vec<usize>,
    pub stats: CullStats,
}

impl Visibility {
    pub fn visible_ids<'a>(&'a self, snapshot: &'a FrameSnapshot) -> impl Iterator<Item = EntityId> + 'a {
        self.visible.iter().map(|&i| snapshot.entities[i].id)
    }
}

/// One draw for the submission layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawItem {
    pub entity: EntityId,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub model: Mat4,
}

pub fn cull(snapshot: &FrameSnapshot) -> Visibility {
    let mut out = Visibility::default();
    cull_into(snapshot, &mut out);
    out
}

/// Cull into an existing result, reusing its allocation across frames.
pub fn cull_into(snapshot: &FrameSnapshot, out: &mut Visibility) {
    let frustum = &snapshot.camera.frustum;
    out.visible.clear();
    let mut stats = CullStats::default();

    for (i, e) in snapshot.entities.iter().enumerate() {
        stats.tested += 1;
        if e.aabb.is_empty() || !frustum.sphere_in_frustum(e.sphere.center, e.sphere.radius) {
            stats.rejected_by_sphere += 1;
            continue;
        }
        if !frustum.aabb_in_frustum(&e.aabb) {
            stats.rejected_by_box += 1;
            continue;
        }
        out.visible.push(i);
    }
    stats.visible = out.visible.len();
    out.stats = stats;
    tracing::trace!(
        tick = snapshot.tick,
        tested = stats.tested,
        visible = stats.visible,
        "culling pass"
    );
}

/// Draw list for the visible renderable entities, grouped by material then mesh.
pub fn draw_list(snapshot: &FrameSnapshot, visibility: &Visibility) -> Vec<DrawItem> {
    let mut items: Vec<DrawItem> = visibility
        .visible
        .iter()
        .filter_map(|&i| {
            let e = &snapshot.entities[i];
            e.renderable.map(|r| DrawItem {
                entity: e.id,
                mesh: r.mesh,
                material: r.material,
                model: e.model,
            })
        })
        .collect();
    items.sort_by_key(|d| (d.material, d.mesh));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, CameraDefaults};
    use glam::Vec3;
    use vista_bounds::AabbData;
    use vista_common::{Renderable, Transform};
    use vista_kernel::World;

    fn camera() -> Camera {
        let mut cam = Camera::new(&CameraDefaults {
            near: 1.0,
            far: 100.0,
            fov: 90.0,
            ratio: 1.0,
            ..CameraDefaults::default()
        });
        cam.update();
        cam
    }

    fn unit() -> AabbData {
        AabbData::new(Vec3::splat(-0.5), Vec3::splat(0.5))
    }

    #[test]
    fn culls_entities_outside_view() {
        let mut world = World::new();
        let front = world.spawn(&Transform::from_position(Vec3::new(0.0, 0.0, -10.0)), unit());
        world.spawn(&Transform::from_position(Vec3::new(0.0, 0.0, 10.0)), unit());
        world.spawn(&Transform::from_position(Vec3::new(0.0, 0.0, -500.0)), unit());
        world.step();

        let snap = FrameSnapshot::capture(&world, &camera());
        let vis = cull(&snap);
        let ids: Vec<EntityId> = vis.visible_ids(&snap).collect();
        assert_eq!(ids, vec![front]);
        assert_eq!(vis.stats.tested, 3);
        assert_eq!(vis.stats.visible, 1);
        assert_eq!(vis.stats.rejected_by_sphere + vis.stats.rejected_by_box, 2);
    }

    #[test]
    fn box_stage_rejects_what_the_sphere_lets_through() {
        // A flat slab whose sphere pokes into the frustum past the left edge
        // but whose box stays outside.
        let mut world = World::new();
        world.spawn(
            &Transform::from_position(Vec3::new(-12.5, 0.0, -10.0)),
            AabbData::new(Vec3::new(-2.0, -0.1, -0.1), Vec3::new(2.0, 0.1, 0.1)),
        );
        world.step();
        let vis = cull(&FrameSnapshot::capture(&world, &camera()));
        assert_eq!(vis.stats.rejected_by_box, 1);
        assert!(vis.visible.is_empty());
    }

    #[test]
    fn empty_bounds_are_never_visible() {
        let mut world = World::new();
        world.spawn(&Transform::from_position(Vec3::new(0.0, 0.0, -10.0)), AabbData::empty());
        world.step();
        let vis = cull(&FrameSnapshot::capture(&world, &camera()));
        assert!(vis.visible.is_empty());
    }

    #[test]
    fn draw_list_groups_by_material() {
        let mut world = World::new();
        for (i, material) in [2u64, 1, 2, 1].into_iter().enumerate() {
            let id = world.spawn(
                &Transform::from_position(Vec3::new(i as f32 - 1.5, 0.0, -10.0)),
                unit(),
            );
            world
                .set_renderable(
                    id,
                    Some(Renderable {
                        mesh: MeshHandle(i as u64),
                        material: MaterialHandle(material),
                    }),
                )
                .unwrap();
        }
        // Visible but not renderable.
        world.spawn(&Transform::from_position(Vec3::new(0.0, 2.0, -10.0)), unit());
        world.step();

        let snap = FrameSnapshot::capture(&world, &camera());
        let vis = cull(&snap);
        assert_eq!(vis.visible.len(), 5);
        let draws = draw_list(&snap, &vis);
        assert_eq!(draws.len(), 4);
        let materials: Vec<u64> = draws.iter().map(|d| d.material.0).collect();
        assert_eq!(materials, vec![1, 1, 2, 2]);
    }

    #[test]
    fn cull_into_reuses_buffer() {
        let mut world = World::new();
        world.spawn(&Transform::from_position(Vec3::new(0.0, 0.0, -10.0)), unit());
        world.step();
        let snap = FrameSnapshot::capture(&world, &camera());
        let mut vis = Visibility::default();
        cull_into(&snap, &mut vis);
        cull_into(&snap, &mut vis);
        assert_eq!(vis.visible, vec![0]);
        assert_eq!(vis.stats.tested, 1);
    }
}
