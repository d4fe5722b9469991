use std::collections::BTreeMap;

use glam::Mat4;
use vista_bounds::{Aabb, AabbData, BoundingSphere, MatrixHandle};
use vista_common::{EntityId, Renderable, Transform};

use crate::hierarchy::{HierarchyError, NodeId, TransformTree};

/// Errors from world operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

/// A spatial entity: a transform node plus its bounding volumes.
#[derive(Debug, Clone)]
pub struct SpatialEntity {
    node: NodeId,
    aabb: Aabb,
    sphere: BoundingSphere,
    world: MatrixHandle,
    stamp: Option<u64>,
    renderable: Option<Renderable>,
}

impl SpatialEntity {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    pub fn sphere(&self) -> &BoundingSphere {
        &self.sphere
    }

    /// World matrix as of the last refresh.
    pub fn world_matrix(&self) -> &MatrixHandle {
        &self.world
    }

    pub fn renderable(&self) -> Option<&Renderable> {
        self.renderable.as_ref()
    }
}

/// Work done by one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Entities whose chain changed and got a new world matrix.
    pub matrices_rebuilt: usize,
    /// Bounding volumes that actually ran their recomputation.
    pub bounds_recomputed: usize,
}

/// The simulation-side spatial state.
///
/// Owned by the simulation context. Uses BTreeMap so snapshot order is the
/// same on every run.
#[derive(Debug, Clone, Default)]
pub struct World {
    tree: TransformTree,
    entities: BTreeMap<EntityId, SpatialEntity>,
    tick: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of entities in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Read-only access to all entities (BTreeMap for deterministic iteration).
    pub fn entities(&self) -> &BTreeMap<EntityId, SpatialEntity> {
        &self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&SpatialEntity> {
        self.entities.get(&id)
    }

    /// The transform hierarchy, for nodes that carry no bounds (cameras, pivots).
    pub fn tree(&self) -> &TransformTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TransformTree {
        &mut self.tree
    }

    /// Spawn an entity with the given local transform and object-space bounds.
    pub fn spawn(&mut self, transform: &Transform, bounds: AabbData) -> EntityId {
        let id = EntityId::new();
        self.spawn_with_id(id, transform, bounds);
        id
    }

    /// Spawn with a caller-chosen id. An existing entity with that id is replaced.
    pub fn spawn_with_id(&mut self, id: EntityId, transform: &Transform, bounds: AabbData) {
        if self.entities.contains_key(&id) {
            self.despawn(id);
        }
        let node = self.tree.insert_trs(transform);
        let entity = SpatialEntity {
            node,
            aabb: Aabb::new(bounds),
            sphere: BoundingSphere::from_aabb(&bounds),
            world: MatrixHandle::identity(),
            stamp: None,
            renderable: None,
        };
        self.entities.insert(id, entity);
        tracing::debug!(entity = %id.short(), "spawned");
    }

    /// Remove an entity. Children of its node become roots.
    pub fn despawn(&mut self, id: EntityId) -> Option<SpatialEntity> {
        let entity = self.entities.remove(&id)?;
        if let Err(e) = self.tree.remove(entity.node) {
            tracing::warn!(entity = %id.short(), error = %e, "despawned entity had no transform node");
        }
        tracing::debug!(entity = %id.short(), "despawned");
        Some(entity)
    }

    pub fn set_transform(&mut self, id: EntityId, transform: &Transform) -> Result<(), WorldError> {
        self.set_local_matrix(id, transform.to_matrix())
    }

    pub fn set_local_matrix(&mut self, id: EntityId, local: Mat4) -> Result<(), WorldError> {
        let node = self.node_of(id)?;
        self.tree.set_local(node, local)?;
        Ok(())
    }

    /// Parent `child` under `parent`'s node, or detach with `None`.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), WorldError> {
        let node = self.node_of(child)?;
        let parent_node = parent.map(|p| self.node_of(p)).transpose()?;
        self.tree.set_parent(node, parent_node)?;
        Ok(())
    }

    /// Parent an entity under a bare hierarchy node.
    pub fn attach_to_node(&mut self, child: EntityId, parent: NodeId) -> Result<(), WorldError> {
        let node = self.node_of(child)?;
        self.tree.set_parent(node, Some(parent))?;
        Ok(())
    }

    /// Replace an entity's object-space bounds after a geometry change.
    pub fn set_local_bounds(&mut self, id: EntityId, bounds: AabbData) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::UnknownEntity(id))?;
        entity.aabb.set_local(bounds);
        entity.sphere = BoundingSphere::from_aabb(&bounds);
        Ok(())
    }

    pub fn set_renderable(&mut self, id: EntityId, renderable: Option<Renderable>) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::UnknownEntity(id))?;
        entity.renderable = renderable;
        Ok(())
    }

    /// Freshly composed world matrix of an entity.
    pub fn world_matrix(&self, id: EntityId) -> Result<Mat4, WorldError> {
        Ok(self.tree.world_matrix(self.node_of(id)?)?)
    }

    /// Advance one tick and bring every entity's world bounds up to date.
    pub fn step(&mut self) -> StepStats {
        self.tick += 1;
        let _span = tracing::info_span!("world_step", tick = self.tick).entered();
        let stats = self.refresh();
        tracing::trace!(
            rebuilt = stats.matrices_rebuilt,
            recomputed = stats.bounds_recomputed,
            "world step complete"
        );
        stats
    }

    /// Bring world bounds up to date without advancing the tick.
    ///
    /// Entities whose chain stamp is unchanged keep their matrix handle, so
    /// their bounds recalculation is a no-op.
    pub fn refresh(&mut self) -> StepStats {
        let mut stats = StepStats::default();
        for (id, entity) in &mut self.entities {
            let stamp = match self.tree.world_stamp(entity.node) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(entity = %id.short(), error = %e, "entity lost its transform node");
                    continue;
                }
            };
            if entity.stamp != Some(stamp) {
                match self.tree.world_matrix(entity.node) {
                    Ok(m) => {
                        entity.world = MatrixHandle::new(m);
                        entity.stamp = Some(stamp);
                        stats.matrices_rebuilt += 1;
                    }
                    Err(e) => {
                        tracing::warn!(entity = %id.short(), error = %e, "entity lost its transform node");
                        continue;
                    }
                }
            }
            if entity.aabb.recalculate(&entity.world) {
                stats.bounds_recomputed += 1;
            }
            if entity.sphere.recalculate(&entity.world) {
                stats.bounds_recomputed += 1;
            }
        }
        stats
    }

    fn node_of(&self, id: EntityId) -> Result<NodeId, WorldError> {
        self.entities
            .get(&id)
            .map(|e| e.node)
            .ok_or(WorldError::UnknownEntity(id))
    }
}
