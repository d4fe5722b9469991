use glam::Mat4;
use vista_common::Transform;

/// Handle to a node in a [`TransformTree`].
///
/// Carries a generation so a handle to a removed node never aliases the node
/// that later reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Errors from transform hierarchy operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("unknown transform node {0:?}")]
    UnknownNode(NodeId),
    #[error("parenting {node:?} under {parent:?} would make the node its own ancestor")]
    Cycle { node: NodeId, parent: NodeId },
}

#[derive(Debug, Clone)]
struct Node {
    local: Mat4,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    revision: u64,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of affine transforms linked into a forest by parent handles.
///
/// Every mutation stamps the touched node with a fresh tree-wide revision.
/// The largest revision along a node's ancestor chain (its world stamp)
/// therefore changes exactly when something affecting its world matrix did.
#[derive(Debug, Clone, Default)]
pub struct TransformTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    revision: u64,
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Add a root node with the given local matrix.
    pub fn insert(&mut self, local: Mat4) -> NodeId {
        let revision = self.bump();
        let node = Node {
            local,
            parent: None,
            children: Vec::new(),
            revision,
        };
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    pub fn insert_trs(&mut self, transform: &Transform) -> NodeId {
        self.insert(transform.to_matrix())
    }

    /// Remove a node. Its children become roots and keep their local matrices.
    pub fn remove(&mut self, id: NodeId) -> Result<Mat4, HierarchyError> {
        let parent = self.node(id)?.parent;
        if let Some(p) = parent {
            self.node_mut(p)?.children.retain(|c| *c != id);
        }
        let slot = &mut self.slots[id.index as usize];
        let node = slot.node.take().ok_or(HierarchyError::UnknownNode(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;

        for child in node.children {
            let revision = self.bump();
            let c = self.node_mut(child)?;
            c.parent = None;
            c.revision = revision;
        }
        Ok(node.local)
    }

    pub fn local(&self, id: NodeId) -> Result<Mat4, HierarchyError> {
        Ok(self.node(id)?.local)
    }

    pub fn set_local(&mut self, id: NodeId, local: Mat4) -> Result<(), HierarchyError> {
        let revision = self.bump();
        let node = self.node_mut(id)?;
        node.local = local;
        node.revision = revision;
        Ok(())
    }

    pub fn set_trs(&mut self, id: NodeId, transform: &Transform) -> Result<(), HierarchyError> {
        self.set_local(id, transform.to_matrix())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, HierarchyError> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], HierarchyError> {
        Ok(&self.node(id)?.children)
    }

    /// Attach `id` under `parent`, or detach it with `None`.
    ///
    /// Rejected with [`HierarchyError::Cycle`] when `parent` is `id` itself or
    /// already one of its descendants. The check walks up from `parent` and
    /// is bounded by the node count.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), HierarchyError> {
        let old = self.node(id)?.parent;
        if let Some(p) = parent {
            self.node(p)?;
            if self.is_ancestor_or_self(id, p)? {
                return Err(HierarchyError::Cycle { node: id, parent: p });
            }
        }
        if old == parent {
            return Ok(());
        }
        if let Some(o) = old {
            self.node_mut(o)?.children.retain(|c| *c != id);
        }
        if let Some(p) = parent {
            self.node_mut(p)?.children.push(id);
        }
        let revision = self.bump();
        let node = self.node_mut(id)?;
        node.parent = parent;
        node.revision = revision;
        tracing::debug!(?id, ?parent, "reparented transform node");
        Ok(())
    }

    /// True if `ancestor` is `id` or appears on `id`'s parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> Result<bool, HierarchyError> {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(n) = current {
            if n == ancestor {
                return Ok(true);
            }
            if steps > self.len {
                // A longer walk than there are nodes means the chain already loops.
                return Err(HierarchyError::Cycle {
                    node: ancestor,
                    parent: id,
                });
            }
            current = self.node(n)?.parent;
            steps += 1;
        }
        Ok(false)
    }

    /// Parent chain from the direct parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<NodeId>, HierarchyError> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?.parent;
        while let Some(n) = current {
            chain.push(n);
            current = self.node(n)?.parent;
        }
        Ok(chain)
    }

    /// Number of ancestors. Roots have depth 0.
    pub fn depth(&self, id: NodeId) -> Result<usize, HierarchyError> {
        Ok(self.ancestors(id)?.len())
    }

    /// World matrix composed fresh through the parent chain: `parent.world * local`.
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, HierarchyError> {
        let node = self.node(id)?;
        let mut world = node.local;
        let mut current = node.parent;
        while let Some(p) = current {
            let parent = self.node(p)?;
            world = parent.local * world;
            current = parent.parent;
        }
        Ok(world)
    }

    /// Largest revision on the chain from `id` to its root.
    pub fn world_stamp(&self, id: NodeId) -> Result<u64, HierarchyError> {
        let node = self.node(id)?;
        let mut stamp = node.revision;
        let mut current = node.parent;
        while let Some(p) = current {
            let parent = self.node(p)?;
            stamp = stamp.max(parent.revision);
            current = parent.parent;
        }
        Ok(stamp)
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn node(&self, id: NodeId) -> Result<&Node, HierarchyError> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
            .ok_or(HierarchyError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, HierarchyError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or(HierarchyError::UnknownNode(id))
    }
}
