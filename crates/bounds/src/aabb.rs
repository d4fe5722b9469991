use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::BoundsError;
use crate::handle::MatrixHandle;

/// Immutable axis-aligned box with its derived measurements.
///
/// The derived attributes are computed once when the value is built. The
/// empty box (`min = +f32::MAX`, `max = -f32::MAX`) is the identity for
/// [`AabbData::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "AabbRepr", try_from = "AabbRepr")]
pub struct AabbData {
    min: Vec3,
    max: Vec3,
    extents: Vec3,
    half_extents: Vec3,
    center: Vec3,
    bounding_sphere_radius: f32,
}

#[derive(Serialize, Deserialize)]
struct AabbRepr {
    min: [f32; 3],
    max: [f32; 3],
}

impl From<AabbData> for AabbRepr {
    fn from(b: AabbData) -> Self {
        Self {
            min: b.min.to_array(),
            max: b.max.to_array(),
        }
    }
}

impl TryFrom<AabbRepr> for AabbData {
    type Error = BoundsError;

    fn try_from(r: AabbRepr) -> Result<Self, BoundsError> {
        let (min, max) = (Vec3::from_array(r.min), Vec3::from_array(r.max));
        if min == Vec3::splat(f32::MAX) && max == Vec3::splat(-f32::MAX) {
            return Ok(Self::empty());
        }
        Self::try_new(min, max)
    }
}

impl AabbData {
    /// Build a box from its corners.
    ///
    /// # Panics
    /// If `min > max` on any axis or any component is not finite. Inverted
    /// bounds are a caller bug and must not reach the renderer.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        match Self::try_new(min, max) {
            Ok(b) => b,
            Err(e) => panic!("invalid AABB: {e}"),
        }
    }

    /// Checked constructor for bounds that come from outside the engine.
    pub fn try_new(min: Vec3, max: Vec3) -> Result<Self, BoundsError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(BoundsError::NonFinite);
        }
        for (axis, lo, hi) in [('x', min.x, max.x), ('y', min.y, max.y), ('z', min.z, max.z)] {
            if lo > hi {
                return Err(BoundsError::Inverted {
                    axis,
                    min: lo,
                    max: hi,
                });
            }
        }
        Ok(Self::derive(min, max))
    }

    /// Box centred on `center` reaching `half_extents` along each axis.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// The empty box. Merging it with any box returns that box.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
        extents: Vec3::ZERO,
        half_extents: Vec3::ZERO,
        center: Vec3::ZERO,
        bounding_sphere_radius: 0.0,
    };

    pub fn empty() -> Self {
        Self::EMPTY
    }

    fn derive(min: Vec3, max: Vec3) -> Self {
        if min.cmpgt(max).any() {
            return Self::empty();
        }
        let extents = max - min;
        let half_extents = extents * 0.5;
        Self {
            min,
            max,
            extents,
            half_extents,
            center: min + half_extents,
            bounding_sphere_radius: half_extents.max_element(),
        }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn extents(&self) -> Vec3 {
        self.extents
    }

    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Largest half extent. Used as the half size of the enclosing cube in
    /// frustum tests, not as a true circumscribed radius.
    pub fn bounding_sphere_radius(&self) -> f32 {
        self.bounding_sphere_radius
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Component-wise union.
    pub fn merge(&self, other: &AabbData) -> AabbData {
        Self::derive(self.min.min(other.min), self.max.max(other.max))
    }

    /// Grow the box to include `point`.
    pub fn include_point(&self, point: Vec3) -> AabbData {
        Self::derive(self.min.min(point), self.max.max(point))
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &AabbData) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// The eight corners, bit `i` of the index selecting max on axis `i`.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            )
        })
    }

    /// Transform all eight corners and fold them into a new box.
    pub fn transformed(&self, matrix: &Mat4) -> AabbData {
        if self.is_empty() {
            return *self;
        }
        let (min, max) = self.corners().iter().map(|c| matrix.transform_point3(*c)).fold(
            (Vec3::splat(f32::MAX), Vec3::splat(-f32::MAX)),
            |(lo, hi), p| (lo.min(p), hi.max(p)),
        );
        Self::derive(min, max)
    }
}

impl Default for AabbData {
    fn default() -> Self {
        Self::empty()
    }
}

/// Object-space box plus its memoized world-space counterpart.
#[derive(Debug, Clone)]
pub struct Aabb {
    local: AabbData,
    world: AabbData,
    cached: Option<MatrixHandle>,
    recomputes: u64,
}

impl Aabb {
    /// The world box starts equal to the local box until the first recalculation.
    pub fn new(local: AabbData) -> Self {
        Self {
            local,
            world: local,
            cached: None,
            recomputes: 0,
        }
    }

    /// Bounds of a vertex cloud. No points gives the empty box.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let local = points
            .into_iter()
            .fold(AabbData::empty(), |acc, p| acc.include_point(p));
        Self::new(local)
    }

    pub fn local(&self) -> &AabbData {
        &self.local
    }

    pub fn world(&self) -> &AabbData {
        &self.world
    }

    /// Replace the object-space box after a geometry change. The next
    /// recalculation always does the work.
    pub fn set_local(&mut self, local: AabbData) {
        self.local = local;
        self.world = local;
        self.cached = None;
    }

    /// Recompute the world box against `transform`.
    ///
    /// Returns `false` without touching anything when `transform` is the same
    /// handle object used last time.
    pub fn recalculate(&mut self, transform: &MatrixHandle) -> bool {
        if self
            .cached
            .as_ref()
            .is_some_and(|cached| cached.same_as(transform))
        {
            return false;
        }
        self.world = self.local.transformed(transform.matrix());
        self.cached = Some(transform.clone());
        self.recomputes += 1;
        tracing::trace!(recomputes = self.recomputes, "aabb recalculated");
        true
    }

    /// How many times the corner transform has actually run.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}
