//! Six-plane view volume.
//!
//! Planes are extracted from `clip = projection * view` with the
//! Gribb-Hartmann row combinations. glam multiplies column vectors, so the
//! combinations run over the rows of `clip`. Projections are built with the
//! GL depth range, which makes `row3 + row2` the near plane.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use vista_bounds::AabbData;

/// Which of the six planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrustumPlane {
    Right = 0,
    Left = 1,
    Bottom = 2,
    Top = 3,
    Far = 4,
    Near = 5,
}

impl FrustumPlane {
    pub const ALL: [FrustumPlane; 6] = [
        FrustumPlane::Right,
        FrustumPlane::Left,
        FrustumPlane::Bottom,
        FrustumPlane::Top,
        FrustumPlane::Far,
        FrustumPlane::Near,
    ];
}

/// Six normalized planes `Vec4(A, B, C, D)` for `Ax + By + Cz + D = 0`,
/// normals pointing into the volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Default for Frustum {
    /// The clip-space cube, i.e. the frustum of identity matrices.
    fn default() -> Self {
        Self::from_view_projection(&Mat4::IDENTITY)
    }
}

impl Frustum {
    pub fn from_matrices(projection: &Mat4, view: &Mat4) -> Self {
        Self::from_view_projection(&(*projection * *view))
    }

    pub fn from_view_projection(clip: &Mat4) -> Self {
        let mut frustum = Self {
            planes: [Vec4::ZERO; 6],
        };
        frustum.extract(clip);
        frustum
    }

    /// Re-derive all six planes. Called once per frame per camera.
    pub fn calculate(&mut self, projection: &Mat4, view: &Mat4) {
        self.extract(&(*projection * *view));
    }

    fn extract(&mut self, clip: &Mat4) {
        let (r0, r1, r2, r3) = (clip.row(0), clip.row(1), clip.row(2), clip.row(3));
        self.planes = [
            r3 - r0, // right
            r3 + r0, // left
            r3 + r1, // bottom
            r3 - r1, // top
            r3 - r2, // far
            r3 + r2, // near
        ];
        for plane in &mut self.planes {
            let len = plane.truncate().length();
            if len > f32::EPSILON {
                *plane /= len;
            }
        }
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    pub fn plane(&self, which: FrustumPlane) -> Vec4 {
        self.planes[which as usize]
    }

    /// Signed distance of `point` from one plane, positive inside.
    #[inline]
    pub fn distance(&self, which: FrustumPlane, point: Vec3) -> f32 {
        signed_distance(self.planes[which as usize], point)
    }

    /// Strictly inside all six planes.
    pub fn point_in_frustum(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| signed_distance(*p, point) > 0.0)
    }

    /// Inside or intersecting: no plane has the center more than `radius` behind it.
    pub fn sphere_in_frustum(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|p| signed_distance(*p, center) > -radius)
    }

    /// Conservative cube test.
    ///
    /// A plane rejects the cube only when none of its eight corners lies in
    /// front of it. Boxes outside the frustum near an edge or corner can
    /// still pass, since each plane is checked on its own. A NaN half size
    /// never passes; a negative one spans the same corners as its magnitude.
    pub fn cube_in_frustum(&self, center: Vec3, half_size: f32) -> bool {
        let h = half_size;
        let corners: [Vec3; 8] = std::array::from_fn(|i| {
            center
                + Vec3::new(
                    if i & 1 == 0 { -h } else { h },
                    if i & 2 == 0 { -h } else { h },
                    if i & 4 == 0 { -h } else { h },
                )
        });
        self.corners_pass(&corners)
    }

    /// Same per-plane corner rule as [`Frustum::cube_in_frustum`] for a
    /// box that is not a cube.
    pub fn aabb_in_frustum(&self, aabb: &AabbData) -> bool {
        if aabb.is_empty() {
            return false;
        }
        self.corners_pass(&aabb.corners())
    }

    fn corners_pass(&self, corners: &[Vec3; 8]) -> bool {
        self.planes
            .iter()
            .all(|p| corners.iter().any(|c| signed_distance(*p, *c) > 0.0))
    }
}

#[inline]
fn signed_distance(plane: Vec4, point: Vec3) -> f32 {
    plane.truncate().dot(point) + plane.w
}
