use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::BoundsError;
use crate::aabb::AabbData;
use crate::handle::MatrixHandle;

/// Center and radius of a sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereData {
    pub center: Vec3,
    pub radius: f32,
}

impl SphereData {
    pub fn try_new(center: Vec3, radius: f32) -> Result<Self, BoundsError> {
        if !center.is_finite() || !radius.is_finite() {
            return Err(BoundsError::NonFinite);
        }
        if radius < 0.0 {
            return Err(BoundsError::NegativeRadius(radius));
        }
        Ok(Self { center, radius })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }
}

/// Largest scale factor among the three basis axes of `m`.
///
/// Stands in for the scale of the whole transform when scaling a radius.
/// Over-estimates bounds under strongly non-uniform scale.
pub fn max_axis_scale(m: &Mat4) -> f32 {
    m.x_axis
        .truncate()
        .length()
        .max(m.y_axis.truncate().length())
        .max(m.z_axis.truncate().length())
}

/// Object-space sphere plus its memoized world-space counterpart.
#[derive(Debug, Clone)]
pub struct BoundingSphere {
    local: SphereData,
    world: SphereData,
    cached: Option<MatrixHandle>,
    recomputes: u64,
}

impl BoundingSphere {
    /// # Panics
    /// On a negative or non-finite radius.
    pub fn new(center: Vec3, radius: f32) -> Self {
        let local = match SphereData::try_new(center, radius) {
            Ok(s) => s,
            Err(e) => panic!("invalid bounding sphere: {e}"),
        };
        Self {
            local,
            world: local,
            cached: None,
            recomputes: 0,
        }
    }

    /// Sphere circumscribing a box. The empty box gives a zero sphere at the origin.
    pub fn from_aabb(aabb: &AabbData) -> Self {
        if aabb.is_empty() {
            return Self::new(Vec3::ZERO, 0.0);
        }
        Self::new(aabb.center(), aabb.half_extents().length())
    }

    pub fn local(&self) -> &SphereData {
        &self.local
    }

    pub fn world(&self) -> &SphereData {
        &self.world
    }

    /// Recompute the world sphere against `transform`. Skipped, returning
    /// `false`, when `transform` is the handle used last time.
    pub fn recalculate(&mut self, transform: &MatrixHandle) -> bool {
        if self
            .cached
            .as_ref()
            .is_some_and(|cached| cached.same_as(transform))
        {
            return false;
        }
        let m = transform.matrix();
        self.world = SphereData {
            center: m.transform_point3(self.local.center),
            radius: self.local.radius * max_axis_scale(m),
        };
        self.cached = Some(transform.clone());
        self.recomputes += 1;
        true
    }

    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn translation_moves_center_only() {
        let mut s = BoundingSphere::new(Vec3::ZERO, 2.0);
        s.recalculate(&MatrixHandle::new(Mat4::from_translation(Vec3::new(
            3.0, 0.0, -1.0,
        ))));
        assert!(s.world().center.abs_diff_eq(Vec3::new(3.0, 0.0, -1.0), 1e-6));
        assert!((s.world().radius - 2.0).abs() < 1e-6);
    }

    #[test]
    fn non_uniform_scale_uses_largest_axis() {
        let mut s = BoundingSphere::new(Vec3::ZERO, 1.0);
        s.recalculate(&MatrixHandle::new(Mat4::from_scale(Vec3::new(
            1.0, 4.0, 2.0,
        ))));
        assert!((s.world().radius - 4.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_does_not_change_radius() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::from_rotation_z(1.2),
            Vec3::ZERO,
        );
        assert!((max_axis_scale(&m) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn offset_center_follows_rotation() {
        let mut s = BoundingSphere::new(Vec3::X, 0.5);
        let rot = Mat4::from_quat(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        s.recalculate(&MatrixHandle::new(rot));
        assert!(s.world().center.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn memoized_by_identity() {
        let mut s = BoundingSphere::new(Vec3::ZERO, 1.0);
        let t = MatrixHandle::identity();
        assert!(s.recalculate(&t));
        assert!(!s.recalculate(&t));
        assert!(s.recalculate(&MatrixHandle::identity()));
        assert_eq!(s.recompute_count(), 2);
    }

    #[test]
    fn from_aabb_circumscribes() {
        let b = AabbData::new(Vec3::ZERO, Vec3::splat(2.0));
        let s = BoundingSphere::from_aabb(&b);
        assert_eq!(s.local().center, Vec3::ONE);
        assert!((s.local().radius - 3.0_f32.sqrt()).abs() < 1e-6);
        for corner in b.corners() {
            assert!(s.local().radius + 1e-5 >= s.local().center.distance(corner));
        }
    }

    #[test]
    fn invalid_radius_rejected() {
        assert_eq!(
            SphereData::try_new(Vec3::ZERO, -1.0),
            Err(BoundsError::NegativeRadius(-1.0))
        );
    }

    #[test]
    #[should_panic(expected = "invalid bounding sphere")]
    fn negative_radius_panics() {
        BoundingSphere::new(Vec3::ZERO, -0.1);
    }
}
