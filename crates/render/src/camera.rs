use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use vista_kernel::{HierarchyError, NodeId, TransformTree};

use crate::frustum::Frustum;

/// Construction-time camera parameters.
///
/// Passed by value to [`Camera::new`]; there is no global default camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDefaults {
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Width over height.
    pub ratio: f32,
    /// Orthographic view width in world units.
    pub width: f32,
    /// Orthographic view height in world units.
    pub height: f32,
    pub perspective: bool,
}

impl Default for CameraDefaults {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 1000.0,
            fov: 60.0,
            ratio: 16.0 / 9.0,
            width: 20.0,
            height: 20.0,
            perspective: true,
        }
    }
}

/// Everything the render context needs from a camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub position: Vec3,
    pub view: Mat4,
    pub previous_view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub frustum: Frustum,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSnapshot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            view: Mat4::IDENTITY,
            previous_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
            near: 0.0,
            far: 0.0,
        }
    }
}

/// Perspective or orthographic camera with derived matrices and frustum.
///
/// Every parameter setter recomputes the projection, the view-projection and
/// the frustum before returning. The view matrix follows the world transform
/// only on [`Camera::update`].
#[derive(Debug, Clone)]
pub struct Camera {
    transform: Mat4,
    near: f32,
    far: f32,
    fov: f32,
    ratio: f32,
    width: f32,
    height: f32,
    perspective: bool,
    view: Mat4,
    previous_view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Camera at the origin looking down -z.
    pub fn new(defaults: &CameraDefaults) -> Self {
        let mut camera = Self {
            transform: Mat4::IDENTITY,
            near: defaults.near,
            far: defaults.far,
            fov: defaults.fov,
            ratio: defaults.ratio,
            width: defaults.width,
            height: defaults.height,
            perspective: defaults.perspective,
            view: Mat4::IDENTITY,
            previous_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        camera.recompute_projection();
        camera
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn is_perspective(&self) -> bool {
        self.perspective
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// View matrix from before the last [`Camera::update`].
    pub fn previous_view_matrix(&self) -> &Mat4 {
        &self.previous_view
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn set_near(&mut self, near: f32) {
        self.near = near;
        self.recompute_projection();
    }

    pub fn set_far(&mut self, far: f32) {
        self.far = far;
        self.recompute_projection();
    }

    /// Vertical field of view in degrees.
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.recompute_projection();
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio;
        self.recompute_projection();
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
        self.recompute_projection();
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height;
        self.recompute_projection();
    }

    pub fn set_perspective(&mut self, perspective: bool) {
        self.perspective = perspective;
        self.recompute_projection();
    }

    /// Replace the camera's world transform. Takes effect on the next [`Camera::update`].
    pub fn set_transform(&mut self, world: Mat4) {
        self.transform = world;
    }

    /// Place the camera at `eye` looking at `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.transform = Mat4::look_at_rh(eye, target, up).inverse();
    }

    /// Follow a node of the transform hierarchy: take its world matrix as the
    /// camera transform, then [`Camera::update`].
    pub fn update_from(&mut self, tree: &TransformTree, node: NodeId) -> Result<(), HierarchyError> {
        self.transform = tree.world_matrix(node)?;
        self.update();
        Ok(())
    }

    /// Per-tick refresh: keep the old view for temporal consumers, derive
    /// the new one from the world transform, then the view-projection and
    /// frustum.
    pub fn update(&mut self) {
        self.previous_view = self.view;
        self.view = self.transform.inverse();
        self.view_projection = self.projection * self.view;
        self.frustum.calculate(&self.projection, &self.view);
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            position: self.position(),
            view: self.view,
            previous_view: self.previous_view,
            projection: self.projection,
            view_projection: self.view_projection,
            frustum: self.frustum,
            near: self.near,
            far: self.far,
        }
    }

    fn recompute_projection(&mut self) {
        self.projection = if self.perspective {
            Mat4::perspective_rh_gl(self.fov.to_radians(), self.ratio, self.near, self.far)
        } else {
            let (hw, hh) = (self.width * 0.5, self.height * 0.5);
            Mat4::orthographic_rh_gl(-hw, hw, -hh, hh, -self.far, self.far)
        };
        self.view_projection = self.projection * self.view;
        self.frustum.calculate(&self.projection, &self.view);
        tracing::debug!(
            perspective = self.perspective,
            fov = self.fov,
            near = self.near,
            far = self.far,
            "camera projection recomputed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_defaults() -> CameraDefaults {
        CameraDefaults {
            near: 1.0,
            far: 100.0,
            fov: 90.0,
            ratio: 1.0,
            ..CameraDefaults::default()
        }
    }

    fn assert_consistent(cam: &Camera) {
        let vp = *cam.projection_matrix() * *cam.view_matrix();
        assert!(cam.view_projection_matrix().abs_diff_eq(vp, 1e-5));
        let expected = Frustum::from_matrices(cam.projection_matrix(), cam.view_matrix());
        for (a, b) in cam.frustum().planes().iter().zip(expected.planes()) {
            assert!(a.abs_diff_eq(*b, 1e-5));
        }
    }

    #[test]
    fn default_camera() {
        let cam = Camera::new(&CameraDefaults::default());
        assert!(cam.is_perspective());
        assert!(!cam.view_projection_matrix().col(0).x.is_nan());
        assert_consistent(&cam);
    }

    #[test]
    fn reference_camera_culls_points() {
        let mut cam = Camera::new(&reference_defaults());
        cam.update();
        assert!(cam.frustum().point_in_frustum(Vec3::new(0.0, 0.0, -50.0)));
        assert!(!cam.frustum().point_in_frustum(Vec3::new(0.0, 0.0, 50.0)));
        assert!(!cam.frustum().point_in_frustum(Vec3::new(0.0, 0.0, -0.5)));
    }

    #[test]
    fn every_setter_leaves_state_consistent() {
        let mut cam = Camera::new(&reference_defaults());
        cam.look_at(Vec3::new(5.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        cam.update();

        cam.set_near(0.5);
        assert_consistent(&cam);
        cam.set_far(250.0);
        assert_consistent(&cam);
        cam.set_fov(45.0);
        assert_consistent(&cam);
        cam.set_ratio(2.0);
        assert_consistent(&cam);
        cam.set_perspective(false);
        assert_consistent(&cam);
        cam.set_width(40.0);
        assert_consistent(&cam);
        cam.set_height(10.0);
        assert_consistent(&cam);
    }

    #[test]
    fn narrowing_fov_takes_effect_immediately() {
        let mut cam = Camera::new(&reference_defaults());
        cam.update();
        let p = Vec3::new(30.0, 0.0, -50.0);
        assert!(cam.frustum().point_in_frustum(p));
        cam.set_fov(30.0);
        assert!(!cam.frustum().point_in_frustum(p));
    }

    #[test]
    fn far_setter_moves_far_plane() {
        let mut cam = Camera::new(&reference_defaults());
        cam.update();
        let p = Vec3::new(0.0, 0.0, -150.0);
        assert!(!cam.frustum().point_in_frustum(p));
        cam.set_far(200.0);
        assert!(cam.frustum().point_in_frustum(p));
    }

    #[test]
    fn orthographic_box_is_symmetric() {
        let mut cam = Camera::new(&CameraDefaults {
            perspective: false,
            width: 10.0,
            height: 6.0,
            far: 50.0,
            ..CameraDefaults::default()
        });
        cam.update();
        let f = cam.frustum();
        assert!(f.point_in_frustum(Vec3::new(4.9, 2.9, -40.0)));
        assert!(f.point_in_frustum(Vec3::new(-4.9, -2.9, 40.0)));
        assert!(!f.point_in_frustum(Vec3::new(5.1, 0.0, -10.0)));
        assert!(!f.point_in_frustum(Vec3::new(0.0, 3.1, -10.0)));
        assert!(!f.point_in_frustum(Vec3::new(0.0, 0.0, -51.0)));
    }

    #[test]
    fn update_follows_transform_and_keeps_previous_view() {
        let mut cam = Camera::new(&reference_defaults());
        cam.update();
        let first = *cam.view_matrix();

        cam.set_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)));
        // Not applied until update.
        assert_eq!(*cam.view_matrix(), first);
        cam.update();
        assert_eq!(*cam.previous_view_matrix(), first);
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 10.0));
        // The origin is now 10 units in front of the camera.
        assert!(cam.frustum().point_in_frustum(Vec3::ZERO));
        assert!(!cam.frustum().point_in_frustum(Vec3::new(0.0, 0.0, 9.5)));
        assert_consistent(&cam);
    }

    #[test]
    fn update_from_follows_parented_node() {
        let mut tree = TransformTree::new();
        let rig = tree.insert(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        let mount = tree.insert(Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)));
        tree.set_parent(mount, Some(rig)).unwrap();

        let mut cam = Camera::new(&reference_defaults());
        cam.update_from(&tree, mount).unwrap();
        assert!(cam.position().abs_diff_eq(Vec3::new(5.0, 0.0, 10.0), 1e-5));
        assert!(cam.frustum().point_in_frustum(Vec3::new(5.0, 0.0, 0.0)));
        assert_consistent(&cam);

        // Moving the parent moves the camera on the next update.
        let first = *cam.view_matrix();
        tree.set_local(rig, Mat4::from_translation(Vec3::new(-5.0, 0.0, 0.0))).unwrap();
        cam.update_from(&tree, mount).unwrap();
        assert_eq!(*cam.previous_view_matrix(), first);
        assert!(cam.position().abs_diff_eq(Vec3::new(-5.0, 0.0, 10.0), 1e-5));

        tree.remove(mount).unwrap();
        assert!(matches!(cam.update_from(&tree, mount), Err(HierarchyError::UnknownNode(_))));
    }

    #[test]
    fn look_at_faces_target() {
        let mut cam = Camera::new(&reference_defaults());
        cam.look_at(Vec3::new(0.0, 0.0, 20.0), Vec3::ZERO, Vec3::Y);
        cam.update();
        let eye_space = cam.view_matrix().transform_point3(Vec3::ZERO);
        assert!(eye_space.abs_diff_eq(Vec3::new(0.0, 0.0, -20.0), 1e-4));
    }

    #[test]
    fn snapshot_copies_matrices() {
        let mut cam = Camera::new(&reference_defaults());
        cam.look_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
        cam.update();
        let snap = cam.snapshot();
        assert_eq!(snap.view, *cam.view_matrix());
        assert_eq!(snap.view_projection, *cam.view_projection_matrix());
        assert_eq!(snap.frustum, *cam.frustum());
        assert!(snap.position.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn defaults_deserialize_with_missing_fields() {
        let d: CameraDefaults = serde_json::from_str(r#"{"fov": 75.0}"#).unwrap();
        assert_eq!(d.fov, 75.0);
        assert_eq!(d.near, CameraDefaults::default().near);
    }
}
