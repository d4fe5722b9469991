use glam::Mat4;
use std::ops::Deref;
use std::sync::Arc;

/// A shared, immutable world matrix with object identity.
///
/// Bounding volumes remember the handle they were last recomputed from and
/// skip work when handed the same object again. Two handles built from equal
/// matrices are still different objects; identity is what counts, never value.
#[derive(Debug, Clone)]
pub struct MatrixHandle(Arc<Mat4>);

impl MatrixHandle {
    pub fn new(matrix: Mat4) -> Self {
        Self(Arc::new(matrix))
    }

    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY)
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.0
    }

    /// True if both handles point at the same matrix object.
    pub fn same_as(&self, other: &MatrixHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for MatrixHandle {
    type Target = Mat4;

    fn deref(&self) -> &Mat4 {
        &self.0
    }
}

impl From<Mat4> for MatrixHandle {
    fn from(matrix: Mat4) -> Self {
        Self::new(matrix)
    }
}
