use bytemuck::{Pod, Zeroable};

use crate::camera::CameraSnapshot;
use crate::cull::DrawItem;

/// Camera block as laid out for a uniform buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub previous_view: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn from_snapshot(camera: &CameraSnapshot) -> Self {
        Self {
            view_proj: camera.view_projection.to_cols_array_2d(),
            view: camera.view.to_cols_array_2d(),
            previous_view: camera.previous_view.to_cols_array_2d(),
            position: camera.position.extend(1.0).to_array(),
        }
    }
}

/// Per-instance model matrix for instanced draws.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct InstanceData {
    pub model_0: [f32; 4],
    pub model_1: [f32; 4],
    pub model_2: [f32; 4],
    pub model_3: [f32; 4],
}

/// Instance data for a draw list, in draw order.
pub fn instance_data(draws: &[DrawItem]) -> Vec<InstanceData> {
    draws
        .iter()
        .map(|d| InstanceData {
            model_0: d.model.x_axis.to_array(),
            model_1: d.model.y_axis.to_array(),
            model_2: d.model.z_axis.to_array(),
            model_3: d.model.w_axis.to_array(),
        })
        .collect()
}
