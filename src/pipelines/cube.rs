use cgmath::Matrix4;

use crate::data_structures::{
    texture::Texture,
    vertex::{CubeVertex, Vertex},
};
use crate::pipelines::basic::{mk_render_pipeline, mk_uniform_layout, uniform_entry};

/// Model matrix of one cube, bound at group 1 binding 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
}

impl From<Matrix4<f32>> for TransformUniform {
    fn from(matrix: Matrix4<f32>) -> Self {
        Self {
            model: matrix.into(),
        }
    }
}

pub fn mk_transform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    mk_uniform_layout(device, "Cube Transform Layout")
}

/// Transform at binding 0, triangle bitmap at binding 1.
pub fn mk_bitmap_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Cube Bitmap Layout"),
        entries: &[uniform_entry(0), uniform_entry(1)],
    })
}

fn pipeline_layout(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    cube_layout: &wgpu::BindGroupLayout,
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Cube Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, cube_layout],
        push_constant_ranges: &[],
    })
}

/// Pipeline for the basic and the indexed cube, both feed [`CubeVertex`]
/// positions.
pub fn mk_cube_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    transform_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = pipeline_layout(device, camera_bind_group_layout, transform_layout);
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Cube Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("cube.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        format,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        &[CubeVertex::desc()],
        shader,
        Some(wgpu::Face::Back),
    )
}

/// Pipeline for the cube that is generated from `vertex_index` and
/// `instance_index` alone.
pub fn mk_experimental_cube_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    bitmap_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = pipeline_layout(device, camera_bind_group_layout, bitmap_layout);
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Experimental Cube Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("experimental_cube.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        format,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        &[],
        shader,
        Some(wgpu::Face::Back),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_is_column_major() {
        let uniform = TransformUniform::from(Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(uniform.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(std::mem::size_of::<TransformUniform>(), 64);
    }
}
