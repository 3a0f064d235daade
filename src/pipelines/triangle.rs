use crate::data_structures::{
    texture::Texture,
    vertex::{ColorVertex, Vertex},
};
use crate::pipelines::basic::mk_render_pipeline;

/// Pipeline for flat, per-vertex coloured geometry given directly in clip
/// space. Nothing is bound.
pub fn mk_triangle_pipeline(device: &wgpu::Device, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Triangle Pipeline Layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Triangle Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("triangle.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        format,
        Some(wgpu::BlendState::REPLACE),
        Some(Texture::DEPTH_FORMAT),
        &[ColorVertex::desc()],
        shader,
        None,
    )
}
