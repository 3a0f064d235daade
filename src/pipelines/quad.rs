//! A full-screen quad that shows a texture, used to put the ray tracer's output
//! on screen.

use wgpu::util::DeviceExt;

use crate::data_structures::{
    texture::{Texture, create_default_sampler},
    vertex::{QuadVertex, Vertex},
};
use crate::pipelines::basic::mk_render_pipeline;
use crate::render::{Flat, Render};

#[rustfmt::skip]
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0,  1.0], tex_coords: [0.0, 0.0] },
    QuadVertex { position: [ 1.0,  1.0], tex_coords: [1.0, 0.0] },
    QuadVertex { position: [ 1.0, -1.0], tex_coords: [1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] },
];

pub const QUAD_INDICES: [u16; 6] = [0, 2, 1, 0, 3, 2];

pub struct ScreenQuad {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

impl ScreenQuad {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, texture: &Texture) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Screen Quad Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Screen Quad Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Screen Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("quad.wgsl").into()),
        };
        let pipeline = mk_render_pipeline(
            device,
            &pipeline_layout,
            format,
            Some(wgpu::BlendState::REPLACE),
            Some(Texture::DEPTH_FORMAT),
            &[QuadVertex::desc()],
            shader,
            None,
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Quad Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let sampler = create_default_sampler(device);
        let bind_group = Self::mk_bind_group(device, &layout, &sampler, texture);

        Self {
            pipeline,
            layout,
            sampler,
            bind_group,
            vertex_buffer,
            index_buffer,
        }
    }

    fn mk_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Screen Quad Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Point the quad at a new texture, e.g. after the ray tracer resized.
    pub fn set_texture(&mut self, device: &wgpu::Device, texture: &Texture) {
        self.bind_group = Self::mk_bind_group(device, &self.layout, &self.sampler, texture);
    }

    pub fn render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Screen(Flat {
            pipeline: &self.pipeline,
            vertex: &self.vertex_buffer,
            index: &self.index_buffer,
            group: &self.bind_group,
            amount: QUAD_INDICES.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space_with_flipped_v() {
        let top_left = QUAD_VERTICES[0];
        assert_eq!(top_left.position, [-1.0, 1.0]);
        assert_eq!(top_left.tex_coords, [0.0, 0.0]);
        let bottom_right = QUAD_VERTICES[2];
        assert_eq!(bottom_right.tex_coords, [1.0, 1.0]);
    }

    #[test]
    fn quad_triangles_are_counter_clockwise() {
        for tri in QUAD_INDICES.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| QUAD_VERTICES[i as usize].position);
            let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(cross > 0.0);
        }
    }
}
