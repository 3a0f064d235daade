//! Three spinning cubes, each drawn a different way.
//!
//! [`BasicCube`] uploads all 36 vertices, [`IndexedCube`] shares 8 corners
//! through an index buffer and [`ExperimentalCube`] has no vertex data at all;
//! its shader decodes corners from a bitmap uniform.

use cgmath::{InnerSpace, Matrix4, Rad, Vector3};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    context::{Context, InitContext},
    data_structures::cube::{
        BASIC_CUBE_VERTICES, EXPERIMENTAL_CUBE_BITMAP, FACES, INDEXED_CUBE_INDICES,
        INDEXED_CUBE_VERTICES, VERTICES_PER_FACE, bitmap_uniform,
    },
    flow::{GraphicsFlow, Out},
    pipelines::cube::{
        TransformUniform, mk_bitmap_layout, mk_cube_pipeline, mk_experimental_cube_pipeline,
        mk_transform_layout,
    },
    render::{Mesh, Render},
};

/// Rotation of a cube about a fixed axis through its centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub translation: Vector3<f32>,
    pub axis: Vector3<f32>,
    pub angle: Rad<f32>,
    /// Radians per second.
    pub speed: f32,
}

impl Spin {
    pub fn new(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            axis: Vector3::new(1.0, 1.0, 0.3).normalize(),
            angle: Rad(0.0),
            speed: 0.8,
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        let full_turn = std::f32::consts::TAU;
        self.angle = Rad((self.angle.0 + self.speed * dt.as_secs_f32()) % full_turn);
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation) * Matrix4::from_axis_angle(self.axis, self.angle)
    }
}

/// Transform buffer and bind group shared by all three cubes.
struct CubeTransform {
    spin: Spin,
    buffer: wgpu::Buffer,
}

impl CubeTransform {
    fn new(device: &wgpu::Device, label: &str, translation: Vector3<f32>) -> Self {
        let spin = Spin::new(translation);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&TransformUniform::from(spin.matrix())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self { spin, buffer }
    }

    fn update(&mut self, queue: &wgpu::Queue, dt: Duration) {
        self.spin.advance(dt);
        queue.write_buffer(
            &self.buffer,
            0,
            bytemuck::bytes_of(&TransformUniform::from(self.spin.matrix())),
        );
    }
}

/// What differs between the three cubes; every other hook is shared.
trait Cube {
    fn transform(&mut self) -> &mut CubeTransform;
    fn mesh(&self) -> Mesh<'_>;
}

impl<T: Cube, S, E> GraphicsFlow<S, E> for T {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, dt: Duration) -> Out<S, E> {
        self.transform().update(&ctx.queue, dt);
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Mesh(self.mesh())
    }
}

pub struct BasicCube {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    transform: CubeTransform,
    bind_group: wgpu::BindGroup,
}

impl BasicCube {
    pub fn new(ctx: &InitContext, translation: Vector3<f32>) -> Self {
        let device = &ctx.device;
        let layout = mk_transform_layout(device);
        let pipeline = mk_cube_pipeline(device, ctx.format, &ctx.camera_bind_group_layout, &layout);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Basic Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(&BASIC_CUBE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let transform = CubeTransform::new(device, "Basic Cube Transform", translation);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Basic Cube Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform.buffer.as_entire_binding(),
            }],
        });
        Self {
            pipeline,
            vertex_buffer,
            transform,
            bind_group,
        }
    }
}

impl Cube for BasicCube {
    fn transform(&mut self) -> &mut CubeTransform {
        &mut self.transform
    }

    fn mesh(&self) -> Mesh<'_> {
        Mesh {
            pipeline: &self.pipeline,
            group: &self.bind_group,
            vertex: Some(&self.vertex_buffer),
            index: None,
            count: BASIC_CUBE_VERTICES.len() as u32,
            instances: 1,
        }
    }
}

pub struct IndexedCube {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    transform: CubeTransform,
    bind_group: wgpu::BindGroup,
}

impl IndexedCube {
    pub fn new(ctx: &InitContext, translation: Vector3<f32>) -> Self {
        let device = &ctx.device;
        let layout = mk_transform_layout(device);
        let pipeline = mk_cube_pipeline(device, ctx.format, &ctx.camera_bind_group_layout, &layout);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Indexed Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(&INDEXED_CUBE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Indexed Cube Index Buffer"),
            contents: bytemuck::cast_slice(&INDEXED_CUBE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let transform = CubeTransform::new(device, "Indexed Cube Transform", translation);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Indexed Cube Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform.buffer.as_entire_binding(),
            }],
        });
        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            transform,
            bind_group,
        }
    }
}

impl Cube for IndexedCube {
    fn transform(&mut self) -> &mut CubeTransform {
        &mut self.transform
    }

    fn mesh(&self) -> Mesh<'_> {
        Mesh {
            pipeline: &self.pipeline,
            group: &self.bind_group,
            vertex: Some(&self.vertex_buffer),
            index: Some((&self.index_buffer, wgpu::IndexFormat::Uint16)),
            count: INDEXED_CUBE_INDICES.len() as u32,
            instances: 1,
        }
    }
}

pub struct ExperimentalCube {
    pipeline: wgpu::RenderPipeline,
    // Kept alive for the bind group.
    _bitmap_buffer: wgpu::Buffer,
    transform: CubeTransform,
    bind_group: wgpu::BindGroup,
}

impl ExperimentalCube {
    pub fn new(ctx: &InitContext, translation: Vector3<f32>) -> Self {
        let device = &ctx.device;
        let layout = mk_bitmap_layout(device);
        let pipeline =
            mk_experimental_cube_pipeline(device, ctx.format, &ctx.camera_bind_group_layout, &layout);
        let bitmap_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Experimental Cube Bitmap"),
            contents: bytemuck::cast_slice(&bitmap_uniform(&EXPERIMENTAL_CUBE_BITMAP)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let transform = CubeTransform::new(device, "Experimental Cube Transform", translation);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Experimental Cube Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: transform.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bitmap_buffer.as_entire_binding(),
                },
            ],
        });
        Self {
            pipeline,
            _bitmap_buffer: bitmap_buffer,
            transform,
            bind_group,
        }
    }
}

impl Cube for ExperimentalCube {
    fn transform(&mut self) -> &mut CubeTransform {
        &mut self.transform
    }

    fn mesh(&self) -> Mesh<'_> {
        Mesh {
            pipeline: &self.pipeline,
            group: &self.bind_group,
            vertex: None,
            index: None,
            count: VERTICES_PER_FACE,
            instances: FACES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Transform, Point3};

    #[test]
    fn spin_wraps_after_a_full_turn() {
        let mut spin = Spin::new(Vector3::new(0.0, 0.0, 0.0));
        spin.speed = 1.0;
        spin.advance(Duration::from_secs_f32(std::f32::consts::TAU + 0.5));
        assert!((spin.angle.0 - 0.5).abs() < 1e-4);
    }

    #[test]
    fn spin_keeps_the_cube_centred_on_its_translation() {
        let mut spin = Spin::new(Vector3::new(2.0, 0.0, 0.0));
        spin.advance(Duration::from_millis(700));
        let centre = spin.matrix().transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_eq!(centre, Point3::new(2.0, 0.0, 0.0));
    }
}
