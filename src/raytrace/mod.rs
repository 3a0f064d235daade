//! Compute-shader ray tracer.
//!
//! [`RayTracer`] owns the scene buffers, a uniform with the camera basis and
//! scene counts, and an `Rgba8Unorm` storage texture. [`RayTracer::encode`]
//! records one compute pass with one invocation per pixel; the texture is
//! then drawn with a full-screen quad (see [`crate::pipelines::quad`]) or read
//! back with [`RayTracer::read_output`].
//!
//! [`hit`] holds the same algorithm on the CPU.

pub mod hit;

use std::future::Future;

use cgmath::{InnerSpace, Vector3};

use crate::{
    camera::{Camera, Projection},
    data_structures::{
        scene::{Scene, SceneError},
        texture::Texture,
    },
    pipelines::raytrace::{mk_raytrace_layout, mk_raytrace_pipeline},
    resources::buffers::{SceneBuffers, read_buffer},
};

use self::hit::Ray;

/// Edge length of a square compute workgroup, matches `@workgroup_size` in the
/// kernel.
pub const WORKGROUP_SIZE: u32 = 8;

/// Minimum hit distance; avoids self-intersection of secondary rays.
pub const EPSILON: f32 = 1e-4;

/// Direction the light travels in, not normalised.
pub const LIGHT_DIRECTION: [f32; 3] = [-0.4, -0.8, -0.45];

/// Fraction of a surface's colour visible without direct light.
pub const AMBIENT: f32 = 0.15;

pub const BACKGROUND: [f32; 3] = [0.05, 0.05, 0.1];

pub fn light_direction() -> Vector3<f32> {
    Vector3::from(LIGHT_DIRECTION).normalize()
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("the device cannot run compute shaders (WebGL2?)")]
    ComputeUnsupported,
    #[error("invalid scene: {0}")]
    InvalidScene(#[from] SceneError),
}

/// Workgroups needed to cover a `width` x `height` image.
pub fn dispatch_size(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(WORKGROUP_SIZE), height.div_ceil(WORKGROUP_SIZE))
}

/// A pinhole camera as an orthonormal basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceCamera {
    pub origin: Vector3<f32>,
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
    /// `tan(fovy / 2)`.
    pub tan_half_fov: f32,
    /// Width over height of the image.
    pub aspect: f32,
}

impl TraceCamera {
    pub fn new(origin: Vector3<f32>, forward: Vector3<f32>, fovy: cgmath::Rad<f32>, aspect: f32) -> Self {
        let forward = forward.normalize();
        // Looking straight up or down, y cannot span the image plane.
        let right = match forward.cross(Vector3::unit_y()) {
            right if right.magnitude2() > 1e-12 => right.normalize(),
            _ => forward.cross(Vector3::unit_z()).normalize(),
        };
        let up = right.cross(forward);
        Self {
            origin,
            forward,
            right,
            up,
            tan_half_fov: (fovy.0 / 2.0).tan(),
            aspect,
        }
    }

    pub fn from_camera(camera: &Camera, projection: &Projection) -> Self {
        Self::new(
            Vector3::new(camera.position.x, camera.position.y, camera.position.z),
            camera.forward(),
            projection.fovy,
            projection.aspect(),
        )
    }

    /// Primary ray through the centre of pixel (`x`, `y`); y grows downwards.
    pub fn ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let ndc_x = 2.0 * (x as f32 + 0.5) / width as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * (y as f32 + 0.5) / height as f32;
        let direction = self.forward
            + self.right * (ndc_x * self.aspect * self.tan_half_fov)
            + self.up * (ndc_y * self.tan_half_fov);
        Ray::new(self.origin, direction)
    }
}

/// Kernel uniform, 112 bytes with every `vec3` followed by a 4-byte scalar.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TraceUniforms {
    pub origin: [f32; 3],
    pub tan_half_fov: f32,
    pub forward: [f32; 3],
    pub aspect: f32,
    pub right: [f32; 3],
    pub ambient: f32,
    pub up: [f32; 3],
    pub sphere_count: u32,
    pub light_direction: [f32; 3],
    pub plane_count: u32,
    pub background: [f32; 3],
    pub disk_count: u32,
    pub triangle_count: u32,
    pub model_count: u32,
    pub width: u32,
    pub height: u32,
}

impl TraceUniforms {
    pub fn new(camera: &TraceCamera, scene: &SceneBuffers, width: u32, height: u32) -> Self {
        let counts = scene.counts();
        Self {
            origin: camera.origin.into(),
            tan_half_fov: camera.tan_half_fov,
            forward: camera.forward.into(),
            aspect: camera.aspect,
            right: camera.right.into(),
            ambient: AMBIENT,
            up: camera.up.into(),
            sphere_count: counts.spheres,
            light_direction: light_direction().into(),
            plane_count: counts.planes,
            background: BACKGROUND,
            disk_count: counts.disks,
            triangle_count: counts.triangles,
            model_count: counts.models,
            width,
            height,
        }
    }

    fn set_camera(&mut self, camera: &TraceCamera) {
        self.origin = camera.origin.into();
        self.tan_half_fov = camera.tan_half_fov;
        self.forward = camera.forward.into();
        self.aspect = camera.aspect;
        self.right = camera.right.into();
        self.up = camera.up.into();
    }

    fn set_counts(&mut self, scene: &SceneBuffers) {
        let counts = scene.counts();
        self.sphere_count = counts.spheres;
        self.plane_count = counts.planes;
        self.disk_count = counts.disks;
        self.triangle_count = counts.triangles;
        self.model_count = counts.models;
    }
}

pub struct RayTracer {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    scene: SceneBuffers,
    uniforms: TraceUniforms,
    uniform_buffer: wgpu::Buffer,
    output: Texture,
    bind_group: wgpu::BindGroup,
}

impl RayTracer {
    pub fn new(device: &wgpu::Device, scene: &Scene, width: u32, height: u32) -> Result<Self, TraceError> {
        let limits = device.limits();
        if limits.max_compute_workgroups_per_dimension == 0
            || limits.max_storage_textures_per_shader_stage == 0
        {
            return Err(TraceError::ComputeUnsupported);
        }
        scene.validate()?;
        if scene.is_empty() {
            log::warn!("Tracing an empty scene, every pixel will be background");
        }

        let bind_group_layout = mk_raytrace_layout(device);
        let pipeline = mk_raytrace_pipeline(device, &bind_group_layout);
        let scene = SceneBuffers::new(device, scene);
        let output = Texture::create_storage_texture(device, [width, height], "Ray Trace Output");
        let camera = TraceCamera::new(
            Vector3::new(0.0, 0.0, 0.0),
            -Vector3::unit_z(),
            cgmath::Deg(45.0).into(),
            output.width() as f32 / output.height() as f32,
        );
        let uniforms = TraceUniforms::new(&camera, &scene, output.width(), output.height());
        let uniform_buffer = {
            use wgpu::util::DeviceExt;
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Ray Trace Uniform Buffer"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let bind_group = Self::mk_bind_group(device, &bind_group_layout, &uniform_buffer, &scene, &output);
        log::info!("Ray tracer ready at {}x{}", output.width(), output.height());

        Ok(Self {
            pipeline,
            bind_group_layout,
            scene,
            uniforms,
            uniform_buffer,
            output,
            bind_group,
        })
    }

    fn mk_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        scene: &SceneBuffers,
        output: &Texture,
    ) -> wgpu::BindGroup {
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }];
        entries.extend(scene.entries());
        entries.push(wgpu::BindGroupEntry {
            binding: 8,
            resource: wgpu::BindingResource::TextureView(&output.view),
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Ray Trace Bind Group"),
            layout,
            entries: &entries,
        })
    }

    fn rebind(&mut self, device: &wgpu::Device) {
        self.bind_group = Self::mk_bind_group(
            device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            &self.scene,
            &self.output,
        );
    }

    /// Replace the scene. The buffers are uploaded once here, not per frame.
    pub fn set_scene(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) -> Result<(), SceneError> {
        scene.validate()?;
        self.scene = SceneBuffers::new(device, scene);
        self.uniforms.set_counts(&self.scene);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
        self.rebind(device);
        Ok(())
    }

    /// Recreate the output texture. Does nothing if the size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) -> bool {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == self.size() {
            return false;
        }
        log::debug!("Resizing ray tracer output to {width}x{height}");
        self.output = Texture::create_storage_texture(device, [width, height], "Ray Trace Output");
        self.uniforms.width = width;
        self.uniforms.height = height;
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
        self.rebind(device);
        true
    }

    pub fn update_camera(&mut self, queue: &wgpu::Queue, camera: &TraceCamera) {
        self.uniforms.set_camera(camera);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
    }

    /// Record the trace into `encoder`.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        let (x, y) = dispatch_size(self.output.width(), self.output.height());
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Ray Trace Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.output.width(), self.output.height())
    }

    /// The texture the kernel writes, for sampling in a render pass.
    pub fn output(&self) -> &Texture {
        &self.output
    }

    /// Copy the current output into a mappable buffer and return a future that
    /// resolves to the image.
    ///
    /// The copy is submitted immediately; the future owns everything it needs
    /// and can outlive `self`.
    pub fn read_output(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> impl Future<Output = anyhow::Result<image::RgbaImage>> + 'static {
        let (width, height) = self.size();
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ray Trace Readback Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Ray Trace Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.output.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let device = device.clone();
        async move {
            let data = read_buffer(&device, &output_buffer).await?;
            let pixels: Vec<u8> = data
                .chunks(padded_bytes_per_row as usize)
                .take(height as usize)
                .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
                .copied()
                .collect();
            image::RgbaImage::from_raw(width, height, pixels)
                .ok_or_else(|| anyhow::anyhow!("Readback returned too few bytes for {width}x{height}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_rounds_up() {
        assert_eq!(dispatch_size(800, 600), (100, 75));
        assert_eq!(dispatch_size(801, 1), (101, 1));
        assert_eq!(dispatch_size(1, 1), (1, 1));
    }

    #[test]
    fn uniforms_are_112_bytes_and_16_aligned() {
        assert_eq!(std::mem::size_of::<TraceUniforms>(), 112);
        assert_eq!(std::mem::offset_of!(TraceUniforms, up), 48);
        assert_eq!(std::mem::offset_of!(TraceUniforms, triangle_count), 96);
    }

    #[test]
    fn camera_basis_is_orthonormal() {
        let camera = TraceCamera::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(1.0, -0.5, -1.0),
            cgmath::Deg(60.0).into(),
            1.5,
        );
        assert!(camera.forward.dot(camera.right).abs() < 1e-6);
        assert!(camera.forward.dot(camera.up).abs() < 1e-6);
        assert!((camera.up.magnitude() - 1.0).abs() < 1e-6);
        assert!(camera.up.y > 0.0);
    }

    #[test]
    fn vertical_cameras_keep_a_finite_basis() {
        for forward in [Vector3::unit_y(), -Vector3::unit_y(), Vector3::new(0.0, 3.0, 0.0)] {
            let camera = TraceCamera::new(Vector3::new(0.0, 0.0, 0.0), forward, cgmath::Deg(45.0).into(), 1.0);
            for axis in [camera.forward, camera.right, camera.up] {
                assert!((axis.magnitude() - 1.0).abs() < 1e-6, "{axis:?}");
            }
            assert!(camera.forward.dot(camera.right).abs() < 1e-6);
            assert!(camera.forward.dot(camera.up).abs() < 1e-6);
            assert!(camera.right.dot(camera.up).abs() < 1e-6);

            let ray = camera.ray(0, 0, 4, 4);
            assert!(ray.direction.x.is_finite() && ray.direction.y.is_finite() && ray.direction.z.is_finite());
        }
    }

    #[test]
    fn centre_pixel_looks_forward() {
        let camera = TraceCamera::new(Vector3::new(0.0, 0.0, 0.0), -Vector3::unit_z(), cgmath::Deg(45.0).into(), 1.0);
        let ray = camera.ray(50, 50, 101, 101);
        assert!((ray.direction - -Vector3::unit_z()).magnitude() < 1e-6);

        // Top-left pixel points up and left.
        let corner = camera.ray(0, 0, 101, 101);
        assert!(corner.direction.x < 0.0 && corner.direction.y > 0.0);
    }

    #[test]
    fn camera_from_the_engine_camera_uses_yaw_and_fov() {
        let camera = Camera::new((0.0, 0.0, 0.0), cgmath::Deg(-90.0), cgmath::Deg(0.0));
        let projection = Projection::new(200, 100, cgmath::Deg(90.0), 0.1, 100.0);
        let trace = TraceCamera::from_camera(&camera, &projection);
        assert!((trace.forward - -Vector3::unit_z()).magnitude() < 1e-6);
        assert!((trace.tan_half_fov - 1.0).abs() < 1e-6);
        assert_eq!(trace.aspect, 2.0);
    }
}
