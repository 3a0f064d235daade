//! Render composition and draw batching.
//!
//! Flows describe what to draw each frame with a [`Render`]. The engine walks
//! every tree into one [`Batch`] and records it into a single render pass:
//! backdrops first, then custom closures, then meshes. Within each group draws
//! keep the order the flows returned them in.
//!
//! # Key types
//!
//! - [`Render<'a, 'pass>`] is the primary enum describing render operations
//! - [`Mesh<'a>`] is a 3D draw that uses the context camera at group 0
//! - [`Flat<'a>`] is screen-space geometry with its own bind group at group 0
//!

use wgpu::RenderPass;

use crate::context::Context;

/// A 3D draw call.
///
/// The camera is bound at group 0 by the engine and `group` at group 1.
/// Without a vertex buffer the pipeline is expected to generate positions
/// from `vertex_index`/`instance_index`.
pub struct Mesh<'a> {
    pub pipeline: &'a wgpu::RenderPipeline,
    pub group: &'a wgpu::BindGroup,
    pub vertex: Option<&'a wgpu::Buffer>,
    pub index: Option<(&'a wgpu::Buffer, wgpu::IndexFormat)>,
    /// Vertices, or indices when `index` is set.
    pub count: u32,
    pub instances: u32,
}

/// Screen-space geometry with a `u16` index buffer, drawn before any mesh.
pub struct Flat<'a> {
    pub pipeline: &'a wgpu::RenderPipeline,
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub group: &'a wgpu::BindGroup,
    pub amount: usize,
}

/// Specifies how a flow should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Mesh(Mesh)` renders a single 3D draw
/// - `Meshes(Vec<Mesh>)` renders a batch of 3D draws
/// - `Screen(Flat)` renders a full-screen or 2D backdrop
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
/// - `Custom(...)` invokes a user-defined closure on the render pass
///
pub enum Render<'a, 'pass>
where
    'pass: 'a,
{
    None,
    Mesh(Mesh<'a>),
    Meshes(Vec<Mesh<'a>>),
    Screen(Flat<'a>),
    Composed(Vec<Render<'a, 'pass>>),
    Custom(CustomDraw<'a, 'pass>),
}

/// Closure drawn straight into the frame's render pass.
pub type CustomDraw<'a, 'pass> = Box<dyn 'a + FnOnce(&Context, &mut wgpu::RenderPass<'pass>)>;

/// Every draw of one frame, sorted by kind.
pub(crate) struct Batch<'a, 'pass> {
    pub(crate) screens: Vec<Flat<'a>>,
    pub(crate) customs: Vec<CustomDraw<'a, 'pass>>,
    pub(crate) meshes: Vec<Mesh<'a>>,
}

impl<'a, 'pass> Batch<'a, 'pass> {
    pub(crate) fn new() -> Self {
        Self {
            screens: Vec::new(),
            customs: Vec::new(),
            meshes: Vec::new(),
        }
    }

    /// Record the batch: backdrops, then custom closures, then meshes.
    pub(crate) fn draw(self, ctx: &Context, render_pass: &mut RenderPass<'pass>, camera: &wgpu::BindGroup) {
        for flat in &self.screens {
            flat.draw(render_pass);
        }
        for custom in self.customs {
            custom(ctx, render_pass);
        }
        for mesh in &self.meshes {
            mesh.draw(render_pass, camera);
        }
    }
}

impl<'a, 'pass> Render<'a, 'pass> {
    /// Sort `self` into `batch`. Nothing is drawn yet.
    pub(crate) fn collect(self, batch: &mut Batch<'a, 'pass>) {
        match self {
            Render::Mesh(mesh) => batch.meshes.push(mesh),
            Render::Meshes(mut vec) => batch.meshes.append(&mut vec),
            Render::Screen(flat) => batch.screens.push(flat),
            Render::Composed(renders) => renders.into_iter().for_each(|render| render.collect(batch)),
            Render::Custom(f) => batch.customs.push(f),
            Render::None => (),
        }
    }
}

impl<'a> From<Mesh<'a>> for Render<'a, '_> {
    fn from(mesh: Mesh<'a>) -> Self {
        Render::Mesh(mesh)
    }
}

impl<'a> Flat<'a> {
    pub(crate) fn draw(&self, render_pass: &mut RenderPass<'_>) {
        render_pass.set_pipeline(self.pipeline);
        render_pass.set_bind_group(0, self.group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex.slice(..));
        render_pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint16);
        render_pass.draw_indexed(0..self.amount as u32, 0, 0..1);
    }
}

impl<'a> Mesh<'a> {
    pub(crate) fn draw(&self, render_pass: &mut RenderPass<'_>, camera: &wgpu::BindGroup) {
        if self.instances == 0 || self.count == 0 {
            log::warn!("you attempted to render a mesh with zero instances or vertices");
            return;
        }
        render_pass.set_pipeline(self.pipeline);
        render_pass.set_bind_group(0, camera, &[]);
        render_pass.set_bind_group(1, self.group, &[]);
        if let Some(vertex) = self.vertex {
            render_pass.set_vertex_buffer(0, vertex.slice(..));
        }
        match self.index {
            Some((index, format)) => {
                render_pass.set_index_buffer(index.slice(..), format);
                render_pass.draw_indexed(0..self.count, 0, 0..self.instances);
            }
            None => render_pass.draw(0..self.count, 0..self.instances),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn nested_renders_without_draws_leave_the_batch_empty() {
        let mut batch = Batch::new();
        Render::Composed(vec![
            Render::None,
            Render::Meshes(Vec::new()),
            Render::Composed(vec![Render::None]),
        ])
        .collect(&mut batch);
        assert!(batch.screens.is_empty());
        assert!(batch.customs.is_empty());
        assert!(batch.meshes.is_empty());
    }

    #[test]
    fn custom_closures_are_deferred_until_drawn() {
        let calls = Cell::new(0);
        let mut batch = Batch::new();
        Render::Composed(vec![
            Render::Custom(Box::new(|_: &Context, _: &mut RenderPass<'_>| calls.set(calls.get() + 1))),
            Render::None,
            Render::Composed(vec![Render::Custom(Box::new(|_: &Context, _: &mut RenderPass<'_>| {
                calls.set(calls.get() + 10)
            }))]),
        ])
        .collect(&mut batch);
        assert_eq!(batch.customs.len(), 2);
        assert_eq!(calls.get(), 0);
    }

    #[cfg(feature = "integration-tests")]
    mod gpu {
        use wgpu::RenderPass;

        use crate::{
            context::Context,
            data_structures::texture::Texture,
            pipelines::{quad::ScreenQuad, triangle::mk_triangle_pipeline},
            render::{Batch, Mesh, Render},
        };

        const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

        fn device() -> (wgpu::Device, wgpu::Queue) {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            runtime.block_on(async {
                let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                    backends: wgpu::Backends::PRIMARY,
                    ..Default::default()
                });
                let adapter = instance
                    .request_adapter(&wgpu::RequestAdapterOptions::default())
                    .await
                    .expect("adapter");
                adapter
                    .request_device(&wgpu::DeviceDescriptor::default())
                    .await
                    .expect("device")
            })
        }

        fn mesh<'a>(
            pipeline: &'a wgpu::RenderPipeline,
            group: &'a wgpu::BindGroup,
            count: u32,
        ) -> Mesh<'a> {
            Mesh {
                pipeline,
                group,
                vertex: None,
                index: None,
                count,
                instances: 1,
            }
        }

        #[test]
        fn composed_renders_keep_flow_order_per_kind() {
            let (device, _) = device();
            let pipeline = mk_triangle_pipeline(&device, FORMAT);
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &[],
            });
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout: &layout,
                entries: &[],
            });
            let backdrop = Texture::create_storage_texture(&device, [4, 4], "Backdrop");
            let mut quad = ScreenQuad::new(&device, FORMAT, &backdrop);
            let resized = Texture::create_storage_texture(&device, [8, 8], "Backdrop");
            quad.set_texture(&device, &resized);

            let mut batch = Batch::new();
            Render::Composed(vec![
                mesh(&pipeline, &group, 1).into(),
                quad.render(),
                Render::None,
                Render::Meshes(vec![mesh(&pipeline, &group, 2), mesh(&pipeline, &group, 3)]),
            ])
            .collect(&mut batch);
            Render::Composed(vec![
                Render::Custom(Box::new(|_: &Context, _: &mut RenderPass<'_>| ())),
                mesh(&pipeline, &group, 4).into(),
            ])
            .collect(&mut batch);

            assert_eq!(batch.screens.len(), 1);
            assert_eq!(batch.screens[0].amount, 6);
            assert_eq!(batch.customs.len(), 1);
            let counts: Vec<u32> = batch.meshes.iter().map(|mesh| mesh.count).collect();
            assert_eq!(counts, [1, 2, 3, 4]);
        }
    }
}
