//! The ray tracing exercise.
//!
//! Every frame the kernel traces the scene from the context camera into a
//! storage texture, which a [`ScreenQuad`] then puts on screen as a backdrop.
//! The OBJ model is loaded in the background and added once it arrives.

use cgmath::Deg;
use instant::Duration;
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    camera::Camera,
    context::{Context, InitContext},
    data_structures::scene::{MeshData, Scene},
    flow::{GraphicsFlow, Out},
    pipelines::quad::ScreenQuad,
    raytrace::{RayTracer, TraceCamera, TraceError},
    render::Render,
    resources::load_model_obj,
};

/// Model placed into the demo scene once loaded.
pub const MODEL_FILE: &str = "icosahedron.obj";

#[cfg(not(target_arch = "wasm32"))]
pub const SCREENSHOT_FILE: &str = "screenshot.png";

#[derive(Debug)]
pub enum TracerEvent {
    ModelLoaded(anyhow::Result<MeshData>),
    Screenshot(anyhow::Result<image::RgbaImage>),
}

pub struct TracerFlow {
    tracer: RayTracer,
    quad: ScreenQuad,
}

impl TracerFlow {
    /// Build the tracer over the demo scene without the model.
    ///
    /// Fails with [`TraceError::ComputeUnsupported`] on WebGL2.
    pub fn new(ctx: &InitContext) -> Result<Self, TraceError> {
        let scene = Scene::demo(None)?;
        let tracer = RayTracer::new(&ctx.device, &scene, ctx.width, ctx.height)?;
        let quad = ScreenQuad::new(&ctx.device, ctx.format, tracer.output());
        Ok(Self { tracer, quad })
    }

    fn screenshot<S>(&self, ctx: &Context) -> Out<S, TracerEvent> {
        let image = self.tracer.read_output(&ctx.device, &ctx.queue);
        Out::FutEvent(vec![Box::new(async move {
            TracerEvent::Screenshot(image.await)
        })])
    }
}

impl<S> GraphicsFlow<S, TracerEvent> for TracerFlow {
    fn on_init(&mut self, ctx: &mut Context, _: &mut S) -> Out<S, TracerEvent> {
        ctx.camera.camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0));
        Out::FutEvent(vec![Box::new(async move {
            TracerEvent::ModelLoaded(load_model_obj(MODEL_FILE).await)
        })])
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, _: Duration) -> Out<S, TracerEvent> {
        let (width, height) = ctx.surface_size();
        if self.tracer.resize(&ctx.device, &ctx.queue, width, height) {
            self.quad.set_texture(&ctx.device, self.tracer.output());
        }
        let camera = TraceCamera::from_camera(&ctx.camera.camera, &ctx.projection);
        self.tracer.update_camera(&ctx.queue, &camera);
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut S) -> Out<S, TracerEvent> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S, TracerEvent> {
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, _: &mut S, event: &WindowEvent) -> Out<S, TracerEvent> {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyP),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.screenshot(ctx),
            _ => Out::Empty,
        }
    }

    fn on_custom_events(&mut self, ctx: &Context, _: &mut S, event: TracerEvent) -> Option<TracerEvent> {
        match event {
            TracerEvent::ModelLoaded(Ok(mesh)) => {
                let scene = Scene::demo(Some(&mesh)).and_then(|scene| {
                    self.tracer.set_scene(&ctx.device, &ctx.queue, &scene)?;
                    Ok(scene)
                });
                match scene {
                    Ok(scene) => log::info!(
                        "Scene rebuilt with {} model triangles",
                        scene.indices.len() / 3
                    ),
                    Err(e) => log::warn!("Keeping the scene without {MODEL_FILE}: {e}"),
                }
            }
            TracerEvent::ModelLoaded(Err(e)) => {
                log::warn!("Could not load {MODEL_FILE}, tracing without it: {e:#}")
            }
            TracerEvent::Screenshot(Ok(image)) => save_screenshot(&image),
            TracerEvent::Screenshot(Err(e)) => log::error!("Screenshot failed: {e:#}"),
        }
        None
    }

    fn on_compute(&self, _: &Context, encoder: &mut wgpu::CommandEncoder) {
        self.tracer.encode(encoder);
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        self.quad.render()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn save_screenshot(image: &image::RgbaImage) {
    match image.save(SCREENSHOT_FILE) {
        Ok(()) => log::info!("Saved {}x{} screenshot to {SCREENSHOT_FILE}", image.width(), image.height()),
        Err(e) => log::error!("Could not write {SCREENSHOT_FILE}: {e}"),
    }
}

#[cfg(target_arch = "wasm32")]
fn save_screenshot(image: &image::RgbaImage) {
    log::warn!(
        "Captured a {}x{} screenshot, but saving files is not supported in the browser",
        image.width(),
        image.height()
    );
}
