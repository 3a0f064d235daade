//! The hello-triangle exercise: one coloured triangle in clip space, plus a
//! compute round trip that doubles a handful of floats on the GPU.

use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    context::{Context, InitContext},
    data_structures::vertex::ColorVertex,
    flow::{GraphicsFlow, Out},
    pipelines::{
        compute::{DOUBLE_WORKGROUP_SIZE, mk_double_layout, mk_double_pipeline},
        triangle::mk_triangle_pipeline,
    },
    render::Render,
    resources::buffers::read_buffer,
};

/// Sits below the cubes, in the bottom centre of the window.
#[rustfmt::skip]
pub const TRIANGLE_VERTICES: [ColorVertex; 3] = [
    ColorVertex { position: [ 0.0, -0.45], color: [1.0, 0.0, 0.0] },
    ColorVertex { position: [-0.2, -0.85], color: [0.0, 1.0, 0.0] },
    ColorVertex { position: [ 0.2, -0.85], color: [0.0, 0.0, 1.0] },
];

/// Values doubled once the flow is initialised.
pub const DOUBLE_INPUT: [f32; 4] = [1.0, 2.0, 3.0, 4.0];

#[derive(Debug)]
pub enum TriangleEvent {
    Doubled(anyhow::Result<Vec<f32>>),
}

pub struct HelloTriangle {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HelloTriangle {
    pub fn new(ctx: &InitContext) -> Self {
        let pipeline = mk_triangle_pipeline(&ctx.device, ctx.format);
        let vertex_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Triangle Vertex Buffer"),
            contents: bytemuck::cast_slice(&TRIANGLE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            pipeline,
            vertex_buffer,
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
        }
    }
}

/// Whether `device` can run compute shaders at all. WebGL2 cannot.
pub fn supports_compute(device: &wgpu::Device) -> bool {
    device.limits().max_compute_workgroups_per_dimension > 0
}

/// Double every value in `input` with a compute shader and read the result
/// back.
pub async fn double_values(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    input: &[f32],
) -> anyhow::Result<Vec<f32>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if !supports_compute(device) {
        anyhow::bail!("Compute shaders are not supported on this device");
    }

    let size = std::mem::size_of_val(input) as wgpu::BufferAddress;
    let input_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Double Input Buffer"),
        contents: bytemuck::cast_slice(input),
        usage: wgpu::BufferUsages::STORAGE,
    });
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Double Output Buffer"),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Double Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let layout = mk_double_layout(device);
    let pipeline = mk_double_pipeline(device, &layout);
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Double Bind Group"),
        layout: &layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: input_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: output_buffer.as_entire_binding(),
            },
        ],
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Double Encoder"),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Double Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups((input.len() as u32).div_ceil(DOUBLE_WORKGROUP_SIZE), 1, 1);
    }
    encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let bytes = read_buffer(device, &staging_buffer).await?;
    // The mapped copy has no alignment guarantee for f32.
    Ok(bytes
        .chunks_exact(std::mem::size_of::<f32>())
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

impl<S> GraphicsFlow<S, TriangleEvent> for HelloTriangle {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S, TriangleEvent> {
        if !supports_compute(&self.device) {
            log::warn!("Skipping the compute round trip, the device has no compute support");
            return Out::Empty;
        }
        let device = self.device.clone();
        let queue = self.queue.clone();
        Out::FutEvent(vec![Box::new(async move {
            TriangleEvent::Doubled(double_values(&device, &queue, &DOUBLE_INPUT).await)
        })])
    }

    fn on_update(&mut self, _: &Context, _: &mut S, _: Duration) -> Out<S, TriangleEvent> {
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut S) -> Out<S, TriangleEvent> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S, TriangleEvent> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S, TriangleEvent> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut S, event: TriangleEvent) -> Option<TriangleEvent> {
        match event {
            TriangleEvent::Doubled(Ok(output)) => {
                log::info!("Doubled {:?} on the GPU: {:?}", DOUBLE_INPUT, output);
            }
            TriangleEvent::Doubled(Err(e)) => log::error!("Compute round trip failed: {e:#}"),
        }
        None
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Custom(Box::new(|_: &Context, render_pass: &mut wgpu::RenderPass<'pass>| {
            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..TRIANGLE_VERTICES.len() as u32, 0..1);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_stays_inside_clip_space() {
        for vertex in TRIANGLE_VERTICES {
            assert!(vertex.position.iter().all(|c| (-1.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn triangle_winds_counter_clockwise() {
        let [a, b, c] = TRIANGLE_VERTICES.map(|v| v.position);
        let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
        assert!(cross > 0.0);
    }
}
