use cgmath::{Deg, Vector3};
use trace_ngin::raytrace::TraceCamera;

/// The camera the ray tracer demo starts with: at the origin looking down `-z`.
pub fn demo_camera(width: u32, height: u32) -> TraceCamera {
    TraceCamera::new(
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
        Deg(45.0).into(),
        width as f32 / height as f32,
    )
}

/// Device and queue without a surface, for compute-only tests.
#[allow(dead_code)]
pub async fn headless_device() -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Test Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
            ..Default::default()
        })
        .await?;
    Ok((device, queue))
}
