//! Storage buffers holding the scene for the ray tracing kernel.

use wgpu::util::DeviceExt;

use crate::data_structures::scene::{Disk, Model, Plane, Scene, Sphere, Triangle};

/// A read-only storage buffer of `T` together with how many elements are valid.
///
/// WebGPU rejects zero-sized bindings, so an empty slice uploads a single
/// zeroed element while `len` stays 0. The kernel only ever reads `len`
/// elements.
#[derive(Debug)]
pub struct TypedBuffer {
    pub buffer: wgpu::Buffer,
    pub len: u32,
}

impl TypedBuffer {
    pub fn new<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, data: &[T]) -> Self {
        let fallback = [T::zeroed()];
        let contents: &[T] = if data.is_empty() { &fallback } else { data };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(contents),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            len: data.len() as u32,
        }
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    fn entry(&self, binding: u32) -> wgpu::BindGroupEntry<'_> {
        wgpu::BindGroupEntry {
            binding,
            resource: self.binding(),
        }
    }
}

/// Element counts in the order the kernel's uniform expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneCounts {
    pub spheres: u32,
    pub planes: u32,
    pub disks: u32,
    pub triangles: u32,
    pub models: u32,
}

/// All scene arrays, uploaded once and rebound whenever the output texture
/// changes.
#[derive(Debug)]
pub struct SceneBuffers {
    pub spheres: TypedBuffer,
    pub planes: TypedBuffer,
    pub disks: TypedBuffer,
    pub triangles: TypedBuffer,
    pub models: TypedBuffer,
    pub vertices: TypedBuffer,
    pub indices: TypedBuffer,
}

impl SceneBuffers {
    pub fn new(device: &wgpu::Device, scene: &Scene) -> Self {
        log::debug!(
            "Uploading scene: {} spheres, {} planes, {} disks, {} triangles, {} models",
            scene.spheres.len(),
            scene.planes.len(),
            scene.disks.len(),
            scene.triangles.len(),
            scene.models.len()
        );
        Self {
            spheres: TypedBuffer::new::<Sphere>(device, "Sphere Buffer", &scene.spheres),
            planes: TypedBuffer::new::<Plane>(device, "Plane Buffer", &scene.planes),
            disks: TypedBuffer::new::<Disk>(device, "Disk Buffer", &scene.disks),
            triangles: TypedBuffer::new::<Triangle>(device, "Triangle Buffer", &scene.triangles),
            models: TypedBuffer::new::<Model>(device, "Model Buffer", &scene.models),
            vertices: TypedBuffer::new(device, "Model Vertex Buffer", &scene.vertices),
            indices: TypedBuffer::new(device, "Model Index Buffer", &scene.indices),
        }
    }

    pub fn counts(&self) -> SceneCounts {
        SceneCounts {
            spheres: self.spheres.len,
            planes: self.planes.len,
            disks: self.disks.len,
            triangles: self.triangles.len,
            models: self.models.len,
        }
    }

    /// Bind group entries 1 to 7, after the uniform at 0 and before the output
    /// texture at 8.
    pub fn entries(&self) -> [wgpu::BindGroupEntry<'_>; 7] {
        [
            self.spheres.entry(1),
            self.planes.entry(2),
            self.disks.entry(3),
            self.triangles.entry(4),
            self.models.entry(5),
            self.vertices.entry(6),
            self.indices.entry(7),
        ]
    }
}

/// Map a `MAP_READ` buffer whose copy has already been submitted and return its
/// contents.
pub async fn read_buffer(device: &wgpu::Device, buffer: &wgpu::Buffer) -> anyhow::Result<Vec<u8>> {
    // The mapping has to be requested before polling, otherwise the await
    // below never resolves.
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        if tx.send(result).is_err() {
            log::warn!("Buffer mapped after the reader went away");
        }
    });
    #[cfg(target_arch = "wasm32")]
    device.poll(wgpu::PollType::Poll)?;
    #[cfg(not(target_arch = "wasm32"))]
    device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: Some(std::time::Duration::from_secs(5)),
    })?;
    rx.receive()
        .await
        .ok_or_else(|| anyhow::anyhow!("Buffer mapping was cancelled"))??;

    let data = buffer_slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}
