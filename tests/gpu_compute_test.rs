#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{demo_camera, headless_device};

#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_double_values_on_the_gpu() {
    use trace_ngin::demos::triangle::double_values;

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let output = runtime
        .block_on(async {
            let (device, queue) = headless_device().await?;
            double_values(&device, &queue, &[1.0, 2.0, 3.0, 4.0]).await
        })
        .expect("compute round trip");

    assert_eq!(output, vec![2.0, 4.0, 6.0, 8.0]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_double_more_values_than_one_workgroup() {
    use trace_ngin::demos::triangle::double_values;

    let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let output = runtime
        .block_on(async {
            let (device, queue) = headless_device().await?;
            double_values(&device, &queue, &input).await
        })
        .expect("compute round trip");

    let expected: Vec<f32> = input.iter().map(|v| v * 2.0).collect();
    assert_eq!(output, expected);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_match_the_cpu_reference_trace() {
    use trace_ngin::{
        data_structures::scene::{MeshData, Scene},
        raytrace::{RayTracer, hit::render},
    };

    const WIDTH: u32 = 96;
    const HEIGHT: u32 = 64;
    let mesh = MeshData {
        positions: vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
        indices: vec![0, 1, 2],
    };
    let scene = Scene::demo(Some(&mesh)).expect("demo scene is valid");
    let camera = demo_camera(WIDTH, HEIGHT);

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let gpu = runtime
        .block_on(async {
            let (device, queue) = headless_device().await?;
            let mut tracer = RayTracer::new(&device, &scene, WIDTH, HEIGHT)?;
            tracer.update_camera(&queue, &camera);
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Test Trace Encoder"),
            });
            tracer.encode(&mut encoder);
            queue.submit(std::iter::once(encoder.finish()));
            tracer.read_output(&device, &queue).await
        })
        .expect("GPU trace");
    let cpu = render(&scene, &camera, WIDTH, HEIGHT).expect("valid scene");

    assert_eq!(gpu.dimensions(), cpu.dimensions());
    // Silhouette edges may land on different sides of a pixel centre.
    let mismatched = gpu
        .pixels()
        .zip(cpu.pixels())
        .filter(|(g, c)| g.0.iter().zip(c.0.iter()).any(|(a, b)| a.abs_diff(*b) > 3))
        .count();
    let total = (WIDTH * HEIGHT) as usize;
    assert!(
        mismatched * 100 < total,
        "{mismatched} of {total} pixels differ from the CPU reference"
    );
}
