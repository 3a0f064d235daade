//! Three cubes drawn three different ways, with the hello triangle below them.

use cgmath::Vector3;
use trace_ngin::{
    demos::{
        cubes::{BasicCube, ExperimentalCube, IndexedCube},
        triangle::{HelloTriangle, TriangleEvent},
    },
    flow::{FlowConsturctor, GraphicsFlow},
};

fn main() -> anyhow::Result<()> {
    let basic: FlowConsturctor<(), TriangleEvent> = Box::new(|ctx| {
        Box::pin(async move {
            Box::new(BasicCube::new(&ctx, Vector3::new(-2.0, 0.0, 0.0))) as Box<dyn GraphicsFlow<_, _>>
        })
    });
    let indexed: FlowConsturctor<(), TriangleEvent> = Box::new(|ctx| {
        Box::pin(async move {
            Box::new(IndexedCube::new(&ctx, Vector3::new(0.0, 0.0, 0.0))) as Box<dyn GraphicsFlow<_, _>>
        })
    });
    let experimental: FlowConsturctor<(), TriangleEvent> = Box::new(|ctx| {
        Box::pin(async move {
            Box::new(ExperimentalCube::new(&ctx, Vector3::new(2.0, 0.0, 0.0))) as Box<dyn GraphicsFlow<_, _>>
        })
    });
    let triangle: FlowConsturctor<(), TriangleEvent> = Box::new(|ctx| {
        Box::pin(async move { Box::new(HelloTriangle::new(&ctx)) as Box<dyn GraphicsFlow<_, _>> })
    });
    trace_ngin::flow::run(vec![basic, indexed, experimental, triangle])
}
