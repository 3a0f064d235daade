//! The compute-shader ray tracer. Right-drag to look around, WASD to move,
//! `P` to save a screenshot.

use cgmath::Vector3;
use trace_ngin::{
    demos::{
        cubes::BasicCube,
        tracer::{TracerEvent, TracerFlow},
    },
    flow::{FlowConsturctor, GraphicsFlow},
};

fn main() -> anyhow::Result<()> {
    let tracer: FlowConsturctor<(), TracerEvent> = Box::new(|ctx| {
        Box::pin(async move {
            match TracerFlow::new(&ctx) {
                Ok(flow) => Box::new(flow) as Box<dyn GraphicsFlow<_, _>>,
                Err(e) => {
                    log::error!("Ray tracer unavailable, showing a cube instead: {e}");
                    Box::new(BasicCube::new(&ctx, Vector3::new(0.0, 0.0, 0.0))) as Box<dyn GraphicsFlow<_, _>>
                }
            }
        })
    });
    trace_ngin::flow::run(vec![tracer])
}
