//! trace-ngin
//!
//! A small wgpu playground that hosts a handful of graphics exercises on top of
//! one shared runtime: three ways of drawing a cube, a hello-triangle with a
//! compute round trip, and a compute-shader ray tracer whose output is
//! composited onto a full-screen quad. Everything runs natively and, except for
//! the compute demos, on WebGL2.
//!
//! High-level modules
//! - `camera`: camera types, controller and uniforms for view/projection
//! - `context`: central GPU and window context that owns device/queue/surface
//! - `data_structures`: fixed geometry tables, scene structs, textures, transforms
//! - `demos`: the exercises themselves, each one a `GraphicsFlow`
//! - `flow`: event loop and the per-frame lifecycle of flows
//! - `pipelines`: render and compute pipeline construction plus WGSL sources
//! - `raytrace`: GPU ray tracer orchestration and its CPU reference
//! - `render`: draw-call descriptions returned by flows each frame
//! - `resources`: OBJ loading and typed GPU buffer helpers
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod demos;
pub mod flow;
pub mod pipelines;
pub mod raytrace;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
