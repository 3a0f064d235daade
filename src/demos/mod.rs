//! The exercises hosted by the engine. Each one is a [`GraphicsFlow`](crate::flow::GraphicsFlow)
//! and can be combined freely with the others in a call to [`run`](crate::flow::run).

pub mod cubes;
pub mod tracer;
pub mod triangle;
