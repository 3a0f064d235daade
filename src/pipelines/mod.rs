//! Render and compute pipelines. Each module loads the WGSL file of the same
//! name with `include_str!`.

pub mod basic;
pub mod compute;
pub mod cube;
pub mod quad;
pub mod raytrace;
pub mod triangle;
