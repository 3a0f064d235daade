//! Engine data structures: fixed geometry, scene structs, textures and transforms.
//!
//! - `cube` holds the three cube encodings (explicit, indexed, bit-packed)
//! - `scene` contains the GPU-layout primitives the ray tracer consumes
//! - `texture` wraps GPU textures (depth buffers, compute output)
//! - `transform` has the matrix helpers used to place meshes in a scene
//! - `vertex` describes vertex formats and their buffer layouts

pub mod cube;
pub mod scene;
pub mod texture;
pub mod transform;
pub mod vertex;
