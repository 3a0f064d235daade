//! Scene primitives in the exact memory layout of the ray tracing kernel.
//!
//! Every struct here is `#[repr(C)]` and padded to WGSL storage-buffer rules:
//! a `vec3<f32>` is 16-byte aligned, so each three-float field is followed by
//! either a scalar that fills the gap or an explicit padding float.

use cgmath::{InnerSpace, Matrix4, Vector3};

use crate::data_structures::transform::transform_points;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("{kind} {index} has a non-positive radius ({radius})")]
    InvalidRadius {
        kind: &'static str,
        index: usize,
        radius: f32,
    },
    #[error("{kind} {index} has a degenerate normal")]
    DegenerateNormal { kind: &'static str, index: usize },
    #[error("mesh has {0} indices, which is not a whole number of triangles")]
    NotTriangulated(usize),
    #[error("mesh index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("scene holds more {0} than a u32 can address")]
    TooLarge(&'static str),
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Sphere {
    pub center: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    _padding: f32,
}

impl Sphere {
    pub fn new(center: [f32; 3], radius: f32, color: [f32; 3]) -> Self {
        Self {
            center,
            radius,
            color,
            _padding: 0.0,
        }
    }
}

/// An infinite plane through `center`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Plane {
    pub center: [f32; 3],
    _padding0: f32,
    pub normal: [f32; 3],
    _padding1: f32,
    pub color: [f32; 3],
    _padding2: f32,
}

impl Plane {
    pub fn new(center: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            center,
            _padding0: 0.0,
            normal: Vector3::from(normal).normalize().into(),
            _padding1: 0.0,
            color,
            _padding2: 0.0,
        }
    }
}

/// A plane clipped to `radius` around `center`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Disk {
    pub center: [f32; 3],
    pub radius: f32,
    pub normal: [f32; 3],
    _padding0: f32,
    pub color: [f32; 3],
    _padding1: f32,
}

impl Disk {
    pub fn new(center: [f32; 3], normal: [f32; 3], radius: f32, color: [f32; 3]) -> Self {
        Self {
            center,
            radius,
            normal: Vector3::from(normal).normalize().into(),
            _padding0: 0.0,
            color,
            _padding1: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Triangle {
    pub v0: [f32; 3],
    _padding0: f32,
    pub v1: [f32; 3],
    _padding1: f32,
    pub v2: [f32; 3],
    _padding2: f32,
    pub color: [f32; 3],
    _padding3: f32,
}

impl Triangle {
    pub fn new(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            v0,
            _padding0: 0.0,
            v1,
            _padding1: 0.0,
            v2,
            _padding2: 0.0,
            color,
            _padding3: 0.0,
        }
    }
}

/// A mesh stored in the scene-wide vertex and index arrays.
///
/// Indices are relative to the mesh, the kernel adds `vertex_offset` when it
/// fetches a vertex.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Model {
    pub vertex_offset: u32,
    pub index_offset: u32,
    pub index_count: u32,
    _padding0: u32,
    pub color: [f32; 3],
    _padding1: f32,
}

impl Model {
    pub fn new(vertex_offset: u32, index_offset: u32, index_count: u32, color: [f32; 3]) -> Self {
        Self {
            vertex_offset,
            index_offset,
            index_count,
            _padding0: 0,
            color,
            _padding1: 0.0,
        }
    }
}

/// Triangle mesh on the CPU: positions plus zero-based triangle indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.indices.len() % 3 != 0 {
            return Err(SceneError::NotTriangulated(self.indices.len()));
        }
        if let Some(index) = self
            .indices
            .iter()
            .copied()
            .find(|i| *i as usize >= self.positions.len())
        {
            return Err(SceneError::IndexOutOfRange {
                index,
                vertex_count: self.positions.len(),
            });
        }
        Ok(())
    }

    /// A copy with every position multiplied by `matrix`.
    pub fn transformed(&self, matrix: Matrix4<f32>) -> Self {
        let points: Vec<Vector3<f32>> = self.positions.iter().map(|p| Vector3::from(*p)).collect();
        Self {
            positions: transform_points(&points, matrix)
                .into_iter()
                .map(Into::into)
                .collect(),
            indices: self.indices.clone(),
        }
    }
}

/// Everything the ray tracer draws.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub planes: Vec<Plane>,
    pub disks: Vec<Disk>,
    pub triangles: Vec<Triangle>,
    pub models: Vec<Model>,
    /// Packed vertices of every model, `w` is always 1.
    pub vertices: Vec<[f32; 4]>,
    /// Packed indices of every model.
    pub indices: Vec<u32>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `mesh` to the shared vertex/index arrays and register a model for
    /// it. Returns the index of the new model.
    pub fn add_mesh(&mut self, mesh: &MeshData, color: [f32; 3]) -> Result<usize, SceneError> {
        mesh.validate()?;
        let vertex_offset =
            u32::try_from(self.vertices.len()).map_err(|_| SceneError::TooLarge("vertices"))?;
        let index_offset =
            u32::try_from(self.indices.len()).map_err(|_| SceneError::TooLarge("indices"))?;
        let index_count =
            u32::try_from(mesh.indices.len()).map_err(|_| SceneError::TooLarge("indices"))?;

        self.vertices
            .extend(mesh.positions.iter().map(|[x, y, z]| [*x, *y, *z, 1.0]));
        self.indices.extend_from_slice(&mesh.indices);
        self.models
            .push(Model::new(vertex_offset, index_offset, index_count, color));
        log::debug!(
            "added mesh with {} triangles as model {}",
            mesh.triangle_count(),
            self.models.len() - 1
        );
        Ok(self.models.len() - 1)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        for (index, sphere) in self.spheres.iter().enumerate() {
            if !(sphere.radius > 0.0) {
                return Err(SceneError::InvalidRadius {
                    kind: "sphere",
                    index,
                    radius: sphere.radius,
                });
            }
        }
        for (index, plane) in self.planes.iter().enumerate() {
            if !is_unit(plane.normal) {
                return Err(SceneError::DegenerateNormal {
                    kind: "plane",
                    index,
                });
            }
        }
        for (index, disk) in self.disks.iter().enumerate() {
            if !(disk.radius > 0.0) {
                return Err(SceneError::InvalidRadius {
                    kind: "disk",
                    index,
                    radius: disk.radius,
                });
            }
            if !is_unit(disk.normal) {
                return Err(SceneError::DegenerateNormal { kind: "disk", index });
            }
        }
        for model in &self.models {
            if model.index_count % 3 != 0 {
                return Err(SceneError::NotTriangulated(model.index_count as usize));
            }
            let start = model.index_offset as usize;
            let end = start + model.index_count as usize;
            let indices = self.indices.get(start..end).ok_or(SceneError::IndexOutOfRange {
                index: end as u32,
                vertex_count: self.indices.len(),
            })?;
            let vertex_count = self.vertices.len().saturating_sub(model.vertex_offset as usize);
            if let Some(index) = indices.iter().copied().find(|i| *i as usize >= vertex_count) {
                return Err(SceneError::IndexOutOfRange { index, vertex_count });
            }
        }
        Ok(())
    }

    /// True when nothing would be hit. Vertices and indices without a model
    /// do not count.
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
            && self.planes.is_empty()
            && self.disks.is_empty()
            && self.triangles.is_empty()
            && self.models.is_empty()
    }

    /// The demo scene: three spheres, a backdrop plane, a disk, a triangle and,
    /// when given, `mesh` scaled down and placed to the right.
    pub fn demo(mesh: Option<&MeshData>) -> Result<Self, SceneError> {
        let mut scene = Self {
            spheres: vec![
                Sphere::new([0.0, 0.0, -2.0], 0.5, [1.0, 0.0, 0.0]),
                Sphere::new([0.0, -5.0, -5.0], 1.0, [1.0, 1.0, 0.0]),
                Sphere::new([-2.5, -1.5, -4.0], 1.0, [1.0, 0.0, 1.0]),
            ],
            planes: vec![Plane::new([0.0, 0.0, -8.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0])],
            disks: vec![Disk::new(
                [-0.8, -0.3, -1.5],
                [1.0, 0.0, 1.0],
                0.4,
                [1.0, 1.0, 1.0],
            )],
            triangles: vec![Triangle::new(
                [-0.8, -0.8, -3.0],
                [0.8, -0.8, -3.0],
                [0.8, 0.8, -3.0],
                [1.0, 1.0, 0.0],
            )],
            ..Default::default()
        };
        if let Some(mesh) = mesh {
            scene.add_mesh(&Self::place_demo_mesh(mesh), [0.2, 0.6, 1.0])?;
        }
        Ok(scene)
    }

    /// Where [`Scene::demo`] puts a loaded mesh.
    pub fn place_demo_mesh(mesh: &MeshData) -> MeshData {
        use crate::data_structures::transform::{make_scaling_matrix, make_translation_matrix};
        mesh.transformed(make_translation_matrix(1.6, 0.6, -4.0) * make_scaling_matrix(0.5, 0.5, 0.5))
    }
}

fn is_unit(v: [f32; 3]) -> bool {
    let length = Vector3::from(v).magnitude();
    length.is_finite() && (length - 1.0).abs() < 1e-3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    fn quad() -> MeshData {
        MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn structs_match_wgsl_storage_layout() {
        assert_eq!(size_of::<Sphere>(), 32);
        assert_eq!(size_of::<Plane>(), 48);
        assert_eq!(size_of::<Disk>(), 48);
        assert_eq!(size_of::<Triangle>(), 64);
        assert_eq!(size_of::<Model>(), 32);
    }

    #[test]
    fn constructors_normalise_normals() {
        let plane = Plane::new([0.0; 3], [0.0, 0.0, 5.0], [1.0; 3]);
        assert_eq!(plane.normal, [0.0, 0.0, 1.0]);
        let disk = Disk::new([0.0; 3], [1.0, 0.0, 1.0], 1.0, [1.0; 3]);
        assert!((disk.normal[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn meshes_are_appended_with_offsets() {
        let mut scene = Scene::new();
        assert_eq!(scene.add_mesh(&quad(), [1.0; 3]), Ok(0));
        assert_eq!(scene.add_mesh(&quad(), [0.5; 3]), Ok(1));

        assert_eq!(scene.vertices.len(), 8);
        assert_eq!(scene.indices.len(), 12);
        assert_eq!(scene.models[1].vertex_offset, 4);
        assert_eq!(scene.models[1].index_offset, 6);
        assert_eq!(scene.models[1].index_count, 6);
        assert_eq!(scene.vertices[5], [1.0, 0.0, 0.0, 1.0]);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn out_of_range_mesh_indices_are_rejected() {
        let mut mesh = quad();
        mesh.indices[4] = 9;
        assert_eq!(
            Scene::new().add_mesh(&mesh, [1.0; 3]),
            Err(SceneError::IndexOutOfRange {
                index: 9,
                vertex_count: 4
            })
        );
    }

    #[test]
    fn partial_triangles_are_rejected() {
        let mut mesh = quad();
        mesh.indices.pop();
        assert_eq!(mesh.validate(), Err(SceneError::NotTriangulated(5)));
    }

    #[test]
    fn validation_catches_bad_primitives() {
        let mut scene = Scene::new();
        scene.spheres.push(Sphere::new([0.0; 3], 0.0, [1.0; 3]));
        assert!(matches!(
            scene.validate(),
            Err(SceneError::InvalidRadius { kind: "sphere", .. })
        ));

        let mut scene = Scene::new();
        scene.planes.push(Plane::new([0.0; 3], [0.0; 3], [1.0; 3]));
        assert!(matches!(
            scene.validate(),
            Err(SceneError::DegenerateNormal { kind: "plane", .. })
        ));
    }

    #[test]
    fn scenes_with_only_buffers_count_as_empty() {
        let mut scene = Scene::new();
        assert!(scene.is_empty());
        scene.vertices.push([0.0, 0.0, 0.0, 1.0]);
        scene.indices.extend([0, 0, 0]);
        assert!(scene.is_empty());
        scene.add_mesh(&quad(), [1.0; 3]).unwrap();
        assert!(!scene.is_empty());
        assert!(!Scene::demo(None).unwrap().is_empty());
    }

    #[test]
    fn demo_scene_places_the_mesh() {
        let scene = Scene::demo(Some(&quad())).unwrap();
        assert_eq!(scene.spheres.len(), 3);
        assert_eq!(scene.models.len(), 1);
        // (1, 1, 0) scaled by 0.5 then moved to (1.6, 0.6, -4).
        assert_eq!(scene.vertices[2], [2.1, 1.1, -4.0, 1.0]);
        assert!(scene.validate().is_ok());
    }
}
