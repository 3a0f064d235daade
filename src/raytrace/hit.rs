//! CPU version of the ray tracing kernel.
//!
//! Every function here has a twin in `raytrace.wgsl` with the same arithmetic,
//! so the GPU output can be checked against [`render`].

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::scene::{Disk, Model, Plane, Scene, SceneError, Sphere, Triangle};
use crate::raytrace::{AMBIENT, BACKGROUND, EPSILON, TraceCamera, light_direction};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

/// Closest intersection along a ray. `normal` faces against the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub distance: f32,
    pub normal: Vector3<f32>,
    pub color: [f32; 3],
}

pub fn hit_sphere(ray: &Ray, sphere: &Sphere) -> Option<f32> {
    let oc = ray.origin - Vector3::from(sphere.center);
    let b = oc.dot(ray.direction);
    let c = oc.dot(oc) - sphere.radius * sphere.radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let mut t = -b - root;
    if t < EPSILON {
        // Origin inside the sphere.
        t = -b + root;
    }
    (t >= EPSILON).then_some(t)
}

fn hit_infinite_plane(ray: &Ray, center: [f32; 3], normal: [f32; 3]) -> Option<f32> {
    let normal = Vector3::from(normal);
    let denom = normal.dot(ray.direction);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (Vector3::from(center) - ray.origin).dot(normal) / denom;
    (t >= EPSILON).then_some(t)
}

pub fn hit_plane(ray: &Ray, plane: &Plane) -> Option<f32> {
    hit_infinite_plane(ray, plane.center, plane.normal)
}

pub fn hit_disk(ray: &Ray, disk: &Disk) -> Option<f32> {
    let t = hit_infinite_plane(ray, disk.center, disk.normal)?;
    let offset = ray.at(t) - Vector3::from(disk.center);
    (offset.magnitude2() <= disk.radius * disk.radius).then_some(t)
}

/// Möller–Trumbore, hits both sides.
pub fn hit_triangle(ray: &Ray, v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> Option<f32> {
    let v0 = Vector3::from(v0);
    let edge1 = Vector3::from(v1) - v0;
    let edge2 = Vector3::from(v2) - v0;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < 1e-8 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t >= EPSILON).then_some(t)
}

fn triangle_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> Vector3<f32> {
    let v0 = Vector3::from(v0);
    (Vector3::from(v1) - v0)
        .cross(Vector3::from(v2) - v0)
        .normalize()
}

/// Nearest triangle of `model` along `ray`, with that triangle's normal.
///
/// Triangles whose indices fall outside the scene buffers are skipped.
pub fn hit_model(ray: &Ray, scene: &Scene, model: &Model) -> Option<(f32, Vector3<f32>)> {
    let start = model.index_offset as usize;
    let end = start.saturating_add(model.index_count as usize).min(scene.indices.len());
    let indices = scene.indices.get(start..end)?;
    let vertex = |i: u32| {
        let [x, y, z, _] = *scene
            .vertices
            .get(model.vertex_offset.checked_add(i)? as usize)?;
        Some([x, y, z])
    };

    let mut closest: Option<(f32, Vector3<f32>)> = None;
    for triangle in indices.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2])) else {
            continue;
        };
        if let Some(t) = hit_triangle(ray, a, b, c) {
            if closest.is_none_or(|(best, _)| t < best) {
                closest = Some((t, triangle_normal(a, b, c)));
            }
        }
    }
    closest
}

/// Closest hit over every primitive in the scene.
pub fn closest_hit(ray: &Ray, scene: &Scene) -> Option<Hit> {
    let mut closest: Option<Hit> = None;
    let mut consider = |distance: f32, normal: Vector3<f32>, color: [f32; 3]| {
        if closest.is_none_or(|hit| distance < hit.distance) {
            closest = Some(Hit {
                distance,
                normal,
                color,
            });
        }
    };

    for sphere in &scene.spheres {
        if let Some(t) = hit_sphere(ray, sphere) {
            let normal = (ray.at(t) - Vector3::from(sphere.center)) / sphere.radius;
            consider(t, normal, sphere.color);
        }
    }
    for plane in &scene.planes {
        if let Some(t) = hit_plane(ray, plane) {
            consider(t, plane.normal.into(), plane.color);
        }
    }
    for disk in &scene.disks {
        if let Some(t) = hit_disk(ray, disk) {
            consider(t, disk.normal.into(), disk.color);
        }
    }
    for Triangle {
        v0, v1, v2, color, ..
    } in &scene.triangles
    {
        if let Some(t) = hit_triangle(ray, *v0, *v1, *v2) {
            consider(t, triangle_normal(*v0, *v1, *v2), *color);
        }
    }
    for model in &scene.models {
        if let Some((t, normal)) = hit_model(ray, scene, model) {
            consider(t, normal, model.color);
        }
    }

    closest.map(|mut hit| {
        if hit.normal.dot(ray.direction) > 0.0 {
            hit.normal = -hit.normal;
        }
        hit
    })
}

/// Colour seen along `ray`: Lambert with an ambient floor, zeroed diffuse in
/// shadow, [`BACKGROUND`] on a miss.
pub fn trace(ray: &Ray, scene: &Scene) -> [f32; 3] {
    let Some(hit) = closest_hit(ray, scene) else {
        return BACKGROUND;
    };
    let to_light = -light_direction();
    let point = ray.at(hit.distance);
    let shadow_ray = Ray::new(point + hit.normal * (EPSILON * 10.0), to_light);
    let diffuse = if closest_hit(&shadow_ray, scene).is_some() {
        0.0
    } else {
        hit.normal.dot(to_light).max(0.0)
    };
    let intensity = AMBIENT + (1.0 - AMBIENT) * diffuse;
    hit.color.map(|c| c * intensity)
}

/// Trace every pixel of a `width` x `height` image.
///
/// The scene is validated first, the same check [`RayTracer`](super::RayTracer)
/// applies before uploading it.
pub fn render(
    scene: &Scene,
    camera: &TraceCamera,
    width: u32,
    height: u32,
) -> Result<image::RgbaImage, SceneError> {
    scene.validate()?;
    Ok(image::RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = trace(&camera.ray(x, y, width, height), scene);
        image::Rgba([to_unorm(r), to_unorm(g), to_unorm(b), 255])
    }))
}

/// Float to 8-bit unorm, rounding like a storage texture write does.
pub fn to_unorm(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
