//! Matrix helpers for placing loaded meshes inside a scene.

use cgmath::{Matrix4, Vector3, Vector4};

pub fn make_translation_matrix(dx: f32, dy: f32, dz: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(dx, dy, dz))
}

pub fn make_scaling_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(sx, sy, sz)
}

/// Apply `matrix` to every vector, treating each as a point (w = 1).
pub fn transform_points(vectors: &[Vector3<f32>], matrix: Matrix4<f32>) -> Vec<Vector3<f32>> {
    vectors
        .iter()
        .map(|v| (matrix * Vector4::new(v.x, v.y, v.z, 1.0)).truncate())
        .collect()
}

pub fn translate_vectors(vectors: &[Vector3<f32>], translation: Vector3<f32>) -> Vec<Vector3<f32>> {
    transform_points(
        vectors,
        make_translation_matrix(translation.x, translation.y, translation.z),
    )
}

pub fn scale_vectors(vectors: &[Vector3<f32>], scale: Vector3<f32>) -> Vec<Vector3<f32>> {
    transform_points(vectors, make_scaling_matrix(scale.x, scale.y, scale.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_moves_points() {
        let moved = translate_vectors(&[Vector3::new(1.0, 2.0, 3.0)], Vector3::new(-1.0, 0.5, 2.0));
        assert_eq!(moved, vec![Vector3::new(0.0, 2.5, 5.0)]);
    }

    #[test]
    fn scaling_is_per_axis() {
        let scaled = scale_vectors(
            &[Vector3::new(1.0, -2.0, 4.0), Vector3::new(0.0, 0.0, 0.0)],
            Vector3::new(2.0, 0.5, 0.25),
        );
        assert_eq!(scaled, vec![Vector3::new(2.0, -1.0, 1.0), Vector3::new(0.0, 0.0, 0.0)]);
    }

    #[test]
    fn translation_lives_in_the_last_column() {
        let matrix = make_translation_matrix(3.0, 4.0, 5.0);
        assert_eq!(matrix.w, Vector4::new(3.0, 4.0, 5.0, 1.0));
    }
}
