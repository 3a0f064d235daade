//! Three encodings of the same unit cube.
//!
//! Corner `i` of the cube sits at `x = bit 0`, `y = bit 1`, `z = bit 2` of `i`,
//! each bit mapped to `+0.5` when set and `-0.5` otherwise. Faces are listed in
//! the order +x, -x, +y, -y, +z, -z, two triangles per face, every triangle
//! wound counter-clockwise when seen from outside the cube.
//!
//! * [`BASIC_CUBE_VERTICES`] spells out all 36 triangle-list vertices.
//! * [`INDEXED_CUBE_VERTICES`] + [`INDEXED_CUBE_INDICES`] share the 8 corners.
//! * [`EXPERIMENTAL_CUBE_BITMAP`] packs each triangle's three corner codes into
//!   one `u32`; the vertex shader rebuilds positions from `vertex_index` and
//!   `instance_index` without any vertex buffer.

use crate::data_structures::vertex::CubeVertex;

const H: f32 = 0.5;

/// Number of triangles in a cube.
pub const CUBE_TRIANGLES: usize = 12;

/// Vertices drawn per face instance by the experimental cube.
pub const VERTICES_PER_FACE: u32 = 6;

/// Face instances drawn by the experimental cube.
pub const FACES: u32 = 6;

#[rustfmt::skip]
pub const BASIC_CUBE_VERTICES: [CubeVertex; 36] = [
    // +x
    CubeVertex::new( H, -H, -H), CubeVertex::new( H,  H, -H), CubeVertex::new( H,  H,  H),
    CubeVertex::new( H, -H, -H), CubeVertex::new( H,  H,  H), CubeVertex::new( H, -H,  H),
    // -x
    CubeVertex::new(-H, -H, -H), CubeVertex::new(-H, -H,  H), CubeVertex::new(-H,  H,  H),
    CubeVertex::new(-H, -H, -H), CubeVertex::new(-H,  H,  H), CubeVertex::new(-H,  H, -H),
    // +y
    CubeVertex::new(-H,  H, -H), CubeVertex::new(-H,  H,  H), CubeVertex::new( H,  H,  H),
    CubeVertex::new(-H,  H, -H), CubeVertex::new( H,  H,  H), CubeVertex::new( H,  H, -H),
    // -y
    CubeVertex::new(-H, -H, -H), CubeVertex::new( H, -H, -H), CubeVertex::new( H, -H,  H),
    CubeVertex::new(-H, -H, -H), CubeVertex::new( H, -H,  H), CubeVertex::new(-H, -H,  H),
    // +z
    CubeVertex::new(-H, -H,  H), CubeVertex::new( H, -H,  H), CubeVertex::new( H,  H,  H),
    CubeVertex::new(-H, -H,  H), CubeVertex::new( H,  H,  H), CubeVertex::new(-H,  H,  H),
    // -z
    CubeVertex::new(-H, -H, -H), CubeVertex::new(-H,  H, -H), CubeVertex::new( H,  H, -H),
    CubeVertex::new(-H, -H, -H), CubeVertex::new( H,  H, -H), CubeVertex::new( H, -H, -H),
];

pub const INDEXED_CUBE_VERTICES: [CubeVertex; 8] = [
    corner_vertex(0),
    corner_vertex(1),
    corner_vertex(2),
    corner_vertex(3),
    corner_vertex(4),
    corner_vertex(5),
    corner_vertex(6),
    corner_vertex(7),
];

#[rustfmt::skip]
pub const INDEXED_CUBE_INDICES: [u16; 36] = [
    1, 3, 7,  1, 7, 5, // +x
    0, 4, 6,  0, 6, 2, // -x
    2, 6, 7,  2, 7, 3, // +y
    0, 1, 5,  0, 5, 4, // -y
    4, 5, 7,  4, 7, 6, // +z
    0, 2, 3,  0, 3, 1, // -z
];

#[rustfmt::skip]
pub const EXPERIMENTAL_CUBE_BITMAP: [u32; CUBE_TRIANGLES] = [
    pack_triangle(1, 3, 7), pack_triangle(1, 7, 5),
    pack_triangle(0, 4, 6), pack_triangle(0, 6, 2),
    pack_triangle(2, 6, 7), pack_triangle(2, 7, 3),
    pack_triangle(0, 1, 5), pack_triangle(0, 5, 4),
    pack_triangle(4, 5, 7), pack_triangle(4, 7, 6),
    pack_triangle(0, 2, 3), pack_triangle(0, 3, 1),
];

/// Pack three 3-bit corner codes at bits 0, 3 and 6.
pub const fn pack_triangle(a: u32, b: u32, c: u32) -> u32 {
    (a & 7) | (b & 7) << 3 | (c & 7) << 6
}

/// Corner code of `vertex` (0..6) in face `instance` (0..6).
///
/// Same arithmetic as `vs_main` in `experimental_cube.wgsl`.
pub fn decode_corner(bitmap: &[u32; CUBE_TRIANGLES], instance: u32, vertex: u32) -> u32 {
    let triangle = (instance * 2 + vertex / 3) as usize;
    (bitmap[triangle] >> (3 * (vertex % 3))) & 7
}

pub const fn corner_position(code: u32) -> [f32; 3] {
    [
        if code & 1 != 0 { H } else { -H },
        if code & 2 != 0 { H } else { -H },
        if code & 4 != 0 { H } else { -H },
    ]
}

const fn corner_vertex(code: u32) -> CubeVertex {
    CubeVertex {
        position: corner_position(code),
    }
}

/// Colour of face `instance`: the unit vector of its axis.
pub fn face_color(instance: u32) -> [f32; 3] {
    let mut color = [0.0; 3];
    color[(instance / 2) as usize % 3] = 1.0;
    color
}

/// The bitmap laid out as `array<vec4<u32>, 3>`, the shape a uniform array needs.
pub fn bitmap_uniform(bitmap: &[u32; CUBE_TRIANGLES]) -> [[u32; 4]; 3] {
    let mut rows = [[0; 4]; 3];
    for (i, entry) in bitmap.iter().enumerate() {
        rows[i / 4][i % 4] = *entry;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn expand_indexed() -> Vec<[f32; 3]> {
        INDEXED_CUBE_INDICES
            .iter()
            .map(|i| INDEXED_CUBE_VERTICES[*i as usize].position)
            .collect()
    }

    fn expand_bitmap() -> Vec<[f32; 3]> {
        (0..FACES)
            .flat_map(|instance| {
                (0..VERTICES_PER_FACE).map(move |vertex| {
                    corner_position(decode_corner(&EXPERIMENTAL_CUBE_BITMAP, instance, vertex))
                })
            })
            .collect()
    }

    fn outward(triangle: &[[f32; 3]]) -> bool {
        let a = Vector3::from(triangle[0]);
        let b = Vector3::from(triangle[1]);
        let c = Vector3::from(triangle[2]);
        let normal = (b - a).cross(c - a);
        let centroid = (a + b + c) / 3.0;
        normal.dot(centroid) > 0.0
    }

    #[test]
    fn explicit_and_indexed_cubes_describe_the_same_triangles() {
        let explicit: Vec<[f32; 3]> = BASIC_CUBE_VERTICES.iter().map(|v| v.position).collect();
        assert_eq!(explicit, expand_indexed());
    }

    #[test]
    fn bitmap_decodes_to_the_indexed_cube() {
        assert_eq!(expand_bitmap(), expand_indexed());
    }

    #[test]
    fn every_triangle_faces_outward() {
        for triangle in expand_indexed().chunks(3) {
            assert!(outward(triangle), "inward triangle {:?}", triangle);
        }
    }

    #[test]
    fn each_face_instance_stays_on_its_axis() {
        for instance in 0..FACES {
            let axis = (instance / 2) as usize;
            let positions: Vec<[f32; 3]> = (0..VERTICES_PER_FACE)
                .map(|v| corner_position(decode_corner(&EXPERIMENTAL_CUBE_BITMAP, instance, v)))
                .collect();
            let expected = if instance % 2 == 0 { H } else { -H };
            assert!(positions.iter().all(|p| p[axis] == expected));
            assert_eq!(face_color(instance)[axis], 1.0);
        }
    }

    #[test]
    fn bitmap_entries_fit_in_nine_bits() {
        assert!(EXPERIMENTAL_CUBE_BITMAP.iter().all(|entry| *entry < 1 << 9));
        assert_eq!(pack_triangle(7, 0, 1), 0b001_000_111);
    }

    #[test]
    fn uniform_rows_keep_table_order() {
        let rows = bitmap_uniform(&EXPERIMENTAL_CUBE_BITMAP);
        assert_eq!(rows[0][0], EXPERIMENTAL_CUBE_BITMAP[0]);
        assert_eq!(rows[1][1], EXPERIMENTAL_CUBE_BITMAP[5]);
        assert_eq!(rows[2][3], EXPERIMENTAL_CUBE_BITMAP[11]);
    }
}
