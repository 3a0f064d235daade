use std::io::{BufReader, Cursor};

use crate::data_structures::scene::MeshData;

/// Parse OBJ text into one triangle mesh.
///
/// Faces are triangulated and every model in the file is merged, with its
/// indices shifted past the positions of the models before it. Materials are
/// ignored, the ray tracer colours each model with a single colour.
pub fn parse_obj(text: &str) -> anyhow::Result<MeshData> {
    let mut reader = BufReader::new(Cursor::new(text));
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Ok(Default::default()),
    )?;

    let mut mesh = MeshData::default();
    for model in &models {
        let offset = mesh.positions.len() as u32;
        mesh.positions.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]]),
        );
        mesh.indices
            .extend(model.mesh.indices.iter().map(|i| i + offset));
    }
    if models.len() > 1 {
        log::debug!("Merged {} OBJ models into one mesh", models.len());
    }

    mesh.validate()?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

    #[test]
    fn quads_are_triangulated() {
        let mesh = parse_obj(QUAD).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.indices.iter().all(|i| *i < 4));
    }

    #[test]
    fn models_are_merged_with_offsets() {
        let text = format!(
            "{QUAD}o tri\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 5 6 7\n"
        );
        let mesh = parse_obj(&text).unwrap();
        assert_eq!(mesh.positions.len(), 7);
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(&mesh.indices[6..], &[4, 5, 6]);
        assert_eq!(mesh.positions[4], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert!(parse_obj("v 0 zero 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").is_err());
    }

    #[test]
    fn faces_past_the_vertex_list_are_errors() {
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").is_err());
    }

    #[test]
    fn empty_text_gives_an_empty_mesh() {
        assert_eq!(parse_obj("").unwrap(), MeshData::default());
    }
}
