/**
 * This module contains all logic for loading meshes from external files and
 * getting scene data onto the GPU.
 */
pub mod buffers;
pub mod mesh;

pub use mesh::parse_obj;

use crate::data_structures::scene::MeshData;

/// Load an OBJ file from `assets/` (or the server on wasm) and merge all of its
/// models into a single triangle mesh.
pub async fn load_model_obj(file_name: &str) -> anyhow::Result<MeshData> {
    let obj_text = load_string(file_name).await?;
    let mesh = parse_obj(&obj_text)
        .map_err(|e| e.context(format!("Could not parse {file_name}")))?;
    log::info!(
        "Loaded {file_name}: {} vertices, {} triangles",
        mesh.positions.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("No window available"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("Page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Could not read {}: {e}", path.display()))?
    };

    Ok(txt)
}
