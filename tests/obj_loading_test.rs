use trace_ngin::{data_structures::scene::Scene, resources::load_model_obj};

#[test]
fn should_load_the_icosahedron_asset() {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mesh = runtime
        .block_on(load_model_obj("icosahedron.obj"))
        .expect("icosahedron.obj should load");

    assert_eq!(mesh.positions.len(), 12);
    assert_eq!(mesh.triangle_count(), 20);
    assert!(mesh.validate().is_ok());
}

#[test]
fn should_place_the_loaded_model_into_the_demo_scene() {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mesh = runtime
        .block_on(load_model_obj("icosahedron.obj"))
        .expect("icosahedron.obj should load");

    let scene = Scene::demo(Some(&mesh)).expect("demo scene is valid");
    assert_eq!(scene.models.len(), 1);
    assert_eq!(scene.vertices.len(), 12);
    assert_eq!(scene.indices.len(), 60);
    assert!(scene.validate().is_ok());
}

#[test]
fn should_fail_on_a_missing_asset() {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let result = runtime.block_on(load_model_obj("does_not_exist.obj"));
    assert!(result.is_err());
}
