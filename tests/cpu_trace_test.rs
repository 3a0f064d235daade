use trace_ngin::{
    data_structures::scene::Scene,
    raytrace::{BACKGROUND, hit::render},
};

use crate::common::test_utils::demo_camera;

mod common;

const SIZE: u32 = 64;

#[test]
fn should_see_the_red_sphere_in_the_centre() {
    let scene = Scene::demo(None).expect("demo scene is valid");
    let image = render(&scene, &demo_camera(SIZE, SIZE), SIZE, SIZE).expect("valid scene");

    let [r, g, b, a] = image.get_pixel(SIZE / 2, SIZE / 2).0;
    assert_eq!(a, 255);
    assert!(r > 76, "centre should be lit red, got {:?}", [r, g, b]);
    assert_eq!((g, b), (0, 0));
}

#[test]
fn should_see_the_green_backdrop_in_the_top_left_corner() {
    let scene = Scene::demo(None).expect("demo scene is valid");
    let image = render(&scene, &demo_camera(SIZE, SIZE), SIZE, SIZE).expect("valid scene");

    let [r, g, b, _] = image.get_pixel(0, 0).0;
    assert!(g > r && g > b, "expected the green plane, got {:?}", [r, g, b]);
}

#[test]
fn should_show_the_background_when_nothing_is_hit() {
    let image = render(&Scene::new(), &demo_camera(8, 8), 8, 8).expect("valid scene");
    let expected = BACKGROUND.map(trace_ngin::raytrace::hit::to_unorm);
    for pixel in image.pixels() {
        assert_eq!(pixel.0[..3], expected);
    }
}
