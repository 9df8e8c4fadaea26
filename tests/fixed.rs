extern crate cc3;
#[macro_use]
extern crate approx;

use cc3::driver::consts as c;
use cc3::driver::headless::HeadlessProbe;
use cc3::prelude::*;
use cc3::scene::mesh;
use cc3::scene::Skin;

fn context(probe: &HeadlessProbe) -> GLContext {
    let mut settings = Settings::default();
    settings.pipeline = Pipeline::Fixed;
    GLContext::new(Box::new(probe.clone()), settings).unwrap()
}

fn camera(height: f32) -> Camera {
    let mut camera = Camera::orthographic(height, [0, 0, 16, 16], 0.1, 10.0);
    camera.look_at(
        Point3::new(0.0, 0.0, 5.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );
    camera
}

fn lit_scene() -> BasicScene {
    let mut scene = BasicScene::new();
    scene.add_camera(camera(1.0));
    scene.add_light(Light::directional(Vector3::new(0.0, 0.0, -1.0)));

    let quad = scene.add_mesh(mesh::quad("quad", 2.0, 2.0).unwrap());
    let mut material = Material::new("lit");
    material.ambient = Color::black();
    material.diffuse = Color::new(0.0, 0.5, 0.0, 1.0);
    material.emission = Color::new(0.5, 0.0, 0.0, 1.0);

    let material = scene.add_material(material);
    scene.add_drawable("quad", None, quad, material).unwrap();
    scene
}

#[test]
fn lit_quad() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let mut scene = lit_scene();

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.draw_calls, 1);

    assert!(probe.enabled(c::LIGHTING));
    assert!(probe.enabled(c::LIGHT0));
    assert!(!probe.enabled(c::LIGHT0 + 1));
    assert_eq!(probe.current_program(), 0);

    // Emission plus the diffuse light.
    assert_eq!(probe.pixel(8, 8), [128, 128, 0, 255]);
}

#[test]
fn disabled_lights_leave_emission() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let mut scene = lit_scene();
    scene.add_light(Light::point(Vector3::new(0.0, 0.0, 2.0)));
    scene.light_mut(0).unwrap().enabled = false;
    scene.light_mut(1).unwrap().enabled = false;

    ctx.render_frame(&mut scene, 0.016).unwrap();

    // Without enabled lights the material is drawn unlit.
    assert!(!probe.enabled(c::LIGHTING));
    assert!(!probe.enabled(c::LIGHT0));
    assert_eq!(probe.pixel(8, 8), [255, 255, 255, 255]);
}

#[test]
fn fog() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let mut scene = lit_scene();
    scene.set_fog(Fog {
        color: Color::gray(),
        mode: FogMode::Linear,
        density: 1.0,
        start: 1.0,
        end: 10.0,
    });

    ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(probe.enabled(c::FOG));
    assert_eq!(probe.param(c::FOG_MODE), vec![f64::from(c::LINEAR)]);
    assert_eq!(probe.param(c::FOG_START), vec![1.0]);
    assert_eq!(probe.param(c::FOG_END), vec![10.0]);

    scene.set_fog(None);
    ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(!probe.enabled(c::FOG));
}

#[test]
fn picking() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);

    let mut scene = BasicScene::new();
    scene.add_camera(camera(4.0));
    scene.add_light(Light::default());

    let quad = scene.add_mesh(mesh::quad("quad", 1.0, 1.0).unwrap());
    let material = scene.add_material(Material::new("default"));

    let left = scene.add_drawable("left", None, quad, material).unwrap();
    let right = scene.add_drawable("right", None, quad, material).unwrap();

    let node = scene.drawable(left).unwrap().node;
    scene.graph.set_position(node, Vector3::new(-1.0, 0.0, 0.0));
    let node = scene.drawable(right).unwrap().node;
    scene.graph.set_position(node, Vector3::new(1.0, 0.0, 0.0));

    scene.pick_at([4, 8]);
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.picked, Some(left));

    scene.pick_at([12, 8]);
    assert_eq!(ctx.render_frame(&mut scene, 0.016).unwrap().picked, Some(right));

    scene.pick_at([8, 2]);
    assert_eq!(ctx.render_frame(&mut scene, 0.016).unwrap().picked, None);
}

#[test]
fn palettes() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);

    let mut scene = BasicScene::new();
    scene.add_camera(camera(1.0));

    let skinned = Mesh::build("skinned", Primitive::Triangles)
        .positions(&[[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]])
        .bones(1, vec![1.0; 3], vec![0.0; 3])
        .finish()
        .unwrap();

    let mesh = scene.add_mesh(skinned);
    let material = scene.add_material(Material::unlit("skin", Color::white()));
    let index = scene.add_drawable("skinned", None, mesh, material).unwrap();

    let bone = scene.graph.create("bone");
    scene.graph.set_position(bone, Vector3::new(0.0, 1.0, 0.0));
    scene.drawable_mut(index).unwrap().skin = Some(Skin {
        bones: vec![bone],
        inverse_bind: vec![Matrix4::identity()],
    });

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(report.is_clean());
    assert!(probe.enabled(c::MATRIX_PALETTE));

    // Bones are loaded in eye space.
    let expected: [f32; 16] = mat::to_array(&Matrix4::from_translation(Vector3::new(0.0, 1.0, -5.0)));
    for (a, b) in probe.palette_matrix(0).iter().zip(expected.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-5);
    }
}
