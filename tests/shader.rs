extern crate cc3;
extern crate env_logger;

use cc3::driver::headless::HeadlessProbe;
use cc3::prelude::*;
use cc3::shader::source::{BASIC_VERTEX, NO_TEXTURE_FRAGMENT, SKINNED_VERTEX};

#[test]
fn companion_layout() {
    let probe = HeadlessProbe::new(4, 4);
    let mut ctx = GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap();

    for vs in &[BASIC_VERTEX, SKINNED_VERTEX] {
        let (program, companion) = ctx
            .frame(0.0, |frame| {
                let program = frame.shaders.program(frame.cache, vs, NO_TEXTURE_FRAGMENT)?;
                let companion = frame.shaders.pure_color_program(frame.cache, &program)?;
                Ok((program, companion))
            })
            .unwrap();

        assert_ne!(program.id(), companion.id());
        assert_eq!(companion.attribute_layout(), program.attribute_layout());
        assert_eq!(probe.attrib_layout(companion.id()), probe.attrib_layout(program.id()));
        assert!(companion.uniform("u_cc3Color").is_some());
    }
}

#[test]
fn programs_are_shared() {
    let probe = HeadlessProbe::new(4, 4);
    let mut ctx = GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap();

    let (a, b) = ctx
        .frame(0.0, |frame| {
            let a = frame.shaders.program(frame.cache, BASIC_VERTEX, NO_TEXTURE_FRAGMENT)?;
            let b = frame.shaders.program(frame.cache, BASIC_VERTEX, NO_TEXTURE_FRAGMENT)?;
            Ok((a, b))
        })
        .unwrap();

    assert_eq!(a.id(), b.id());
    assert_eq!(probe.live_programs(), 1);
}

#[test]
fn compile_errors_are_recovered() {
    let _ = env_logger::try_init();

    let probe = HeadlessProbe::new(8, 8);
    let mut ctx = GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap();
    ctx.shaders()
        .add_source(ShaderSource::fragment("broken.frag", "void main() { gl_FragColor = ; "));

    let mut scene = BasicScene::new();
    let mut camera = Camera::orthographic(1.0, [0, 0, 8, 8], 0.1, 10.0);
    camera.look_at(
        Point3::new(0.0, 0.0, 5.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );
    scene.add_camera(camera);

    let quad = scene.add_mesh(cc3::scene::mesh::quad("quad", 2.0, 2.0).unwrap());
    let mut material = Material::unlit("broken", Color::white());
    material.program = Some((BASIC_VERTEX.into(), "broken.frag".into()));
    let material = scene.add_material(material);
    scene.add_drawable("quad", None, quad, material).unwrap();

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.errors.len(), 1);
    match report.errors[0] {
        Error::ShaderCompileFailed { ref name, .. } => assert_eq!(name, "broken.frag"),
        ref other => panic!("unexpected {}", other),
    }

    // Drawn anyway, in magenta.
    assert_eq!(report.draw_calls, 1);
    assert_eq!(probe.pixel(4, 4), [255, 0, 255, 255]);
}
