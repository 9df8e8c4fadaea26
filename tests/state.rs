extern crate cc3;

use cc3::driver::consts as c;
use cc3::driver::headless::HeadlessProbe;
use cc3::prelude::*;
use cc3::render::Frame;
use cc3::scene::mesh;
use cc3::state::AttribPointer;

fn context(probe: &HeadlessProbe) -> GLContext {
    GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap()
}

fn quad_scene(program: (&str, &str)) -> BasicScene {
    let mut camera = Camera::orthographic(1.0, [0, 0, 8, 8], 0.1, 10.0);
    camera.look_at(
        Point3::new(0.0, 0.0, 5.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );

    let mut scene = BasicScene::new();
    scene.add_camera(camera);

    let quad = scene.add_mesh(mesh::quad("quad", 2.0, 2.0).unwrap());
    let mut material = Material::unlit("plain", Color::white());
    material.program = Some((program.0.into(), program.1.into()));

    let material = scene.add_material(material);
    scene.add_drawable("quad", None, quad, material).unwrap();
    scene
}

#[test]
fn redundant_writes_are_elided() {
    let probe = HeadlessProbe::new(4, 4);
    let mut ctx = context(&probe);

    probe.reset_calls();
    ctx.frame(0.0, |frame| {
        for _ in 0..3 {
            frame.cache.set_capability(Capability::Blend, true)?;
        }

        for _ in 0..2 {
            frame.cache.write(Slot::ClearColor, Color::gray())?;
        }

        assert_eq!(frame.cache.applied(Slot::Capability(Capability::Blend)), 1);
        Ok(())
    })
    .unwrap();

    assert_eq!(probe.calls("glEnable"), 1);
    assert_eq!(probe.calls("glClearColor"), 1);

    // Restored at the end of the frame, since blending was off before.
    assert_eq!(probe.calls("glDisable"), 1);
    assert!(!probe.enabled(c::BLEND));
}

#[test]
fn host_state_is_restored() {
    let probe = HeadlessProbe::new(8, 8);
    let mut host = probe.clone();
    host.disable(c::DEPTH_TEST);
    host.enable(c::BLEND);
    host.disable(c::CULL_FACE);

    let mut ctx = context(&probe);
    let mut scene = quad_scene(("cc3-basic.vert", "cc3-no-texture.frag"));

    for _ in 0..2 {
        let report = ctx.render_frame(&mut scene, 0.016).unwrap();
        assert!(report.is_clean());

        assert!(!probe.enabled(c::DEPTH_TEST));
        assert!(probe.enabled(c::BLEND));
        assert!(!probe.enabled(c::CULL_FACE));
        assert_eq!(probe.current_program(), 0);
    }
}

#[test]
fn uniform_overrides() {
    let probe = HeadlessProbe::new(8, 8);
    let mut ctx = context(&probe);
    let mut scene = quad_scene(("cc3-basic.vert", "cc3-pure-color.frag"));

    let program = ctx
        .frame(0.0, |frame| {
            frame
                .shaders
                .program(frame.cache, "cc3-basic.vert", "cc3-pure-color.frag")
        })
        .unwrap();

    let green = [0.0, 1.0, 0.0, 1.0];
    program
        .set_uniform("u_cc3Color", UniformValue::vec4(green))
        .unwrap();
    assert!(program
        .set_uniform("u_cc3Missing", UniformValue::float(1.0))
        .is_err());

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(report.is_clean());
    assert_eq!(probe.pixel(4, 4), [0, 255, 0, 255]);
    assert_eq!(probe.uniform(program.id(), "u_cc3Color"), Some(green.to_vec()));

    let location = program.uniform("u_cc3Color").unwrap().location;
    assert_eq!(
        ctx.cache().read_uniform(program.id(), location),
        Some(&UniformValue::vec4(green))
    );

    // Without the override the semantic applies again: the diffuse color of the material.
    assert!(program.clear_uniform("u_cc3Color"));
    ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(probe.pixel(4, 4), [255, 255, 255, 255]);
}

#[test]
fn unbound_attributes_are_disabled() {
    let probe = HeadlessProbe::new(4, 4);
    let mut ctx = context(&probe);

    ctx.frame(0.0, |frame| {
        let buffer = frame.binder.generate_buffer(frame.cache)?;
        frame.binder.load_buffer_data(
            frame.cache,
            BufferTarget::Array,
            buffer,
            &[0; 96],
            BufferUsage::Static,
        )?;

        let pointer = AttribPointer {
            buffer,
            size: 3,
            ty: c::FLOAT,
            normalized: false,
            stride: 12,
            offset: 0,
        };

        frame.binder.clear_bound_flags();
        frame.binder.bind_attribute(frame.cache, 0, pointer)?;
        frame.binder.bind_attribute(frame.cache, 3, pointer)?;
        frame.binder.disable_unbound_vertex_pointers(frame.cache)?;
        assert_eq!(probe.enabled_attribs(), vec![0, 3]);

        frame.binder.clear_bound_flags();
        frame.binder.bind_attribute(frame.cache, 0, pointer)?;
        frame.binder.disable_unbound_vertex_pointers(frame.cache)?;
        assert_eq!(probe.enabled_attribs(), vec![0]);

        frame.binder.delete_buffer(frame.cache, buffer)
    })
    .unwrap();

    assert!(probe.enabled_attribs().is_empty());
}

#[test]
fn invalidate_reapplies() {
    let probe = HeadlessProbe::new(4, 4);
    let mut ctx = context(&probe);

    fn gray(frame: &mut Frame) -> Result<()> {
        frame.cache.write(Slot::ClearColor, Color::gray())
    }

    ctx.frame(0.0, gray).unwrap();
    probe.reset_calls();

    ctx.frame(0.0, gray).unwrap();
    assert_eq!(probe.calls("glClearColor"), 0);

    // The host touched GL behind the cache.
    ctx.cache().invalidate();
    ctx.frame(0.0, gray).unwrap();
    assert_eq!(probe.calls("glClearColor"), 1);
}
