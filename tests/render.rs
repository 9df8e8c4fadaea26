extern crate cc3;
extern crate env_logger;

use cc3::driver::consts as c;
use cc3::driver::headless::HeadlessProbe;
use cc3::prelude::*;
use cc3::scene::mesh;

const RED_FRAGMENT: &str = "void main() { gl_FragColor = vec4(1.0, 0.0, 0.0, 1.0); }";

const TIMED_VERTEX: &str = "
attribute highp vec4 a_cc3Position;
uniform highp mat4 u_cc3MatrixModelViewProj;
uniform float u_cc3ElapsedTime;
uniform float u_cc3FrameTime;

void main() {
    gl_Position = u_cc3MatrixModelViewProj * a_cc3Position;
}
";

fn context(probe: &HeadlessProbe) -> GLContext {
    let _ = env_logger::try_init();
    GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap()
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

fn red_quad_scene(ctx: &mut GLContext) -> BasicScene {
    ctx.shaders()
        .add_source(ShaderSource::fragment("red.frag", RED_FRAGMENT));

    let mut scene = BasicScene::new();
    scene.add_camera(camera(1.0));

    let quad = scene.add_mesh(mesh::quad("quad", 2.0, 2.0).unwrap());
    let mut material = Material::unlit("red", Color::white());
    material.program = Some(("cc3-basic.vert".into(), "red.frag".into()));

    let material = scene.add_material(material);
    scene.add_drawable("quad", None, quad, material).unwrap();
    scene
}

#[test]
fn clear_and_quad() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let mut scene = red_quad_scene(&mut ctx);

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.draw_calls, 1);
    assert_eq!(report.faces, 2);
    assert_eq!(report.nodes_drawn, 1);
    assert_eq!(report.picked, None);

    assert_eq!(probe.draws(), 1);
    assert_eq!(probe.pixel(8, 8), [255, 0, 0, 255]);
}

#[test]
fn background_is_cleared() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);

    let mut scene = BasicScene::new();
    let mut camera = camera(1.0);
    camera.clear_color = Some(Color::new(0.0, 0.0, 1.0, 1.0));
    scene.add_camera(camera);

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.draw_calls, 0);
    assert_eq!(probe.pixel(0, 0), [0, 0, 255, 255]);
}

#[test]
fn stats_accumulate() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let mut scene = red_quad_scene(&mut ctx);

    for _ in 0..3 {
        ctx.render_frame(&mut scene, 0.5).unwrap();
    }

    let stats = ctx.stats();
    assert_eq!(stats.frames_handled(), 3);
    assert_eq!(stats.updates_handled(), 3);
    assert_eq!(stats.drawing_calls_made(), 3);
    assert_eq!(stats.faces_presented(), 6);
    assert_eq!(stats.nodes_visited_for_drawing(), 3);
    assert_eq!(stats.nodes_drawn(), 3);
    assert!((stats.frame_rate() - 2.0).abs() < 1e-4);

    ctx.stats_mut().reset();
    assert_eq!(ctx.stats().frames_handled(), 0);
}

#[test]
fn elapsed_time_uniform() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    ctx.shaders()
        .add_source(ShaderSource::vertex("timed.vert", TIMED_VERTEX));

    let mut scene = red_quad_scene(&mut ctx);
    scene.material_mut(MaterialId(0)).unwrap().program =
        Some(("timed.vert".into(), "red.frag".into()));

    ctx.render_frame(&mut scene, 0.5).unwrap();
    ctx.render_frame(&mut scene, 0.75).unwrap();

    let program = ctx
        .frame(0.0, |frame| frame.shaders.program(frame.cache, "timed.vert", "red.frag"))
        .unwrap()
        .id();

    assert_eq!(probe.uniform(program, "u_cc3ElapsedTime"), Some(vec![1.25]));
    assert_eq!(probe.uniform(program, "u_cc3FrameTime"), Some(vec![0.75]));
}

#[test]
fn picking() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);

    let mut scene = BasicScene::new();
    scene.add_camera(camera(4.0));

    let quad = scene.add_mesh(mesh::quad("quad", 1.0, 1.0).unwrap());
    let material = scene.add_material(Material::unlit("white", Color::white()));

    let left = scene.add_drawable("left", None, quad, material).unwrap();
    let right = scene.add_drawable("right", None, quad, material).unwrap();

    let node = scene.drawable(left).unwrap().node;
    scene.graph.set_position(node, Vector3::new(-1.0, 0.0, 0.0));
    let node = scene.drawable(right).unwrap().node;
    scene.graph.set_position(node, Vector3::new(1.0, 0.0, 0.0));

    scene.pick_at([12, 8]);
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.picked, Some(right));
    assert_eq!(scene.last_picked(), Some(right));

    // Pick passes are not counted as drawn nodes.
    assert_eq!(report.nodes_drawn, 2);
    assert_eq!(report.draw_calls, 4);

    scene.pick_at([4, 8]);
    assert_eq!(ctx.render_frame(&mut scene, 0.016).unwrap().picked, Some(left));

    scene.pick_at([8, 15]);
    assert_eq!(ctx.render_frame(&mut scene, 0.016).unwrap().picked, None);

    // The visible pass is drawn on the default framebuffer, after the pick pass.
    assert_eq!(probe.pixel(4, 8), [255, 255, 255, 255]);
    assert_eq!(probe.pixel(8, 15), [0, 0, 0, 255]);
}

fn pair_scene() -> (BasicScene, usize, usize) {
    let mut scene = BasicScene::new();
    scene.add_camera(camera(4.0));

    let quad = scene.add_mesh(mesh::quad("quad", 1.0, 1.0).unwrap());
    let material = scene.add_material(Material::unlit("white", Color::white()));

    let left = scene.add_drawable("left", None, quad, material).unwrap();
    let right = scene.add_drawable("right", None, quad, material).unwrap();

    let node = scene.drawable(left).unwrap().node;
    scene.graph.set_position(node, Vector3::new(-1.0, 0.0, 0.0));
    let node = scene.drawable(right).unwrap().node;
    scene.graph.set_position(node, Vector3::new(1.0, 0.0, 0.0));

    (scene, left, right)
}

#[test]
fn picking_keeps_host_framebuffer() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let (mut scene, _, right) = pair_scene();

    let mut host = probe.clone();
    let fbo = host.gen_framebuffer();
    let color = host.gen_renderbuffer();
    host.bind_renderbuffer(c::RENDERBUFFER, color);
    host.renderbuffer_storage(c::RGBA8, 16, 16);
    host.bind_framebuffer(c::FRAMEBUFFER, fbo);
    host.framebuffer_renderbuffer(c::COLOR_ATTACHMENT0, color);
    assert!(fbo != 0);

    scene.pick_at([12, 8]);
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.picked, Some(right));
    assert_eq!(probe.param(c::FRAMEBUFFER_BINDING), vec![f64::from(fbo)]);

    // Again, with the pick framebuffer already created.
    scene.pick_at([12, 8]);
    assert_eq!(ctx.render_frame(&mut scene, 0.016).unwrap().picked, Some(right));
    assert_eq!(probe.param(c::FRAMEBUFFER_BINDING), vec![f64::from(fbo)]);
}

#[test]
fn uncached_companions_link_once_per_pass() {
    let _ = env_logger::try_init();

    let probe = HeadlessProbe::new(16, 16);
    let mut settings = Settings::default();
    settings.should_cache_picking_shaders = false;
    let mut ctx = GLContext::new(Box::new(probe.clone()), settings).unwrap();
    let (mut scene, left, _) = pair_scene();

    ctx.render_frame(&mut scene, 0.016).unwrap();
    let links = probe.calls("glLinkProgram");

    scene.pick_at([4, 8]);
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.picked, Some(left));
    assert_eq!(probe.calls("glLinkProgram"), links + 1);

    // Dropped after the pass, and linked anew for the next one.
    scene.pick_at([4, 8]);
    ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(probe.calls("glLinkProgram"), links + 2);
}

#[test]
fn effect_textures() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);

    ctx.shaders().add_source(ShaderSource::vertex(
        "glow.vert",
        "attribute vec4 pos; uniform mat4 mvp; void main() { gl_Position = mvp * pos; }",
    ));
    ctx.shaders().add_source(ShaderSource::fragment(
        "glow.frag",
        "void main() { gl_FragColor = vec4(1.0, 1.0, 1.0, 1.0); }",
    ));
    ctx.shaders().register_effect(
        Effect::from_json(
            r#"{
                "name": "glow",
                "vertex_shader": "glow.vert",
                "fragment_shader": "glow.frag",
                "textures": [
                    { "unit": 0, "name": "base.png" },
                    { "unit": 1, "name": "glow.png" },
                    { "unit": 2, "name": "absent.png" }
                ],
                "variables": [
                    { "name": "pos", "type": "vec4", "semantic": "VertexLocation" },
                    { "name": "mvp", "type": "mat4", "semantic": "ModelViewProjMatrix" }
                ]
            }"#,
        )
        .unwrap(),
    );

    let mut scene = BasicScene::new();
    scene.add_camera(camera(1.0));
    scene.add_texture(Texture::solid("base.png", Color::new(0.0, 0.0, 1.0, 1.0)));
    scene.add_texture(Texture::solid("glow.png", Color::new(0.0, 1.0, 0.0, 1.0)));

    let quad = scene.add_mesh(mesh::quad("quad", 2.0, 2.0).unwrap());
    let mut material = Material::unlit("glowing", Color::white());
    material.effect = Some("glow".into());
    let material = scene.add_material(material);
    scene.add_drawable("quad", None, quad, material).unwrap();

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.draw_calls, 1);
    assert_eq!(probe.bound_texel(0), Some([0, 0, 255, 255]));
    assert_eq!(probe.bound_texel(1), Some([0, 255, 0, 255]));

    // Undeclared names are reported, and drawn with the stand-in texture.
    assert_eq!(report.errors.len(), 1);
    match report.errors[0] {
        Error::ResourceNotFound(_) => {}
        ref other => panic!("unexpected {}", other),
    }
    assert_eq!(probe.bound_texel(2), Some([255, 0, 255, 255]));

    // Material textures take precedence over declared ones.
    let red = scene.add_texture(Texture::solid("red.png", Color::new(1.0, 0.0, 0.0, 1.0)));
    scene.material_mut(material).unwrap().textures.push(red);

    ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(probe.bound_texel(0), Some([255, 0, 0, 255]));
    assert_eq!(probe.bound_texel(1), Some([0, 255, 0, 255]));
}

#[test]
fn context_lost() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let mut scene = red_quad_scene(&mut ctx);

    ctx.render_frame(&mut scene, 0.016).unwrap();
    probe.lose_context();

    match ctx.render_frame(&mut scene, 0.016) {
        Err(Error::ContextLost) => {}
        other => panic!("expected a lost context, got {:?}", other),
    }

    assert_eq!(ctx.state(), cc3::ContextState::Failed);

    // Later frames are skipped without touching the driver.
    let calls = probe.total_calls();
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.draw_calls, 0);
    assert_eq!(probe.total_calls(), calls);

    let fresh = HeadlessProbe::new(16, 16);
    ctx.reset_with(Box::new(fresh.clone())).unwrap();
    ctx.shaders()
        .add_source(ShaderSource::fragment("red.frag", RED_FRAGMENT));

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.draw_calls, 1);
    assert_eq!(fresh.pixel(8, 8), [255, 0, 0, 255]);
}

#[test]
fn platform_unsupported() {
    let probe = HeadlessProbe::new(4, 4).with_strings("OpenGL ES-CM 1.1", "");

    match GLContext::new(Box::new(probe), Settings::default()) {
        Err(Error::PlatformUnsupported(_)) => {}
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("a fixed-function platform created a programmable context"),
    }
}

#[test]
fn terminate_releases_everything() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = context(&probe);
    let mut scene = red_quad_scene(&mut ctx);

    scene.pick_at([8, 8]);
    ctx.render_frame(&mut scene, 0.016).unwrap();
    assert!(probe.live_objects() > 0);

    ctx.terminate().unwrap();
    assert_eq!(probe.live_objects(), 0);
}
