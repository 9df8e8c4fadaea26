extern crate cc3;
#[macro_use]
extern crate approx;

use cc3::driver::headless::HeadlessProbe;
use cc3::prelude::*;
use cc3::scene::mesh;

fn scene() -> (BasicScene, usize, usize) {
    let mut camera = Camera::orthographic(4.0, [0, 0, 16, 16], 0.1, 10.0);
    camera.look_at(
        Point3::new(0.0, 0.0, 5.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );

    let mut scene = BasicScene::new();
    scene.add_camera(camera);

    let quad = scene.add_mesh(mesh::quad("quad", 1.0, 1.0).unwrap());
    let material = scene.add_material(Material::unlit("white", Color::white()));

    let parent = scene.add_drawable("parent", None, quad, material).unwrap();
    let node = scene.drawable(parent).unwrap().node;
    let child = scene.add_drawable("child", Some(node), quad, material).unwrap();

    scene.graph.set_position(node, Vector3::new(-1.0, 0.0, 0.0));
    let node = scene.drawable(child).unwrap().node;
    scene.graph.set_position(node, Vector3::new(2.0, 0.0, 0.0));

    (scene, parent, child)
}

#[test]
fn children_follow_parents() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap();
    let (mut scene, parent, child) = scene();

    scene.pick_at([12, 8]);
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.picked, Some(child));
    assert_eq!(ctx.stats().nodes_transformed(), 2);

    let node = scene.drawable(child).unwrap().node;
    let p = scene.world_transform(node) * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert_ulps_eq!(p, Vector4::new(1.0, 0.0, 0.0, 1.0));

    // Moving the parent carries the child along.
    let node = scene.drawable(parent).unwrap().node;
    scene.graph.translate(node, Vector3::new(0.0, 1.0, 0.0));

    scene.pick_at([12, 12]);
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.picked, Some(child));
    assert_eq!(ctx.stats().nodes_transformed(), 4);

    // Nothing moved.
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(ctx.stats().nodes_transformed(), 4);
    assert_eq!(report.nodes_drawn, 2);
}

#[test]
fn hidden_drawables_are_skipped() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap();
    let (mut scene, parent, child) = scene();

    scene.drawable_mut(parent).unwrap().visible = false;
    scene.pick_at([4, 8]);

    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.picked, None);
    assert_eq!(report.nodes_drawn, 1);
    assert_eq!(report.draw_calls, 2);

    assert_eq!(probe.pixel(4, 8), [0, 0, 0, 255]);
    assert_eq!(probe.pixel(12, 8), [255, 255, 255, 255]);
    assert!(scene.drawable(child).unwrap().visible);
}

#[test]
fn removing_a_parent_removes_children() {
    let probe = HeadlessProbe::new(16, 16);
    let mut ctx = GLContext::new(Box::new(probe.clone()), Settings::default()).unwrap();
    let (mut scene, parent, _) = scene();

    ctx.render_frame(&mut scene, 0.016).unwrap();
    scene.remove_drawable(parent).unwrap();
    assert!(scene.drawables().is_empty());
    assert!(scene.graph.find("child").is_none());

    ctx.stats_mut().reset();
    let report = ctx.render_frame(&mut scene, 0.016).unwrap();
    assert_eq!(report.draw_calls, 0);
    assert_eq!(ctx.stats().nodes_visited_for_drawing(), 0);
}
