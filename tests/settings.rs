extern crate cc3;

use cc3::driver::consts as c;
use cc3::driver::headless::HeadlessProbe;
use cc3::prelude::*;

#[test]
fn policies_from_json() {
    let settings = Settings::from_json(
        r#"{
            "error_logging": "on_every_call",
            "policies": [["ClearColor", "ReadOnceAndRestore"]]
        }"#,
    )
    .unwrap();

    let probe = HeadlessProbe::new(4, 4);
    let mut host = probe.clone();
    host.clear_color(0.5, 0.25, 0.0, 1.0);

    let mut ctx = GLContext::new(Box::new(probe.clone()), settings).unwrap();
    ctx.frame(0.0, |frame| {
        frame.cache.write(Slot::ClearColor, Color::black())?;
        frame.cache.driver().clear(c::COLOR_BUFFER_BIT);
        frame.cache.after_call("glClear")
    })
    .unwrap();

    // Cleared with black, then handed back to the host with its own clear color.
    assert_eq!(probe.pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(probe.param(c::COLOR_CLEAR_VALUE), vec![0.5, 0.25, 0.0, 1.0]);
}

#[test]
fn limits_are_clamped() {
    let mut settings = Settings::default();
    settings.pipeline = Pipeline::Fixed;
    settings.max_lights = 1000;
    settings.max_palette_matrices = 1000;

    let probe = HeadlessProbe::new(4, 4);
    let ctx = GLContext::new(Box::new(probe), settings).unwrap();

    let caps = ctx.capabilities();
    assert_eq!(ctx.settings().max_lights, caps.max_lights);
    assert_eq!(ctx.settings().max_palette_matrices, caps.max_palette_matrices);
    assert!(caps.max_lights >= 8);
}

#[test]
fn invalid_settings_are_rejected() {
    let mut settings = Settings::default();
    settings.projection_stack_depth = 0;

    match GLContext::new(Box::new(HeadlessProbe::new(4, 4)), settings) {
        Err(Error::InvalidSettings(_)) => {}
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("a zero stack depth was accepted"),
    }
}
