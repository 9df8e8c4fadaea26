extern crate cc3;
#[macro_use]
extern crate approx;

use cc3::driver::consts as c;
use cc3::driver::headless::HeadlessProbe;
use cc3::matrix::MatrixBase;
use cc3::prelude::*;

fn context(probe: &HeadlessProbe, pipeline: Pipeline) -> GLContext {
    let mut settings = Settings::default();
    settings.pipeline = pipeline;
    settings.modelview_stack_depth = 3;
    GLContext::new(Box::new(probe.clone()), settings).unwrap()
}

fn transform() -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0))
        * Matrix4::from_angle_y(Deg(30.0))
        * Matrix4::from_nonuniform_scale(2.0, 1.0, 0.5)
}

fn push_and_pop(pipeline: Pipeline) {
    let probe = HeadlessProbe::new(4, 4);
    let mut ctx = context(&probe, pipeline);
    let base = transform();

    ctx.frame(0.0, |frame| {
        let m = &mut *frame.matrices;
        m.load(frame.cache, MatrixMode::ModelView, &base)?;
        m.push(frame.cache, MatrixMode::ModelView)?;
        m.multiply(
            frame.cache,
            MatrixMode::ModelView,
            &Matrix4::from_scale(3.0),
        )?;

        assert_relative_eq!(
            *m.top(MatrixMode::ModelView).unwrap(),
            base * Matrix4::from_scale(3.0),
            epsilon = 1e-5
        );
        assert_eq!(m.depth(MatrixMode::ModelView), Some(2));

        m.pop(frame.cache, MatrixMode::ModelView)?;
        assert_relative_eq!(*m.top(MatrixMode::ModelView).unwrap(), base, epsilon = 1e-5);

        match m.pop(frame.cache, MatrixMode::ModelView) {
            Err(Error::StackUnderflow { mode }) => assert_eq!(mode, MatrixMode::ModelView),
            other => panic!("expected an underflow, got {:?}", other),
        }

        Ok(())
    })
    .unwrap();

    if pipeline == Pipeline::Fixed {
        // The driver stack follows the host stack.
        let top: [f32; 16] = mat::to_array(&base);
        for (a, b) in probe.matrix(c::MODELVIEW).iter().zip(top.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }

        assert_eq!(probe.matrix_depth(c::MODELVIEW), 1);
    }
}

#[test]
fn push_and_pop_programmable() {
    push_and_pop(Pipeline::Programmable);
}

#[test]
fn push_and_pop_fixed() {
    push_and_pop(Pipeline::Fixed);
}

#[test]
fn overflow() {
    for &pipeline in &[Pipeline::Programmable, Pipeline::Fixed] {
        let probe = HeadlessProbe::new(4, 4);
        let mut ctx = context(&probe, pipeline);

        ctx.frame(0.0, |frame| {
            for _ in 0..3 {
                frame.matrices.push(frame.cache, MatrixMode::ModelView)?;
            }

            match frame.matrices.push(frame.cache, MatrixMode::ModelView) {
                Err(Error::StackOverflow { mode, depth }) => {
                    assert_eq!(mode, MatrixMode::ModelView);
                    assert_eq!(depth, 4);
                }
                other => panic!("expected an overflow, got {:?}", other),
            }

            // The failed push left the stack alone.
            assert_eq!(frame.matrices.depth(MatrixMode::ModelView), Some(4));
            Ok(())
        })
        .unwrap();

        if pipeline == Pipeline::Fixed {
            assert_eq!(probe.matrix_depth(c::MODELVIEW), 4);
        }
    }
}

#[test]
fn inverse_transpose() {
    let probe = HeadlessProbe::new(4, 4);
    let mut ctx = context(&probe, Pipeline::Programmable);

    let view = Matrix4::look_at(
        Point3::new(0.0, 2.0, 5.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );
    let model = transform();

    ctx.frame(0.0, |frame| {
        let m = &mut *frame.matrices;
        m.load_view(frame.cache, &view)?;
        m.load_model(frame.cache, &model)?;

        let modelview = view * model;
        let expected = modelview.invert().unwrap().transpose();

        let v = *m.matrix_for(MatrixSemantic::inverse_transpose(MatrixBase::ModelView));
        assert_relative_eq!(v, expected, epsilon = 1e-4);

        let v = *m.matrix_for(MatrixSemantic::inverse(MatrixBase::Model));
        assert_relative_eq!(v * model, Matrix4::identity(), epsilon = 1e-4);

        // Memoized until the modelview changes.
        assert!(m.is_memoized(MatrixSemantic::inverse_transpose(MatrixBase::ModelView)));
        m.load_model(frame.cache, &Matrix4::identity())?;
        assert!(!m.is_memoized(MatrixSemantic::inverse_transpose(MatrixBase::ModelView)));

        let v = *m.matrix_for(MatrixSemantic::plain(MatrixBase::ModelViewProjection));
        assert_relative_eq!(v, view, epsilon = 1e-5);
        Ok(())
    })
    .unwrap();
}
