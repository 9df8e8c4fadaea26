use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};

use super::backend::{FixedBackend, MatrixBackend, ProgrammableBackend, StackOp};
use super::stack::MatrixStack;
use super::{MatrixBase, MatrixMode, MatrixSemantic};
use crate::errors::*;
use crate::math::matrix as mat;
use crate::settings::{Pipeline, Settings};
use crate::state::StateCache;

#[inline]
fn bits(base: MatrixBase) -> u32 {
    0b111 << (base as u32 * 3)
}

/// Owns the matrix stacks, and derives the composite matrices shaders ask for.
///
/// Derived matrices are computed on first use and memoized until one of their inputs
/// changes. Every write clears the validity bits of the matrices that depend on it.
pub struct MatrixSystem {
    backend: Box<dyn MatrixBackend>,

    modelview: MatrixStack,
    projection: MatrixStack,
    textures: Vec<MatrixStack>,
    palettes: Vec<MatrixStack>,

    view: Matrix4<f32>,
    model_local: Matrix4<f32>,

    derived: [Matrix4<f32>; 21],
    valid: u32,
}

impl MatrixSystem {
    pub fn new(settings: &Settings, texture_units: usize) -> Self {
        let backend: Box<dyn MatrixBackend> = match settings.pipeline {
            Pipeline::Fixed => Box::new(FixedBackend),
            Pipeline::Programmable => Box::new(ProgrammableBackend),
        };

        let textures = (0..texture_units)
            .map(|i| MatrixStack::new(MatrixMode::Texture(i as u8), settings.texture_stack_depth))
            .collect();

        let palettes = (0..settings.max_palette_matrices)
            .map(|i| MatrixStack::new(MatrixMode::Palette(i as u8), settings.palette_stack_depth))
            .collect();

        MatrixSystem {
            backend,
            modelview: MatrixStack::new(MatrixMode::ModelView, settings.modelview_stack_depth),
            projection: MatrixStack::new(MatrixMode::Projection, settings.projection_stack_depth),
            textures,
            palettes,
            view: Matrix4::identity(),
            model_local: Matrix4::identity(),
            derived: [Matrix4::identity(); 21],
            valid: 0,
        }
    }

    #[inline]
    pub fn is_fixed_function(&self) -> bool {
        self.backend.is_fixed_function()
    }

    pub fn stack(&self, mode: MatrixMode) -> Option<&MatrixStack> {
        match mode {
            MatrixMode::ModelView => Some(&self.modelview),
            MatrixMode::Projection => Some(&self.projection),
            MatrixMode::Texture(unit) => self.textures.get(unit as usize),
            MatrixMode::Palette(index) => self.palettes.get(index as usize),
        }
    }

    fn stack_mut(&mut self, mode: MatrixMode) -> Result<&mut MatrixStack> {
        let stack = match mode {
            MatrixMode::ModelView => Some(&mut self.modelview),
            MatrixMode::Projection => Some(&mut self.projection),
            MatrixMode::Texture(unit) => self.textures.get_mut(unit as usize),
            MatrixMode::Palette(index) => self.palettes.get_mut(index as usize),
        };

        stack.ok_or_else(|| Error::ResourceNotFound(format!("{} matrix stack", mode)))
    }

    /// The top of the stack selected by `mode`.
    pub fn top(&self, mode: MatrixMode) -> Option<&Matrix4<f32>> {
        self.stack(mode).map(|v| v.top())
    }

    pub fn depth(&self, mode: MatrixMode) -> Option<usize> {
        self.stack(mode).map(|v| v.depth())
    }

    #[inline]
    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    fn invalidate(&mut self, mode: MatrixMode) {
        match mode {
            MatrixMode::ModelView => {
                self.valid &= !(bits(MatrixBase::Model)
                    | bits(MatrixBase::ModelView)
                    | bits(MatrixBase::ModelViewProjection))
            }
            MatrixMode::Projection => {
                self.valid &= !(bits(MatrixBase::Projection)
                    | bits(MatrixBase::ViewProjection)
                    | bits(MatrixBase::ModelViewProjection))
            }
            _ => {}
        }
    }

    fn apply(&mut self, cache: &mut StateCache, mode: MatrixMode, op: StackOp) -> Result<()> {
        let modelview = *self.modelview.top();

        {
            let stack = self.stack_mut(mode)?;
            match op {
                StackOp::Push => stack.push()?,
                StackOp::Pop => stack.pop()?,
                StackOp::Identity => stack.load_identity(),
                StackOp::Load(m) => stack.load(m),
                StackOp::Multiply(m) => stack.multiply(m),
                StackOp::LoadFromModelView => stack.load(&modelview),
            }
        }

        self.invalidate(mode);
        self.backend.apply(cache, mode, op)
    }

    /// Duplicates the top of a stack. Fails with `StackOverflow` and leaves the stack alone
    /// when it is full.
    pub fn push(&mut self, cache: &mut StateCache, mode: MatrixMode) -> Result<()> {
        self.apply(cache, mode, StackOp::Push)
    }

    pub fn pop(&mut self, cache: &mut StateCache, mode: MatrixMode) -> Result<()> {
        self.apply(cache, mode, StackOp::Pop)
    }

    pub fn load_identity(&mut self, cache: &mut StateCache, mode: MatrixMode) -> Result<()> {
        self.apply(cache, mode, StackOp::Identity)
    }

    pub fn load(&mut self, cache: &mut StateCache, mode: MatrixMode, m: &Matrix4<f32>) -> Result<()> {
        self.apply(cache, mode, StackOp::Load(m))
    }

    /// Post-multiplies the top of a stack by `m`.
    pub fn multiply(&mut self, cache: &mut StateCache, mode: MatrixMode, m: &Matrix4<f32>) -> Result<()> {
        self.apply(cache, mode, StackOp::Multiply(m))
    }

    /// Sets the camera transform, and resets the modelview stack to it.
    pub fn load_view(&mut self, cache: &mut StateCache, view: &Matrix4<f32>) -> Result<()> {
        self.view = *view;
        self.valid &= !(bits(MatrixBase::View) | bits(MatrixBase::ViewProjection));
        self.load(cache, MatrixMode::ModelView, view)
    }

    pub fn load_projection(&mut self, cache: &mut StateCache, projection: &Matrix4<f32>) -> Result<()> {
        self.load(cache, MatrixMode::Projection, projection)
    }

    /// Sets the world transform of the drawable about to be drawn.
    pub fn load_model(&mut self, cache: &mut StateCache, model: &Matrix4<f32>) -> Result<()> {
        let modelview = self.view * model;
        self.load(cache, MatrixMode::ModelView, &modelview)?;

        // Known exactly, no need to recover it from the view.
        let i = MatrixSemantic::plain(MatrixBase::Model).index();
        self.derived[i] = *model;
        self.valid |= 1 << i;
        Ok(())
    }

    pub fn set_model_local(&mut self, m: &Matrix4<f32>) {
        self.model_local = *m;
        self.valid &= !bits(MatrixBase::ModelLocal);
    }

    pub fn load_palette(&mut self, cache: &mut StateCache, index: usize, m: &Matrix4<f32>) -> Result<()> {
        self.load(cache, MatrixMode::Palette(index as u8), m)
    }

    /// Copies the current modelview matrix into palette entry `index`.
    pub fn load_palette_from_modelview(&mut self, cache: &mut StateCache, index: usize) -> Result<()> {
        self.apply(cache, MatrixMode::Palette(index as u8), StackOp::LoadFromModelView)
    }

    /// Forgets every memoized matrix.
    pub fn begin_frame(&mut self) {
        self.valid = 0;
    }

    /// Drops everything pushed, and returns every matrix to identity.
    pub fn reset(&mut self) {
        self.modelview.reset();
        self.projection.reset();
        for v in self.textures.iter_mut().chain(self.palettes.iter_mut()) {
            v.reset();
        }

        self.view = Matrix4::identity();
        self.model_local = Matrix4::identity();
        self.valid = 0;
    }

    fn plain(&self, base: MatrixBase) -> Matrix4<f32> {
        let modelview = *self.modelview.top();
        let projection = *self.projection.top();

        match base {
            MatrixBase::ModelLocal => self.model_local,
            MatrixBase::Model => mat::invert(&self.view)
                .map(|v| v * modelview)
                .unwrap_or(modelview),
            MatrixBase::View => self.view,
            MatrixBase::ModelView => modelview,
            MatrixBase::Projection => projection,
            MatrixBase::ViewProjection => projection * self.view,
            MatrixBase::ModelViewProjection => projection * modelview,
        }
    }

    fn ensure(&mut self, semantic: MatrixSemantic) {
        let i = semantic.index();
        if self.valid & (1 << i) != 0 {
            return;
        }

        let m = match semantic.form {
            super::MatrixForm::Plain => self.plain(semantic.base),
            super::MatrixForm::Inverse => {
                let plain = MatrixSemantic::plain(semantic.base);
                self.ensure(plain);
                mat::invert(&self.derived[plain.index()]).unwrap_or_else(|| {
                    warn!("{} is singular.", plain);
                    Matrix4::identity()
                })
            }
            super::MatrixForm::InverseTranspose => {
                let inverse = MatrixSemantic::inverse(semantic.base);
                self.ensure(inverse);
                self.derived[inverse.index()].transpose()
            }
        };

        self.derived[i] = m;
        self.valid |= 1 << i;
    }

    /// The current value of a derived matrix.
    pub fn matrix_for(&mut self, semantic: MatrixSemantic) -> &Matrix4<f32> {
        self.ensure(semantic);
        &self.derived[semantic.index()]
    }

    /// The upper-left 3x3 of a derived matrix, as used for normals.
    pub fn matrix3_for(&mut self, semantic: MatrixSemantic) -> Matrix3<f32> {
        mat::upper_left(self.matrix_for(semantic))
    }

    /// Whether a derived matrix is currently memoized.
    pub fn is_memoized(&self, semantic: MatrixSemantic) -> bool {
        self.valid & (1 << semantic.index()) != 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::consts as c;
    use crate::driver::headless::HeadlessDriver;
    use crate::driver::ErrorChecker;
    use crate::settings::{ErrorAssertion, ErrorLogging};
    use cgmath::{Deg, Vector3};

    fn setup(pipeline: Pipeline) -> (MatrixSystem, StateCache, HeadlessDriver) {
        let mut settings = Settings::default();
        settings.pipeline = pipeline;
        settings.modelview_stack_depth = 4;

        let driver = HeadlessDriver::new(4, 4);
        let checker = ErrorChecker::new(ErrorLogging::OnFrameBoundary, ErrorAssertion::Off);
        let cache = StateCache::new(Box::new(driver.clone()), checker, pipeline);
        (MatrixSystem::new(&settings, 2), cache, driver)
    }

    #[test]
    fn derived() {
        let (mut system, mut cache, _) = setup(Pipeline::Programmable);
        let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0));
        let model = Matrix4::from_angle_y(Deg(30.0)) * Matrix4::from_nonuniform_scale(1.0, 2.0, 3.0);
        let projection = cgmath::perspective(Deg(60.0), 1.0, 0.1, 100.0);

        system.load_view(&mut cache, &view).unwrap();
        system.load_projection(&mut cache, &projection).unwrap();
        system.load_model(&mut cache, &model).unwrap();

        let mvp = *system.matrix_for(MatrixSemantic::plain(MatrixBase::ModelViewProjection));
        assert_relative_eq!(mvp, projection * view * model, epsilon = 1e-5);

        let it = *system.matrix_for(MatrixSemantic::inverse_transpose(MatrixBase::ModelView));
        let expected = (view * model).invert().unwrap().transpose();
        assert_relative_eq!(it, expected, epsilon = 1e-5);

        let model_inv = *system.matrix_for(MatrixSemantic::inverse(MatrixBase::Model));
        assert_relative_eq!(model_inv * model, Matrix4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn memoization() {
        let (mut system, mut cache, _) = setup(Pipeline::Programmable);
        let vp = MatrixSemantic::plain(MatrixBase::ViewProjection);
        let mv = MatrixSemantic::plain(MatrixBase::ModelView);

        system.matrix_for(vp);
        system.matrix_for(mv);
        assert!(system.is_memoized(vp));

        // Moving the model leaves the view-projection alone.
        let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        system.load_model(&mut cache, &m).unwrap();
        assert!(system.is_memoized(vp));
        assert!(!system.is_memoized(mv));

        let p = cgmath::ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        system.load_projection(&mut cache, &p).unwrap();
        assert!(!system.is_memoized(vp));

        system.begin_frame();
        assert!(!system.is_memoized(MatrixSemantic::plain(MatrixBase::Model)));
    }

    #[test]
    fn model_recovered_from_view() {
        let (mut system, mut cache, _) = setup(Pipeline::Programmable);
        let view = Matrix4::from_translation(Vector3::new(0.0, -1.0, -4.0));
        let model = Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0));

        system.load_view(&mut cache, &view).unwrap();
        system.multiply(&mut cache, MatrixMode::ModelView, &model).unwrap();

        let recovered = *system.matrix_for(MatrixSemantic::plain(MatrixBase::Model));
        assert_relative_eq!(recovered, model, epsilon = 1e-5);
    }

    #[test]
    fn overflow_leaves_stack() {
        let (mut system, mut cache, _) = setup(Pipeline::Programmable);
        for _ in 0..4 {
            system.push(&mut cache, MatrixMode::ModelView).unwrap();
        }

        assert!(system.push(&mut cache, MatrixMode::ModelView).is_err());
        assert_eq!(system.depth(MatrixMode::ModelView), Some(5));
        assert!(system.push(&mut cache, MatrixMode::Texture(7)).is_err());
    }

    #[test]
    fn fixed_mirrors_driver() {
        let (mut system, mut cache, probe) = setup(Pipeline::Fixed);
        cache.open().unwrap();

        let t = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0));
        system.load_identity(&mut cache, MatrixMode::ModelView).unwrap();
        system.multiply(&mut cache, MatrixMode::ModelView, &t).unwrap();
        system.push(&mut cache, MatrixMode::ModelView).unwrap();
        system.multiply(&mut cache, MatrixMode::ModelView, &Matrix4::from_angle_y(Deg(90.0))).unwrap();
        assert_eq!(probe.matrix_depth(c::MODELVIEW), 2);
        system.pop(&mut cache, MatrixMode::ModelView).unwrap();

        assert_eq!(*system.top(MatrixMode::ModelView).unwrap(), t);
        assert_eq!(probe.matrix(c::MODELVIEW), mat::to_array(&t));

        system.load_palette(&mut cache, 1, &t).unwrap();
        assert_eq!(probe.palette_matrix(1), mat::to_array(&t));

        let s = Matrix4::from_scale(2.0);
        system.load(&mut cache, MatrixMode::ModelView, &s).unwrap();
        system.load_palette_from_modelview(&mut cache, 0).unwrap();
        assert_eq!(*system.top(MatrixMode::Palette(0)).unwrap(), s);
        assert_eq!(probe.palette_matrix(0), mat::to_array(&s));
        cache.close().unwrap();
    }
}
