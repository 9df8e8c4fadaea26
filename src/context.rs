use crate::driver::capabilities::check_capabilities;
use crate::driver::{Capabilities, Driver, ErrorChecker};
use crate::errors::*;
use crate::matrix::MatrixSystem;
use crate::render::{Frame, FrameReport, PerformanceStats, Renderer};
use crate::scene::Scene;
use crate::settings::{Pipeline, Settings};
use crate::shader::ShaderSystem;
use crate::state::tracker::CLIENT_TEXCOORD_BASE;
use crate::state::StateCache;
use crate::vertex::VertexBinder;

/// Whether a context still renders.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// A fatal error ended rendering. Only `reset_with` or `terminate` help from here.
    Failed,
}

/// `GLContext` binds the state cache, matrix stacks, shader cache and renderer of one GL
/// context in a central place, and drives them through frames.
pub struct GLContext {
    settings: Settings,
    capabilities: Capabilities,
    cache: StateCache,
    matrices: MatrixSystem,
    shaders: ShaderSystem,
    binder: VertexBinder,
    renderer: Renderer,
    stats: PerformanceStats,
    state: ContextState,
}

impl GLContext {
    /// Setup a context on `driver`. Settings beyond what the platform supports are lowered to
    /// its limits.
    pub fn new(mut driver: Box<dyn Driver>, mut settings: Settings) -> Result<Self> {
        settings.validate()?;

        let capabilities = Capabilities::parse(driver.as_mut())?;
        info!(
            "Creates GL context: {:?} by {} on {}, {} texture units.",
            capabilities.version,
            capabilities.vendor,
            capabilities.renderer,
            capabilities.max_texture_units
        );

        check_capabilities(&capabilities, settings.pipeline)?;
        settings.clamp(&capabilities);

        let checker = ErrorChecker::new(settings.error_logging, settings.error_assertion);
        let mut cache = StateCache::new(driver, checker, settings.pipeline);
        for &(slot, policy) in &settings.policies {
            cache.set_policy(slot, policy);
        }

        let texture_units = capabilities.max_texture_units as usize;
        let matrices = MatrixSystem::new(&settings, texture_units);
        let shaders = ShaderSystem::new(&settings, capabilities.version);
        let binder = VertexBinder::new(attribute_count(&settings, &capabilities));
        let renderer = Renderer::new(&settings, texture_units);

        Ok(GLContext {
            settings,
            capabilities,
            cache,
            matrices,
            shaders,
            binder,
            renderer,
            stats: PerformanceStats::default(),
            state: ContextState::Running,
        })
    }

    /// Updates and draws one frame of `scene`.
    ///
    /// Errors of single drawables are recovered and listed in the report. A fatal error moves
    /// the context into `ContextState::Failed` and is returned once; later frames are skipped.
    pub fn render_frame(&mut self, scene: &mut dyn Scene, dt: f32) -> Result<FrameReport> {
        let mut report = FrameReport::default();
        if self.state != ContextState::Running {
            return Ok(report);
        }

        let draw_calls = self.stats.drawing_calls_made();
        let faces = self.stats.faces_presented();
        let nodes = self.stats.nodes_drawn();

        let result = self.render_scene(scene, dt, &mut report.errors);
        self.stats.add_frame(dt);

        match result {
            Ok(picked) => report.picked = picked,
            Err(err) => {
                error!("Rendering stopped: {}", err);
                self.state = ContextState::Failed;
                return Err(err);
            }
        }

        report.draw_calls = self.stats.drawing_calls_made() - draw_calls;
        report.faces = self.stats.faces_presented() - faces;
        report.nodes_drawn = self.stats.nodes_drawn() - nodes;
        Ok(report)
    }

    fn render_scene(&mut self, scene: &mut dyn Scene, dt: f32, errors: &mut Vec<Error>) -> Result<Option<usize>> {
        if let Err(err) = recover(self.cache.open(), errors) {
            let _ = self.cache.close();
            return Err(err);
        }

        let drawn = self.draw_scene(scene, dt, errors);
        let closed = self.cache.close();

        let picked = drawn?;
        recover(closed, errors)?;

        let collected = self.shaders.collect_garbage(&mut self.cache);
        recover(collected, errors)?;

        Ok(picked)
    }

    fn draw_scene(&mut self, scene: &mut dyn Scene, dt: f32, errors: &mut Vec<Error>) -> Result<Option<usize>> {
        self.matrices.begin_frame();
        self.shaders.begin_frame();
        scene.update(dt, &mut self.stats);

        let mut frame = Frame {
            cache: &mut self.cache,
            matrices: &mut self.matrices,
            shaders: &mut self.shaders,
            binder: &mut self.binder,
            stats: &mut self.stats,
            errors: Vec::new(),
            elapsed_time: scene.elapsed_time(),
            frame_time: dt,
            draw_count: 0,
        };

        let result = self.renderer.render(&mut frame, &*scene);
        errors.append(&mut frame.errors);

        match result? {
            Some(picked) => {
                scene.picked(picked);
                Ok(picked)
            }
            None => Ok(None),
        }
    }

    /// Runs `f` inside a frame, for hosts that issue their own draws through the context
    /// systems.
    pub fn frame<T, F>(&mut self, dt: f32, f: F) -> Result<T>
    where
        F: FnOnce(&mut Frame) -> Result<T>,
    {
        if self.state != ContextState::Running {
            return Err(Error::ContextLost);
        }

        let result = self.frame_with(dt, f);
        if let Err(ref err) = result {
            if err.is_fatal() {
                self.state = ContextState::Failed;
            }
        }

        result
    }

    fn frame_with<T, F>(&mut self, dt: f32, f: F) -> Result<T>
    where
        F: FnOnce(&mut Frame) -> Result<T>,
    {
        if let Err(err) = self.cache.open() {
            let _ = self.cache.close();
            self.stats.add_frame(dt);
            return Err(err);
        }

        self.matrices.begin_frame();
        self.shaders.begin_frame();

        let result = {
            let mut frame = Frame {
                cache: &mut self.cache,
                matrices: &mut self.matrices,
                shaders: &mut self.shaders,
                binder: &mut self.binder,
                stats: &mut self.stats,
                errors: Vec::new(),
                elapsed_time: 0.0,
                frame_time: dt,
                draw_count: 0,
            };

            f(&mut frame)
        };

        let closed = self.cache.close();
        self.stats.add_frame(dt);

        let v = result?;
        closed?;
        Ok(v)
    }

    #[inline]
    pub fn state(&self) -> ContextState {
        self.state
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[inline]
    pub fn stats(&self) -> &PerformanceStats {
        &self.stats
    }

    #[inline]
    pub fn stats_mut(&mut self) -> &mut PerformanceStats {
        &mut self.stats
    }

    #[inline]
    pub fn cache(&mut self) -> &mut StateCache {
        &mut self.cache
    }

    #[inline]
    pub fn matrices(&mut self) -> &mut MatrixSystem {
        &mut self.matrices
    }

    #[inline]
    pub fn shaders(&mut self) -> &mut ShaderSystem {
        &mut self.shaders
    }

    #[inline]
    pub fn binder(&mut self) -> &mut VertexBinder {
        &mut self.binder
    }

    #[inline]
    pub fn renderer(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Continues on a new driver after the context was lost. Every cached value and GL name
    /// of the old context is dropped; meshes, textures and programs are rebuilt on demand.
    pub fn reset_with(&mut self, mut driver: Box<dyn Driver>) -> Result<()> {
        let capabilities = Capabilities::parse(driver.as_mut())?;
        check_capabilities(&capabilities, self.settings.pipeline)?;
        self.settings.clamp(&capabilities);

        self.cache.reset_with(driver);
        for &(slot, policy) in &self.settings.policies {
            self.cache.set_policy(slot, policy);
        }

        self.matrices.reset();
        self.shaders.reset(capabilities.version);
        self.binder = VertexBinder::new(attribute_count(&self.settings, &capabilities));
        self.renderer.forget();

        info!("Resets GL context on {:?}.", capabilities.version);
        self.capabilities = capabilities;
        self.state = ContextState::Running;
        Ok(())
    }

    /// Deletes every GL object the context created, and hands the driver back.
    pub fn terminate(mut self) -> Result<Box<dyn Driver>> {
        if self.state == ContextState::Running {
            self.renderer.release(&mut self.cache, &mut self.binder)?;

            let remains = self.shaders.clear(&mut self.cache)?;
            if remains > 0 {
                warn!("{} shader objects are still referenced on termination.", remains);
            }
        }

        Ok(self.cache.into_driver())
    }
}

fn recover(result: Result<()>, errors: &mut Vec<Error>) -> Result<()> {
    match result {
        Err(err) => {
            if err.is_fatal() {
                return Err(err);
            }

            warn!("{}", err);
            errors.push(err);
            Ok(())
        }
        Ok(_) => Ok(()),
    }
}

fn attribute_count(settings: &Settings, caps: &Capabilities) -> usize {
    match settings.pipeline {
        Pipeline::Programmable => caps.max_vertex_attributes as usize,
        Pipeline::Fixed => CLIENT_TEXCOORD_BASE as usize + caps.max_texture_units as usize,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::headless::HeadlessDriver;

    #[test]
    fn lifecycle() {
        let driver = HeadlessDriver::new(4, 4);
        let mut ctx = GLContext::new(Box::new(driver.clone()), Settings::default()).unwrap();
        assert_eq!(ctx.state(), ContextState::Running);

        let v = ctx.frame(0.1, |_| Ok(5)).unwrap();
        assert_eq!(v, 5);
        assert_eq!(ctx.stats().frames_handled(), 1);

        driver.lose_context();
        assert!(ctx.frame(0.1, |_| Ok(())).is_err());
        assert_eq!(ctx.state(), ContextState::Failed);

        ctx.reset_with(Box::new(HeadlessDriver::new(4, 4))).unwrap();
        assert_eq!(ctx.state(), ContextState::Running);
        assert!(ctx.terminate().is_ok());
    }

    #[test]
    fn failed_frames_are_counted() {
        let driver = HeadlessDriver::new(4, 4);
        let mut ctx = GLContext::new(Box::new(driver.clone()), Settings::default()).unwrap();

        let result: Result<()> = ctx.frame(0.1, |_| Err(Error::ResourceNotFound("mesh 'missing'".into())));
        assert!(result.is_err());
        assert_eq!(ctx.state(), ContextState::Running);
        assert_eq!(ctx.stats().frames_handled(), 1);
        assert_eq!(ctx.cache().frames(), 1);
        assert!(!ctx.cache().is_open());

        ctx.frame(0.1, |_| Ok(())).unwrap();
        assert_eq!(u64::from(ctx.stats().frames_handled()), ctx.cache().frames());
        assert_eq!(ctx.state(), ContextState::Running);
        assert!(ctx.terminate().is_ok());
    }
}
