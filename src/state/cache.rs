use gl::types::*;

use super::tracker::{self, Tracker};
use super::{Policy, Slot, Value};
use crate::driver::types::{Capability, TextureTarget};
use crate::driver::{Driver, ErrorChecker};
use crate::errors::*;
use crate::settings::{ErrorLogging, Pipeline};
use crate::shader::UniformValue;
use crate::utils::FastHashMap;

/// The host side mirror of every GL value the engine writes.
///
/// All state changes go through `write`, which drops the ones that would not change the
/// driver. Between `open` and `close` the cache remembers which restoring slots were touched,
/// and `close` puts their original values back.
pub struct StateCache {
    driver: Box<dyn Driver>,
    checker: ErrorChecker,
    pipeline: Pipeline,
    trackers: FastHashMap<Slot, Tracker>,
    policies: FastHashMap<Slot, Policy>,
    restore: Vec<Slot>,
    uniforms: FastHashMap<(GLuint, GLint), UniformValue>,
    is_open: bool,
    frames: u64,
}

impl StateCache {
    pub fn new(driver: Box<dyn Driver>, checker: ErrorChecker, pipeline: Pipeline) -> Self {
        let mut cache = StateCache {
            driver,
            checker,
            pipeline,
            trackers: FastHashMap::default(),
            policies: FastHashMap::default(),
            restore: Vec::new(),
            uniforms: FastHashMap::default(),
            is_open: false,
            frames: 0,
        };

        cache.register_defaults();
        cache
    }

    /// The slots other GL users rely on are tracked from the very first frame, so that their
    /// originals are captured before anything is drawn.
    fn register_defaults(&mut self) {
        let slots = [
            Slot::Capability(Capability::Blend),
            Slot::Capability(Capability::DepthTest),
            Slot::Capability(Capability::CullFace),
            Slot::BlendFunc,
            Slot::DepthMask,
            Slot::DepthFunc,
            Slot::ActiveTexture,
            Slot::Program,
        ];

        for slot in &slots {
            self.tracker_mut(*slot);
        }
    }

    fn policy_of(&self, slot: Slot) -> Policy {
        self.policies
            .get(&slot)
            .cloned()
            .unwrap_or_else(|| slot.default_policy())
    }

    fn tracker_mut(&mut self, slot: Slot) -> &mut Tracker {
        let policy = self.policy_of(slot);
        let pipeline = self.pipeline;
        let is_open = self.is_open;

        let StateCache {
            ref mut driver,
            ref mut trackers,
            ref mut restore,
            ..
        } = *self;

        trackers.entry(slot).or_insert_with(|| {
            let mut t = Tracker::new(slot, policy, pipeline);
            // A tracker created mid-frame catches up with the open it missed.
            if is_open && t.open(driver.as_mut()) && !restore.contains(&slot) {
                restore.push(slot);
            }
            t
        })
    }

    #[inline]
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// The number of frames opened so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Direct access to the driver. Any state changed through it must be `forget`-ed.
    #[inline]
    pub fn driver(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }

    #[inline]
    pub fn checker(&self) -> &ErrorChecker {
        &self.checker
    }

    /// Polls GL errors after a call made directly on the driver, in trace mode only.
    pub fn after_call(&mut self, name: &str) -> Result<()> {
        self.checker.after_call(self.driver.as_mut(), name)
    }

    /// Polls GL errors unconditionally.
    pub fn poll(&mut self, context: &str) -> Result<()> {
        self.checker.poll(self.driver.as_mut(), context)
    }

    pub fn tracker(&self, slot: Slot) -> Option<&Tracker> {
        self.trackers.get(&slot)
    }

    /// The last known value of `slot`.
    pub fn value(&self, slot: Slot) -> Option<&Value> {
        self.trackers.get(&slot).and_then(|v| v.value())
    }

    /// The value of `slot`, asking the driver when the cache does not know it.
    pub fn read(&mut self, slot: Slot) -> Result<Option<Value>> {
        self.tracker_mut(slot);

        let v = match self.trackers.get_mut(&slot) {
            Some(t) if t.value().is_some() => return Ok(t.value().cloned()),
            Some(t) => t.read_current(self.driver.as_mut()).cloned(),
            None => None,
        };

        self.checker.after_call(self.driver.as_mut(), "glGetIntegerv")?;
        Ok(v)
    }

    /// The number of driver calls issued for `slot`.
    pub fn applied(&self, slot: Slot) -> usize {
        self.trackers.get(&slot).map(|v| v.applied()).unwrap_or(0)
    }

    /// Overrides the original-value handling of `slot`.
    pub fn set_policy(&mut self, slot: Slot, policy: Policy) {
        self.policies.insert(slot, policy);
        if let Some(t) = self.trackers.get_mut(&slot) {
            t.set_policy(policy);
        }
    }

    /// Writes `value` into `slot`, reaching the driver only if it differs from the cache.
    pub fn write<V: Into<Value>>(&mut self, slot: Slot, value: V) -> Result<()> {
        debug_assert!(self.is_open, "{:?} is written while the state cache is closed.", slot);

        let value = value.into();
        for (pre, v) in tracker::prerequisites(slot, &value, self.pipeline) {
            self.write_one(pre, v, true)?;
        }

        self.write_one(slot, value, true)
    }

    fn write_one(&mut self, slot: Slot, value: Value, queue: bool) -> Result<()> {
        self.tracker_mut(slot);

        let StateCache {
            ref mut driver,
            ref mut trackers,
            ref mut restore,
            ref checker,
            ..
        } = *self;

        let t = match trackers.get_mut(&slot) {
            Some(v) => v,
            None => return Ok(()),
        };

        if !t.differs(&value) {
            return Ok(());
        }

        if !t.apply(driver.as_mut(), value) {
            return Ok(());
        }

        if queue && t.policy().restores() && !restore.contains(&slot) {
            restore.push(slot);
        }

        if checker.logging() == ErrorLogging::OnEveryCall {
            checker.after_call(driver.as_mut(), &format!("{:?}", slot))?;
        }

        Ok(())
    }

    /// Starts a frame. Reads the originals the policies ask for.
    pub fn open(&mut self) -> Result<()> {
        debug_assert!(!self.is_open, "The state cache is opened twice.");

        self.is_open = true;
        self.frames += 1;

        let StateCache {
            ref mut driver,
            ref mut trackers,
            ref mut restore,
            ..
        } = *self;

        for (slot, t) in trackers.iter_mut() {
            if t.open(driver.as_mut()) && !restore.contains(slot) {
                restore.push(*slot);
            }
        }

        self.checker
            .at_frame_boundary(self.driver.as_mut(), "opening the state cache")
    }

    /// Ends a frame, restoring the original value of every restoring slot that was touched.
    pub fn close(&mut self) -> Result<()> {
        debug_assert!(self.is_open, "The state cache is closed twice.");
        self.is_open = false;

        let slots: Vec<Slot> = self.restore.drain(..).collect();
        let (selectors, others): (Vec<Slot>, Vec<Slot>) = slots.into_iter().partition(|v| match *v {
            Slot::ActiveTexture | Slot::ClientActiveTexture | Slot::ArrayBuffer => true,
            _ => false,
        });

        // The first error is reported once every slot was restored.
        let mut first = None;

        // Per-unit state first, since restoring it may move the selectors.
        for slot in others {
            let original = match self.trackers.get(&slot).and_then(|v| v.original()) {
                Some(v) => v.clone(),
                None => continue,
            };

            for (pre, v) in tracker::prerequisites(slot, &original, self.pipeline) {
                if let Err(err) = self.write_one(pre, v, false) {
                    first.get_or_insert(err);
                }
            }

            if let Some(t) = self.trackers.get_mut(&slot) {
                t.restore(self.driver.as_mut());
            }
        }

        for slot in selectors {
            if let Some(t) = self.trackers.get_mut(&slot) {
                t.restore(self.driver.as_mut());
            }
        }

        let closed = self
            .checker
            .at_frame_boundary(self.driver.as_mut(), "closing the state cache");

        match first {
            Some(err) => Err(err),
            None => closed,
        }
    }

    /// Runs `f` between `open` and `close`.
    pub fn scoped<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StateCache) -> Result<T>,
    {
        self.open()?;
        let result = f(self);
        let closed = self.close();
        let v = result?;
        closed?;
        Ok(v)
    }

    /// Marks every value unknown. Used after the host touched GL behind the cache.
    pub fn invalidate(&mut self) {
        for t in self.trackers.values_mut() {
            t.invalidate();
        }

        self.uniforms.clear();
    }

    /// Marks the value of `slot` unknown.
    pub fn forget(&mut self, slot: Slot) {
        if let Some(t) = self.trackers.get_mut(&slot) {
            t.invalidate();
        }
    }

    /// Drops all tracked state and continues on a new driver.
    pub fn reset_with(&mut self, driver: Box<dyn Driver>) {
        self.driver = driver;
        self.trackers.clear();
        self.restore.clear();
        self.uniforms.clear();
        self.is_open = false;
        self.register_defaults();
    }

    /// Releases the driver, leaving an empty cache behind.
    pub(crate) fn into_driver(self) -> Box<dyn Driver> {
        self.driver
    }

    #[inline]
    pub fn set_capability(&mut self, cap: Capability, enabled: bool) -> Result<()> {
        self.write(Slot::Capability(cap), enabled)
    }

    pub fn bind_array_buffer(&mut self, id: GLuint) -> Result<()> {
        self.write(Slot::ArrayBuffer, Value::UInt(id))
    }

    pub fn bind_index_buffer(&mut self, id: GLuint) -> Result<()> {
        self.write(Slot::IndexBuffer, Value::UInt(id))
    }

    pub fn bind_framebuffer(&mut self, id: GLuint) -> Result<()> {
        self.write(Slot::Framebuffer, Value::UInt(id))
    }

    pub fn bind_renderbuffer(&mut self, id: GLuint) -> Result<()> {
        self.write(Slot::Renderbuffer, Value::UInt(id))
    }

    /// Binds a texture to `unit`, switching the active unit if needed.
    pub fn bind_texture(&mut self, unit: u8, target: TextureTarget, id: GLuint) -> Result<()> {
        let slot = match target {
            TextureTarget::Texture2D => Slot::Texture2D(unit),
            TextureTarget::CubeMap => Slot::TextureCube(unit),
        };

        self.write(slot, Value::UInt(id))
    }

    pub fn use_program(&mut self, id: GLuint) -> Result<()> {
        self.write(Slot::Program, Value::UInt(id))
    }

    /// Forgets a GL object that was deleted, so a recycled name is bound again.
    pub fn forget_binding(&mut self, id: GLuint) {
        for t in self.trackers.values_mut() {
            let bound = match t.slot() {
                Slot::ArrayBuffer
                | Slot::IndexBuffer
                | Slot::Texture2D(_)
                | Slot::TextureCube(_)
                | Slot::Framebuffer
                | Slot::Renderbuffer
                | Slot::Program => t.value() == Some(&Value::UInt(id)),
                _ => false,
            };

            if bound {
                t.invalidate();
            }
        }
    }

    /// Uploads a uniform of `program`. Returns false if the cached value already matched.
    ///
    /// The program is made current when an upload is needed.
    pub fn write_uniform(&mut self, program: GLuint, location: GLint, value: &UniformValue) -> Result<bool> {
        if location < 0 {
            return Ok(false);
        }

        if self.uniforms.get(&(program, location)) == Some(value) {
            return Ok(false);
        }

        self.use_program(program)?;

        let name = match *value {
            UniformValue::Floats { components, ref data } => {
                self.driver.uniform_fv(location, components, data);
                "glUniformfv"
            }
            UniformValue::Ints { components, ref data } => {
                self.driver.uniform_iv(location, components, data);
                "glUniformiv"
            }
            UniformValue::Matrices { dimension, ref data } => {
                self.driver.uniform_matrix_fv(location, dimension, data);
                "glUniformMatrixfv"
            }
        };

        self.uniforms.insert((program, location), value.clone());
        self.after_call(name)?;
        Ok(true)
    }

    /// The value last uploaded to a uniform through the cache.
    pub fn read_uniform(&self, program: GLuint, location: GLint) -> Option<&UniformValue> {
        self.uniforms.get(&(program, location))
    }

    /// Drops the cached uniforms of a deleted program.
    pub fn forget_program(&mut self, program: GLuint) {
        self.uniforms.retain(|k, _| k.0 != program);
        self.forget_binding(program);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::consts as c;
    use crate::driver::headless::HeadlessDriver;
    use crate::settings::ErrorAssertion;

    fn cache(pipeline: Pipeline) -> (StateCache, HeadlessDriver) {
        let driver = HeadlessDriver::new(8, 8);
        let checker = ErrorChecker::new(ErrorLogging::OnFrameBoundary, ErrorAssertion::Off);
        (StateCache::new(Box::new(driver.clone()), checker, pipeline), driver)
    }

    #[test]
    fn close_restores_past_errors() {
        let driver = HeadlessDriver::new(8, 8);
        let checker = ErrorChecker::new(ErrorLogging::OnEveryCall, ErrorAssertion::Off);
        let mut cache = StateCache::new(Box::new(driver.clone()), checker, Pipeline::Programmable);
        cache.set_policy(Slot::Texture2D(1), Policy::ReadOncePerFrameAndRestore);
        cache.set_policy(Slot::Texture2D(2), Policy::ReadOncePerFrameAndRestore);

        cache.open().unwrap();
        let a = cache.driver().gen_texture();
        let b = cache.driver().gen_texture();
        cache.bind_texture(1, TextureTarget::Texture2D, a).unwrap();
        cache.bind_texture(2, TextureTarget::Texture2D, b).unwrap();
        assert!(driver.bound_texel(1).is_some());
        assert!(driver.bound_texel(2).is_some());

        driver.inject_error(c::INVALID_OPERATION);
        assert!(cache.close().is_err());
        assert!(!cache.is_open());

        // Both units are restored although the first restore reported the error.
        assert_eq!(driver.bound_texel(1), None);
        assert_eq!(driver.bound_texel(2), None);
    }

    #[test]
    fn redundant_writes() {
        let (mut cache, probe) = cache(Pipeline::Programmable);
        cache.open().unwrap();
        probe.reset_calls();

        for v in &[true, true, false, false, false, true] {
            cache.set_capability(Capability::ScissorTest, *v).unwrap();
        }

        // Unknown at first, then two changes.
        assert_eq!(probe.calls("glEnable") + probe.calls("glDisable"), 3);
        assert_eq!(cache.applied(Slot::Capability(Capability::ScissorTest)), 3);

        cache.write(Slot::ClearColor, [0.1, 0.2, 0.3, 1.0]).unwrap();
        cache.write(Slot::ClearColor, [0.1, 0.2, 0.3, 1.0]).unwrap();
        assert_eq!(probe.calls("glClearColor"), 1);
        cache.close().unwrap();
    }

    #[test]
    fn restore() {
        let (mut cache, mut probe) = cache(Pipeline::Programmable);
        probe.disable(c::DEPTH_TEST);
        probe.enable(c::BLEND);
        probe.disable(c::CULL_FACE);

        cache.open().unwrap();
        cache.set_capability(Capability::DepthTest, true).unwrap();
        cache.set_capability(Capability::Blend, false).unwrap();
        cache.set_capability(Capability::CullFace, true).unwrap();
        assert!(probe.enabled(c::DEPTH_TEST));
        cache.close().unwrap();

        assert!(!probe.enabled(c::DEPTH_TEST));
        assert!(probe.enabled(c::BLEND));
        assert!(!probe.enabled(c::CULL_FACE));

        // The original is kept across frames, and the write after open reaches the driver.
        cache.open().unwrap();
        probe.reset_calls();
        cache.set_capability(Capability::DepthTest, true).unwrap();
        assert_eq!(probe.calls("glEnable"), 1);
        cache.close().unwrap();
        assert!(!probe.enabled(c::DEPTH_TEST));
    }

    #[test]
    fn ignored_slots_are_not_restored() {
        let (mut cache, probe) = cache(Pipeline::Programmable);
        cache.open().unwrap();
        cache.write(Slot::ClearColor, [1.0, 0.0, 0.0, 1.0]).unwrap();
        cache.close().unwrap();
        assert_eq!(probe.param(c::COLOR_CLEAR_VALUE), vec![1.0, 0.0, 0.0, 1.0]);

        cache.set_policy(Slot::ClearColor, Policy::ReadOncePerFrameAndRestore);
        cache.open().unwrap();
        cache.write(Slot::ClearColor, [0.0, 1.0, 0.0, 1.0]).unwrap();
        cache.close().unwrap();
        assert_eq!(probe.param(c::COLOR_CLEAR_VALUE), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn texture_units() {
        let (mut cache, probe) = cache(Pipeline::Programmable);
        cache.open().unwrap();
        probe.reset_calls();

        cache.bind_texture(0, TextureTarget::Texture2D, 5).unwrap();
        cache.bind_texture(1, TextureTarget::Texture2D, 6).unwrap();
        cache.bind_texture(1, TextureTarget::Texture2D, 6).unwrap();
        cache.bind_texture(0, TextureTarget::Texture2D, 5).unwrap();

        assert_eq!(probe.calls("glBindTexture"), 2);
        // 0 is the original unit, so only the switch to 1 and back to 0 are issued.
        assert_eq!(probe.calls("glActiveTexture"), 2);
        cache.close().unwrap();

        assert_eq!(probe.param(c::ACTIVE_TEXTURE), vec![f64::from(c::TEXTURE0)]);
    }

    fn program(driver: &mut dyn Driver) -> GLuint {
        let vs = driver.create_shader(c::VERTEX_SHADER);
        driver.shader_source(
            vs,
            "attribute vec4 a_position;\nuniform mat4 u_mvp;\n\
             void main() { gl_Position = u_mvp * a_position; }",
        );
        driver.compile_shader(vs);

        let fs = driver.create_shader(c::FRAGMENT_SHADER);
        driver.shader_source(fs, "uniform float u_time;\nvoid main() { gl_FragColor = vec4(u_time); }");
        driver.compile_shader(fs);

        let p = driver.create_program();
        driver.attach_shader(p, vs);
        driver.attach_shader(p, fs);
        driver.link_program(p);
        p
    }

    #[test]
    fn uniforms() {
        let (mut cache, probe) = cache(Pipeline::Programmable);
        let p = program(cache.driver());
        cache.open().unwrap();

        let v = UniformValue::Floats {
            components: 1,
            data: vec![1.25],
        };

        let location = cache.driver().get_uniform_location(p, "u_time");
        assert_eq!(location, 1);
        assert!(!cache.write_uniform(p, -1, &v).unwrap());
        assert!(cache.write_uniform(p, location, &v).unwrap());
        assert!(!cache.write_uniform(p, location, &v).unwrap());
        assert_eq!(cache.read_uniform(p, location), Some(&v));
        assert_eq!(probe.current_program(), p);
        assert_eq!(probe.uniform(p, "u_time"), Some(vec![1.25]));

        cache.forget_program(p);
        assert_eq!(cache.read_uniform(p, location), None);
        cache.close().unwrap();
    }

    #[test]
    fn invalidate() {
        let (mut cache, probe) = cache(Pipeline::Programmable);
        cache.open().unwrap();
        cache.write(Slot::LineWidth, 2.0).unwrap();
        cache.invalidate();
        cache.write(Slot::LineWidth, 2.0).unwrap();
        assert_eq!(probe.calls("glLineWidth"), 2);
        cache.close().unwrap();
    }

    #[test]
    fn fixed_texcoord_arrays() {
        let (mut cache, probe) = cache(Pipeline::Fixed);
        cache.open().unwrap();
        cache.write(Slot::VertexAttribEnabled(7), true).unwrap();
        assert_eq!(probe.param(c::CLIENT_ACTIVE_TEXTURE), vec![f64::from(c::TEXTURE0 + 1)]);
        assert!(probe.client_enabled(c::TEXTURE_COORD_ARRAY));
        cache.close().unwrap();
    }

    #[test]
    fn context_loss_surfaces_at_close() {
        let (mut cache, probe) = cache(Pipeline::Programmable);
        cache.open().unwrap();
        probe.lose_context();
        match cache.close() {
            Err(Error::ContextLost) => {}
            v => panic!("unexpected {:?}", v),
        }
    }
}
