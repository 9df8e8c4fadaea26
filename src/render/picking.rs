use gl::types::*;

use crate::driver::consts as c;
use crate::driver::types::DepthFormat;
use crate::errors::*;
use crate::math::Color;
use crate::state::{Slot, StateCache, Value};

/// The off-screen target of pick passes: one color and one depth renderbuffer.
///
/// Objects are created on first use, and recreated whenever the viewport grows beyond them.
#[derive(Debug, Default)]
pub struct PickBuffer {
    framebuffer: GLuint,
    color: GLuint,
    depth: GLuint,
    dimensions: (GLsizei, GLsizei),
    previous: GLuint,
}

impl PickBuffer {
    pub fn new() -> Self {
        PickBuffer::default()
    }

    #[inline]
    pub fn is_created(&self) -> bool {
        self.framebuffer != 0
    }

    #[inline]
    pub fn dimensions(&self) -> (GLsizei, GLsizei) {
        self.dimensions
    }

    /// Makes the pick framebuffer current, large enough to hold `viewport`.
    pub fn bind(&mut self, cache: &mut StateCache, viewport: [GLint; 4], depth: DepthFormat) -> Result<()> {
        let width = (viewport[0] + viewport[2]).max(1);
        let height = (viewport[1] + viewport[3]).max(1);

        self.previous = match cache.read(Slot::Framebuffer)? {
            Some(Value::UInt(id)) if id != self.framebuffer => id,
            _ => 0,
        };

        if !self.is_created() || self.dimensions != (width, height) {
            self.release(cache)?;
            self.create(cache, width, height, depth)?;
        }

        cache.bind_framebuffer(self.framebuffer)
    }

    /// Rebinds the framebuffer that was current before `bind`.
    pub fn unbind(&mut self, cache: &mut StateCache) -> Result<()> {
        cache.bind_framebuffer(self.previous)
    }

    /// Reads the pick id at `point` of the bound pick framebuffer. The background is id 0.
    pub fn read(&mut self, cache: &mut StateCache, point: [GLint; 2]) -> Result<u32> {
        let mut pixel = [0u8; 4];
        cache.driver().read_pixels(point[0], point[1], 1, 1, &mut pixel);
        cache.poll("glReadPixels")?;
        Ok(Color::pick_id_of(pixel))
    }

    fn create(&mut self, cache: &mut StateCache, width: GLsizei, height: GLsizei, depth: DepthFormat) -> Result<()> {
        debug!("Creates a {}x{} pick framebuffer.", width, height);

        let depth = match depth.internal_format() {
            Some(v) => (v, depth.has_stencil()),
            None => (c::DEPTH_COMPONENT16, false),
        };

        self.framebuffer = cache.driver().gen_framebuffer();
        self.color = cache.driver().gen_renderbuffer();
        self.depth = cache.driver().gen_renderbuffer();
        self.dimensions = (width, height);

        cache.bind_renderbuffer(self.color)?;
        cache.driver().renderbuffer_storage(c::RGBA8, width, height);
        cache.bind_renderbuffer(self.depth)?;
        cache.driver().renderbuffer_storage(depth.0, width, height);

        cache.bind_framebuffer(self.framebuffer)?;
        cache
            .driver()
            .framebuffer_renderbuffer(c::COLOR_ATTACHMENT0, self.color);
        cache
            .driver()
            .framebuffer_renderbuffer(c::DEPTH_ATTACHMENT, self.depth);

        if depth.1 {
            cache
                .driver()
                .framebuffer_renderbuffer(c::STENCIL_ATTACHMENT, self.depth);
        }

        let status = cache.driver().check_framebuffer_status();
        cache.poll("creating the pick framebuffer")?;

        if status != c::FRAMEBUFFER_COMPLETE {
            return Err(Error::Driver(format!(
                "Pick framebuffer is incomplete, status 0x{:04X}.",
                status
            )));
        }

        Ok(())
    }

    /// Deletes the GL objects.
    pub fn release(&mut self, cache: &mut StateCache) -> Result<()> {
        if !self.is_created() {
            return Ok(());
        }

        cache.driver().delete_framebuffer(self.framebuffer);
        cache.driver().delete_renderbuffer(self.color);
        cache.driver().delete_renderbuffer(self.depth);

        for id in &[self.framebuffer, self.color, self.depth] {
            cache.forget_binding(*id);
        }

        self.forget();
        cache.after_call("glDeleteFramebuffers")
    }

    /// Drops the names without deleting them, after they died with their context.
    pub fn forget(&mut self) {
        *self = PickBuffer::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::headless::HeadlessDriver;
    use crate::driver::ErrorChecker;
    use crate::settings::{ErrorAssertion, ErrorLogging, Pipeline};

    #[test]
    fn lifetime() {
        let driver = HeadlessDriver::new(8, 8);
        let checker = ErrorChecker::new(ErrorLogging::OnFrameBoundary, ErrorAssertion::Off);
        let mut cache = StateCache::new(Box::new(driver.clone()), checker, Pipeline::Programmable);
        cache.open().unwrap();

        let mut pick = PickBuffer::new();
        pick.bind(&mut cache, [0, 0, 8, 8], DepthFormat::D16).unwrap();
        assert!(pick.is_created());
        assert_eq!(pick.dimensions(), (8, 8));
        assert_eq!(driver.framebuffers(), 1);

        cache.write(Slot::ClearColor, Color::from_pick_id(7)).unwrap();
        cache.driver().clear(c::COLOR_BUFFER_BIT);
        assert_eq!(pick.read(&mut cache, [3, 3]).unwrap(), 7);

        pick.unbind(&mut cache).unwrap();
        assert_eq!(cache.value(Slot::Framebuffer), Some(&Value::UInt(0)));

        pick.bind(&mut cache, [0, 0, 4, 4], DepthFormat::D16).unwrap();
        assert_eq!(pick.dimensions(), (4, 4));
        assert_eq!(driver.framebuffers(), 1);

        pick.unbind(&mut cache).unwrap();

        // A framebuffer bound behind the cache is rebound after the pass.
        let host = cache.driver().gen_framebuffer();
        cache.driver().bind_framebuffer(c::FRAMEBUFFER, host);
        cache.forget(Slot::Framebuffer);

        pick.bind(&mut cache, [0, 0, 4, 4], DepthFormat::D16).unwrap();
        pick.unbind(&mut cache).unwrap();
        assert_eq!(driver.param(c::FRAMEBUFFER_BINDING), vec![f64::from(host)]);
        cache.driver().delete_framebuffer(host);

        pick.release(&mut cache).unwrap();
        assert!(!pick.is_created());
        assert_eq!(driver.framebuffers(), 0);
        cache.close().unwrap();
    }
}
