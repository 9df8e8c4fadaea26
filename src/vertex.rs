//! Vertex buffers, attribute pointers and draw dispatch.
//!
//! Every attribute a mesh binds is flagged for the current draw. Attributes left over from a
//! previous mesh are switched off by `disable_unbound_vertex_pointers` before the draw call,
//! so a mesh with fewer streams than its predecessor still renders correctly.

use gl::types::*;

use crate::driver::types::{BufferTarget, BufferUsage, IndexType, Primitive};
use crate::errors::*;
use crate::render::PerformanceStats;
use crate::state::{AttribPointer, Slot, StateCache, Value};

pub struct VertexBinder {
    bound: Vec<bool>,
}

impl VertexBinder {
    /// Creates a binder for `max_attributes` attribute indices.
    pub fn new(max_attributes: usize) -> Self {
        VertexBinder {
            bound: vec![false; max_attributes],
        }
    }

    #[inline]
    pub fn max_attributes(&self) -> usize {
        self.bound.len()
    }

    /// Whether `index` was bound since the last `clear_bound_flags`.
    pub fn is_bound(&self, index: u8) -> bool {
        self.bound.get(index as usize).cloned().unwrap_or(false)
    }

    pub fn generate_buffer(&mut self, cache: &mut StateCache) -> Result<GLuint> {
        let id = cache.driver().gen_buffer();
        cache.after_call("glGenBuffers")?;
        Ok(id)
    }

    pub fn delete_buffer(&mut self, cache: &mut StateCache, id: GLuint) -> Result<()> {
        if id == 0 {
            return Ok(());
        }

        cache.driver().delete_buffer(id);
        cache.forget_binding(id);
        cache.after_call("glDeleteBuffers")
    }

    #[inline]
    fn bind(cache: &mut StateCache, target: BufferTarget, id: GLuint) -> Result<()> {
        match target {
            BufferTarget::Array => cache.bind_array_buffer(id),
            BufferTarget::Index => cache.bind_index_buffer(id),
        }
    }

    /// Binds the vertex buffer `id` through the state cache.
    pub fn bind_array_buffer(&mut self, cache: &mut StateCache, id: GLuint) -> Result<()> {
        cache.bind_array_buffer(id)
    }

    pub fn bind_index_buffer(&mut self, cache: &mut StateCache, id: GLuint) -> Result<()> {
        cache.bind_index_buffer(id)
    }

    /// Replaces the whole data store of buffer `id`.
    pub fn load_buffer_data(
        &mut self,
        cache: &mut StateCache,
        target: BufferTarget,
        id: GLuint,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<()> {
        Self::bind(cache, target, id)?;

        let value = if data.is_empty() { None } else { Some(data) };
        cache
            .driver()
            .buffer_data(target.into(), data.len(), value, usage.into());
        cache.after_call("glBufferData")
    }

    pub fn update_buffer_data(
        &mut self,
        cache: &mut StateCache,
        target: BufferTarget,
        id: GLuint,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        Self::bind(cache, target, id)?;
        cache.driver().buffer_sub_data(target.into(), offset, data);
        cache.after_call("glBufferSubData")
    }

    /// Points attribute `index` at a stream of `pointer.buffer`, enables it, and marks it
    /// as bound for the current draw.
    pub fn bind_attribute(&mut self, cache: &mut StateCache, index: u8, pointer: AttribPointer) -> Result<()> {
        if index as usize >= self.bound.len() {
            return Err(Error::Driver(format!(
                "Vertex attribute {} is beyond the platform maximum {}.",
                index,
                self.bound.len()
            )));
        }

        cache.write(Slot::VertexAttribPointer(index), pointer)?;
        cache.write(Slot::VertexAttribEnabled(index), true)?;
        self.bound[index as usize] = true;
        Ok(())
    }

    pub fn enable_attribute(&mut self, cache: &mut StateCache, index: u8) -> Result<()> {
        cache.write(Slot::VertexAttribEnabled(index), true)
    }

    pub fn disable_attribute(&mut self, cache: &mut StateCache, index: u8) -> Result<()> {
        cache.write(Slot::VertexAttribEnabled(index), false)
    }

    pub fn clear_bound_flags(&mut self) {
        for v in &mut self.bound {
            *v = false;
        }
    }

    /// Disables every attribute that was not bound since the last `clear_bound_flags`.
    pub fn disable_unbound_vertex_pointers(&mut self, cache: &mut StateCache) -> Result<()> {
        for (i, bound) in self.bound.iter().enumerate() {
            if *bound {
                continue;
            }

            let slot = Slot::VertexAttribEnabled(i as u8);
            if cache.value(slot) != Some(&Value::Bool(false)) {
                cache.write(slot, false)?;
            }
        }

        Ok(())
    }

    /// Forgets every flag, used after the context was reset.
    pub fn reset(&mut self) {
        self.clear_bound_flags();
    }

    /// Draws `count` vertices of the bound arrays. Returns the faces presented.
    pub fn draw_arrays(
        &mut self,
        cache: &mut StateCache,
        stats: &mut PerformanceStats,
        primitive: Primitive,
        first: usize,
        count: usize,
    ) -> Result<u32> {
        cache
            .driver()
            .draw_arrays(primitive.into(), first as GLint, count as GLsizei);

        Self::after_draw(cache, "glDrawArrays")?;
        let faces = primitive.faces(count as u32);
        stats.add_draw_call(faces);
        Ok(faces)
    }

    /// Draws `count` indices of the bound index buffer, starting at byte `offset`.
    pub fn draw_elements(
        &mut self,
        cache: &mut StateCache,
        stats: &mut PerformanceStats,
        primitive: Primitive,
        count: usize,
        index: IndexType,
        offset: usize,
    ) -> Result<u32> {
        cache
            .driver()
            .draw_elements(primitive.into(), count as GLsizei, index.into(), offset);

        Self::after_draw(cache, "glDrawElements")?;
        let faces = primitive.faces(count as u32);
        stats.add_draw_call(faces);
        Ok(faces)
    }

    fn after_draw(cache: &mut StateCache, name: &str) -> Result<()> {
        match cache.poll(name) {
            Ok(_) => Ok(()),
            Err(Error::Driver(msg)) => Err(Error::DrawCallFailed(msg)),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::consts as c;
    use crate::driver::headless::HeadlessDriver;
    use crate::driver::ErrorChecker;
    use crate::settings::{ErrorAssertion, ErrorLogging, Pipeline};

    fn setup() -> (VertexBinder, StateCache, HeadlessDriver) {
        let driver = HeadlessDriver::new(4, 4);
        let checker = ErrorChecker::new(ErrorLogging::OnFrameBoundary, ErrorAssertion::Off);
        let mut cache = StateCache::new(Box::new(driver.clone()), checker, Pipeline::Programmable);
        cache.open().unwrap();
        (VertexBinder::new(8), cache, driver)
    }

    fn pointer(buffer: GLuint, size: GLint) -> AttribPointer {
        AttribPointer {
            buffer,
            size,
            ty: c::FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    #[test]
    fn disable_unbound() {
        let (mut binder, mut cache, probe) = setup();
        let vbo = binder.generate_buffer(&mut cache).unwrap();
        binder
            .load_buffer_data(&mut cache, BufferTarget::Array, vbo, &[0u8; 64], BufferUsage::Static)
            .unwrap();

        binder.clear_bound_flags();
        for i in 0..3 {
            binder.bind_attribute(&mut cache, i, pointer(vbo, 3)).unwrap();
        }
        binder.disable_unbound_vertex_pointers(&mut cache).unwrap();
        assert_eq!(probe.enabled_attribs(), vec![0, 1, 2]);

        binder.clear_bound_flags();
        binder.bind_attribute(&mut cache, 0, pointer(vbo, 3)).unwrap();
        binder.bind_attribute(&mut cache, 2, pointer(vbo, 2)).unwrap();
        binder.disable_unbound_vertex_pointers(&mut cache).unwrap();
        assert_eq!(probe.enabled_attribs(), vec![0, 2]);
        assert!(!binder.is_bound(1));
        cache.close().unwrap();
    }

    #[test]
    fn bind_is_elided() {
        let (mut binder, mut cache, probe) = setup();
        let vbo = binder.generate_buffer(&mut cache).unwrap();
        probe.reset_calls();

        binder.bind_attribute(&mut cache, 0, pointer(vbo, 4)).unwrap();
        binder.bind_attribute(&mut cache, 0, pointer(vbo, 4)).unwrap();
        assert_eq!(probe.calls("glVertexAttribPointer"), 1);
        assert_eq!(probe.calls("glBindBuffer"), 1);
        assert!(binder.bind_attribute(&mut cache, 8, pointer(vbo, 4)).is_err());
        cache.close().unwrap();
    }

    #[test]
    fn stats() {
        let (mut binder, mut cache, _) = setup();
        let mut stats = PerformanceStats::default();

        let faces = binder
            .draw_arrays(&mut cache, &mut stats, Primitive::Triangles, 0, 9)
            .unwrap();
        assert_eq!(faces, 3);
        binder
            .draw_arrays(&mut cache, &mut stats, Primitive::TriangleStrip, 0, 4)
            .unwrap();

        assert_eq!(stats.drawing_calls_made(), 2);
        assert_eq!(stats.faces_presented(), 5);
        cache.close().unwrap();
    }

    #[test]
    fn draw_errors() {
        let (mut binder, mut cache, mut probe) = setup();
        let mut stats = PerformanceStats::default();

        probe.inject_error(c::INVALID_OPERATION);
        match binder.draw_arrays(&mut cache, &mut stats, Primitive::Triangles, 0, 3) {
            Err(Error::DrawCallFailed(_)) => {}
            v => panic!("unexpected {:?}", v),
        }

        assert_eq!(stats.drawing_calls_made(), 0);
        cache.close().unwrap();
    }
}
