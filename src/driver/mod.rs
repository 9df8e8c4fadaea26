//! The GL foundation: one call site per GL entry point the engine uses.
//!
//! Everything above this module talks to the driver through the `Driver` trait. The native
//! implementation forwards to the loaded GL functions, and the headless one keeps a software
//! mirror of the context so the rest of the crate can run without a GPU.

pub mod capabilities;
pub mod check;
pub mod consts;
pub mod headless;
pub mod native;
pub mod types;

use gl::types::*;

pub use self::capabilities::{Capabilities, Extensions, Version};
pub use self::check::ErrorChecker;

/// An active uniform or attribute reported by an introspection query.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveVariable {
    pub name: String,
    pub size: GLint,
    pub ty: GLenum,
}

/// The set of GL entry points used by the core.
///
/// Methods mirror the GL functions they are named after; GL errors are never reported from
/// here but through `get_error`, exactly like the underlying API.
pub trait Driver {
    // Errors and queries.
    fn get_error(&mut self) -> GLenum;
    fn get_string(&mut self, name: GLenum) -> Option<String>;
    fn get_integerv(&mut self, pname: GLenum, out: &mut [GLint]);
    fn get_floatv(&mut self, pname: GLenum, out: &mut [GLfloat]);
    fn get_booleanv(&mut self, pname: GLenum, out: &mut [bool]);
    fn is_enabled(&mut self, cap: GLenum) -> bool;

    // Server capabilities.
    fn enable(&mut self, cap: GLenum);
    fn disable(&mut self, cap: GLenum);

    // Framebuffer operations.
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&mut self, depth: f32);
    fn clear_stencil(&mut self, s: GLint);
    fn clear(&mut self, mask: GLbitfield);
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    fn depth_mask(&mut self, flag: bool);
    fn stencil_mask(&mut self, mask: GLuint);

    // Per-fragment and rasterization state.
    fn depth_func(&mut self, func: GLenum);
    fn depth_range(&mut self, near: f32, far: f32);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn line_width(&mut self, width: f32);
    fn point_size(&mut self, size: f32);
    fn point_parameterfv(&mut self, pname: GLenum, params: &[f32]);
    fn alpha_func(&mut self, func: GLenum, reference: f32);
    fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum);
    fn blend_equation_separate(&mut self, rgb: GLenum, alpha: GLenum);
    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint);
    fn stencil_op(&mut self, fail: GLenum, zfail: GLenum, zpass: GLenum);
    fn cull_face(&mut self, mode: GLenum);
    fn front_face(&mut self, mode: GLenum);
    fn viewport(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    fn scissor(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);
    fn hint(&mut self, target: GLenum, mode: GLenum);

    // Fixed-function lighting and fog.
    fn shade_model(&mut self, mode: GLenum);
    fn materialfv(&mut self, face: GLenum, pname: GLenum, params: &[f32]);
    fn get_materialfv(&mut self, face: GLenum, pname: GLenum, out: &mut [f32]);
    fn lightfv(&mut self, light: GLenum, pname: GLenum, params: &[f32]);
    fn get_lightfv(&mut self, light: GLenum, pname: GLenum, out: &mut [f32]);
    fn light_modelfv(&mut self, pname: GLenum, params: &[f32]);
    fn fogfv(&mut self, pname: GLenum, params: &[f32]);

    // Fixed-function matrices.
    fn matrix_mode(&mut self, mode: GLenum);
    fn load_identity(&mut self);
    fn load_matrixf(&mut self, m: &[f32; 16]);
    fn mult_matrixf(&mut self, m: &[f32; 16]);
    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn current_palette_matrix(&mut self, index: GLuint);
    fn load_palette_from_modelview_matrix(&mut self);

    // Textures.
    fn active_texture(&mut self, unit: GLenum);
    fn client_active_texture(&mut self, unit: GLenum);
    fn gen_texture(&mut self) -> GLuint;
    fn delete_texture(&mut self, id: GLuint);
    fn bind_texture(&mut self, target: GLenum, id: GLuint);
    fn tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        pixels: Option<&[u8]>,
    );
    fn tex_parameteri(&mut self, target: GLenum, pname: GLenum, param: GLint);

    // Buffers.
    fn gen_buffer(&mut self) -> GLuint;
    fn delete_buffer(&mut self, id: GLuint);
    fn bind_buffer(&mut self, target: GLenum, id: GLuint);
    fn buffer_data(&mut self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum);
    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]);

    // Framebuffers.
    fn gen_framebuffer(&mut self) -> GLuint;
    fn delete_framebuffer(&mut self, id: GLuint);
    fn bind_framebuffer(&mut self, target: GLenum, id: GLuint);
    fn gen_renderbuffer(&mut self) -> GLuint;
    fn delete_renderbuffer(&mut self, id: GLuint);
    fn bind_renderbuffer(&mut self, target: GLenum, id: GLuint);
    fn renderbuffer_storage(&mut self, format: GLenum, width: GLsizei, height: GLsizei);
    fn renderbuffer_storage_multisample(
        &mut self,
        samples: GLsizei,
        format: GLenum,
        width: GLsizei,
        height: GLsizei,
    );
    fn framebuffer_renderbuffer(&mut self, attachment: GLenum, renderbuffer: GLuint);
    fn framebuffer_texture_2d(&mut self, attachment: GLenum, target: GLenum, texture: GLuint);
    fn check_framebuffer_status(&mut self) -> GLenum;
    /// Reads RGBA8 pixels from the bound framebuffer, bottom row first.
    fn read_pixels(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei, out: &mut [u8]);

    // Vertex arrays.
    fn enable_vertex_attrib_array(&mut self, index: GLuint);
    fn disable_vertex_attrib_array(&mut self, index: GLuint);
    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: bool,
        stride: GLsizei,
        offset: usize,
    );
    fn get_vertex_attribiv(&mut self, index: GLuint, pname: GLenum) -> GLint;
    fn enable_client_state(&mut self, array: GLenum);
    fn disable_client_state(&mut self, array: GLenum);
    /// Sets the pointer of a fixed-function client array (`glVertexPointer` and friends).
    fn client_pointer(&mut self, array: GLenum, size: GLint, ty: GLenum, stride: GLsizei, offset: usize);

    // Drawing.
    fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei);
    fn draw_elements(&mut self, mode: GLenum, count: GLsizei, ty: GLenum, offset: usize);

    // Shaders and programs.
    fn create_shader(&mut self, stage: GLenum) -> GLuint;
    fn shader_source(&mut self, shader: GLuint, source: &str);
    fn compile_shader(&mut self, shader: GLuint);
    fn get_shaderiv(&mut self, shader: GLuint, pname: GLenum) -> GLint;
    fn get_shader_info_log(&mut self, shader: GLuint) -> String;
    fn delete_shader(&mut self, shader: GLuint);
    fn create_program(&mut self) -> GLuint;
    fn attach_shader(&mut self, program: GLuint, shader: GLuint);
    fn detach_shader(&mut self, program: GLuint, shader: GLuint);
    fn bind_attrib_location(&mut self, program: GLuint, index: GLuint, name: &str);
    fn link_program(&mut self, program: GLuint);
    fn get_programiv(&mut self, program: GLuint, pname: GLenum) -> GLint;
    fn get_program_info_log(&mut self, program: GLuint) -> String;
    fn delete_program(&mut self, program: GLuint);
    fn use_program(&mut self, program: GLuint);
    fn get_active_uniform(&mut self, program: GLuint, index: GLuint) -> Option<ActiveVariable>;
    fn get_active_attrib(&mut self, program: GLuint, index: GLuint) -> Option<ActiveVariable>;
    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint;
    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint;

    // Uniforms of the current program.
    fn uniform_fv(&mut self, location: GLint, components: usize, data: &[f32]);
    fn uniform_iv(&mut self, location: GLint, components: usize, data: &[i32]);
    fn uniform_matrix_fv(&mut self, location: GLint, dimension: usize, data: &[f32]);
    fn get_uniformfv(&mut self, program: GLuint, location: GLint, out: &mut [f32]);
    fn get_uniformiv(&mut self, program: GLuint, location: GLint, out: &mut [i32]);

    // Synchronization.
    fn flush(&mut self);
    fn finish(&mut self);
}

/// Queries a single integer.
pub fn get_integer(driver: &mut dyn Driver, pname: GLenum) -> GLint {
    let mut v = [0];
    driver.get_integerv(pname, &mut v);
    v[0]
}

/// Queries a single float.
pub fn get_float(driver: &mut dyn Driver, pname: GLenum) -> GLfloat {
    let mut v = [0.0];
    driver.get_floatv(pname, &mut v);
    v[0]
}
