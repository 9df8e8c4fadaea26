//! The driver backed by the real GL functions.
//!
//! The `gl` crate is generated against the core profile, so the fixed-function entry points
//! (matrix stacks, lighting, fog and client arrays) are loaded here by hand, through the same
//! loader. Calling one that the platform lacks raises `GL_INVALID_OPERATION`.

use std::ffi::{CStr, CString};
use std::mem;
use std::os::raw::c_void;
use std::ptr;

use gl;
use gl::types::*;

use super::capabilities::{check_capabilities, Capabilities, Version};
use super::consts as c;
use super::{ActiveVariable, Driver};
use crate::errors::*;
use crate::settings::Pipeline;

type FnEnum = extern "system" fn(GLenum);
type FnVoid = extern "system" fn();
type FnUInt = extern "system" fn(GLuint);
type FnEnumFloat = extern "system" fn(GLenum, GLfloat);
type FnMatrix = extern "system" fn(*const GLfloat);
type FnEnumEnumFloats = extern "system" fn(GLenum, GLenum, *const GLfloat);
type FnEnumEnumFloatsMut = extern "system" fn(GLenum, GLenum, *mut GLfloat);
type FnEnumFloats = extern "system" fn(GLenum, *const GLfloat);
type FnPointer = extern "system" fn(GLint, GLenum, GLsizei, *const c_void);
type FnNormalPointer = extern "system" fn(GLenum, GLsizei, *const c_void);
type FnPointSizePointer = extern "system" fn(GLenum, GLsizei, *const c_void);

/// Fixed-function entry points. `None` if the platform does not export them.
#[derive(Default)]
struct Legacy {
    alpha_func: Option<FnEnumFloat>,
    shade_model: Option<FnEnum>,
    materialfv: Option<FnEnumEnumFloats>,
    get_materialfv: Option<FnEnumEnumFloatsMut>,
    lightfv: Option<FnEnumEnumFloats>,
    get_lightfv: Option<FnEnumEnumFloatsMut>,
    light_modelfv: Option<FnEnumFloats>,
    fogfv: Option<FnEnumFloats>,
    matrix_mode: Option<FnEnum>,
    load_identity: Option<FnVoid>,
    load_matrixf: Option<FnMatrix>,
    mult_matrixf: Option<FnMatrix>,
    push_matrix: Option<FnVoid>,
    pop_matrix: Option<FnVoid>,
    current_palette_matrix: Option<FnUInt>,
    load_palette_from_modelview: Option<FnVoid>,
    client_active_texture: Option<FnEnum>,
    enable_client_state: Option<FnEnum>,
    disable_client_state: Option<FnEnum>,
    vertex_pointer: Option<FnPointer>,
    normal_pointer: Option<FnNormalPointer>,
    color_pointer: Option<FnPointer>,
    tex_coord_pointer: Option<FnPointer>,
    point_size_pointer: Option<FnPointSizePointer>,
    weight_pointer: Option<FnPointer>,
    matrix_index_pointer: Option<FnPointer>,
}

impl Legacy {
    unsafe fn load<F>(loader: &mut F) -> Legacy
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        macro_rules! load {
            ($($name:expr),+) => {{
                let mut found: *const c_void = ptr::null();
                $(
                    if found.is_null() {
                        found = loader($name);
                    }
                )+

                if found.is_null() {
                    None
                } else {
                    Some(mem::transmute(found))
                }
            }};
        }

        Legacy {
            alpha_func: load!("glAlphaFunc"),
            shade_model: load!("glShadeModel"),
            materialfv: load!("glMaterialfv"),
            get_materialfv: load!("glGetMaterialfv"),
            lightfv: load!("glLightfv"),
            get_lightfv: load!("glGetLightfv"),
            light_modelfv: load!("glLightModelfv"),
            fogfv: load!("glFogfv"),
            matrix_mode: load!("glMatrixMode"),
            load_identity: load!("glLoadIdentity"),
            load_matrixf: load!("glLoadMatrixf"),
            mult_matrixf: load!("glMultMatrixf"),
            push_matrix: load!("glPushMatrix"),
            pop_matrix: load!("glPopMatrix"),
            current_palette_matrix: load!("glCurrentPaletteMatrixOES", "glCurrentPaletteMatrixARB"),
            load_palette_from_modelview: load!("glLoadPaletteFromModelViewMatrixOES"),
            client_active_texture: load!("glClientActiveTexture"),
            enable_client_state: load!("glEnableClientState"),
            disable_client_state: load!("glDisableClientState"),
            vertex_pointer: load!("glVertexPointer"),
            normal_pointer: load!("glNormalPointer"),
            color_pointer: load!("glColorPointer"),
            tex_coord_pointer: load!("glTexCoordPointer"),
            point_size_pointer: load!("glPointSizePointerOES"),
            weight_pointer: load!("glWeightPointerOES", "glWeightPointerARB"),
            matrix_index_pointer: load!("glMatrixIndexPointerOES", "glMatrixIndexPointerARB"),
        }
    }

    fn is_complete(&self) -> bool {
        self.alpha_func.is_some()
            && self.materialfv.is_some()
            && self.lightfv.is_some()
            && self.matrix_mode.is_some()
            && self.load_matrixf.is_some()
            && self.push_matrix.is_some()
            && self.pop_matrix.is_some()
            && self.enable_client_state.is_some()
            && self.vertex_pointer.is_some()
    }
}

/// The driver of a real GL context.
pub struct GlDriver {
    version: Version,
    legacy: Legacy,
    pending: Option<GLenum>,
}

impl GlDriver {
    /// Loads the GL functions with `loader` and probes the context.
    ///
    /// # Unsafe
    ///
    /// The GL context `loader` resolves symbols for must be current on this thread, and stay
    /// current for the lifetime of the driver.
    pub unsafe fn new<F>(mut loader: F, pipeline: Pipeline) -> Result<GlDriver>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(|s| loader(s));
        let legacy = Legacy::load(&mut loader);

        let desc = Self::string(gl::VERSION)
            .ok_or_else(|| Error::Driver("GL_VERSION is null.".into()))?;

        let mut driver = GlDriver {
            version: Version::parse(&desc)?,
            legacy,
            pending: None,
        };

        let caps = Capabilities::parse(&mut driver)?;
        info!("GlDriver {:#?}", caps);
        check_capabilities(&caps, pipeline)?;

        if pipeline == Pipeline::Fixed && !driver.legacy.is_complete() {
            return Err(Error::PlatformUnsupported(
                "fixed-function entry points".into(),
            ));
        }

        Ok(driver)
    }

    unsafe fn string(name: GLenum) -> Option<String> {
        let s = gl::GetString(name);
        if s.is_null() {
            None
        } else {
            Some(CStr::from_ptr(s as *const _).to_string_lossy().into_owned())
        }
    }

    fn missing(&mut self, name: &str) {
        warn!("[GL] {} is not available on this platform.", name);
        self.pending = Some(c::INVALID_OPERATION);
    }

    unsafe fn info_log(len: GLint, fetch: impl FnOnce(GLsizei, *mut GLchar)) -> String {
        if len <= 1 {
            return String::new();
        }

        let mut buf = vec![0u8; len as usize];
        fetch(len, buf.as_mut_ptr() as *mut GLchar);
        // Skips the trailing null character.
        buf.truncate((len as usize) - 1);
        String::from_utf8_lossy(&buf).into_owned()
    }

    unsafe fn active_variable(
        program: GLuint,
        index: GLuint,
        query: unsafe fn(GLuint, GLuint, GLsizei, *mut GLsizei, *mut GLint, *mut GLenum, *mut GLchar),
    ) -> Option<ActiveVariable> {
        let mut buf = [0u8; 256];
        let mut len = 0;
        let mut size = 0;
        let mut ty = 0;

        query(
            program,
            index,
            buf.len() as GLsizei,
            &mut len,
            &mut size,
            &mut ty,
            buf.as_mut_ptr() as *mut GLchar,
        );

        if len <= 0 {
            return None;
        }

        Some(ActiveVariable {
            name: String::from_utf8_lossy(&buf[..len as usize]).into_owned(),
            size,
            ty,
        })
    }
}

macro_rules! legacy {
    ($self:ident, $field:ident, $name:expr $(, $arg:expr)*) => {
        match $self.legacy.$field {
            Some(f) => f($($arg),*),
            None => $self.missing($name),
        }
    };
}

#[inline]
fn gl_bool(v: bool) -> GLboolean {
    if v {
        gl::TRUE
    } else {
        gl::FALSE
    }
}

#[inline]
fn cstring(name: &str) -> CString {
    CString::new(name.as_bytes()).unwrap_or_default()
}

impl Driver for GlDriver {
    fn get_error(&mut self) -> GLenum {
        match self.pending.take() {
            Some(v) => v,
            None => unsafe { gl::GetError() },
        }
    }

    fn get_string(&mut self, name: GLenum) -> Option<String> {
        unsafe {
            if name == c::EXTENSIONS && self.version >= Version::GL(3, 0) {
                let mut n = 0;
                gl::GetIntegerv(gl::NUM_EXTENSIONS, &mut n);
                let list: Vec<String> = (0..n.max(0) as GLuint)
                    .filter_map(|i| {
                        let s = gl::GetStringi(gl::EXTENSIONS, i);
                        if s.is_null() {
                            None
                        } else {
                            Some(CStr::from_ptr(s as *const _).to_string_lossy().into_owned())
                        }
                    })
                    .collect();
                Some(list.join(" "))
            } else {
                Self::string(name)
            }
        }
    }

    fn get_integerv(&mut self, pname: GLenum, out: &mut [GLint]) {
        unsafe { gl::GetIntegerv(pname, out.as_mut_ptr()) }
    }

    fn get_floatv(&mut self, pname: GLenum, out: &mut [GLfloat]) {
        unsafe { gl::GetFloatv(pname, out.as_mut_ptr()) }
    }

    fn get_booleanv(&mut self, pname: GLenum, out: &mut [bool]) {
        let mut v = [gl::FALSE; 4];
        unsafe { gl::GetBooleanv(pname, v.as_mut_ptr()) };
        for (o, i) in out.iter_mut().zip(v.iter()) {
            *o = *i != gl::FALSE;
        }
    }

    fn is_enabled(&mut self, cap: GLenum) -> bool {
        unsafe { gl::IsEnabled(cap) != gl::FALSE }
    }

    fn enable(&mut self, cap: GLenum) {
        unsafe { gl::Enable(cap) }
    }

    fn disable(&mut self, cap: GLenum) {
        unsafe { gl::Disable(cap) }
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { gl::ClearColor(r, g, b, a) }
    }

    fn clear_depth(&mut self, depth: f32) {
        unsafe { gl::ClearDepth(f64::from(depth)) }
    }

    fn clear_stencil(&mut self, s: GLint) {
        unsafe { gl::ClearStencil(s) }
    }

    fn clear(&mut self, mask: GLbitfield) {
        unsafe { gl::Clear(mask) }
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        unsafe { gl::ColorMask(gl_bool(r), gl_bool(g), gl_bool(b), gl_bool(a)) }
    }

    fn depth_mask(&mut self, flag: bool) {
        unsafe { gl::DepthMask(gl_bool(flag)) }
    }

    fn stencil_mask(&mut self, mask: GLuint) {
        unsafe { gl::StencilMask(mask) }
    }

    fn depth_func(&mut self, func: GLenum) {
        unsafe { gl::DepthFunc(func) }
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        unsafe { gl::DepthRange(f64::from(near), f64::from(far)) }
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        unsafe { gl::PolygonOffset(factor, units) }
    }

    fn line_width(&mut self, width: f32) {
        unsafe { gl::LineWidth(width) }
    }

    fn point_size(&mut self, size: f32) {
        unsafe { gl::PointSize(size) }
    }

    fn point_parameterfv(&mut self, pname: GLenum, params: &[f32]) {
        unsafe { gl::PointParameterfv(pname, params.as_ptr()) }
    }

    fn alpha_func(&mut self, func: GLenum, reference: f32) {
        legacy!(self, alpha_func, "glAlphaFunc", func, reference)
    }

    fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum) {
        unsafe { gl::BlendFuncSeparate(src_rgb, dst_rgb, src_a, dst_a) }
    }

    fn blend_equation_separate(&mut self, rgb: GLenum, alpha: GLenum) {
        unsafe { gl::BlendEquationSeparate(rgb, alpha) }
    }

    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        unsafe { gl::StencilFunc(func, reference, mask) }
    }

    fn stencil_op(&mut self, fail: GLenum, zfail: GLenum, zpass: GLenum) {
        unsafe { gl::StencilOp(fail, zfail, zpass) }
    }

    fn cull_face(&mut self, mode: GLenum) {
        unsafe { gl::CullFace(mode) }
    }

    fn front_face(&mut self, mode: GLenum) {
        unsafe { gl::FrontFace(mode) }
    }

    fn viewport(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        unsafe { gl::Viewport(x, y, width, height) }
    }

    fn scissor(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        unsafe { gl::Scissor(x, y, width, height) }
    }

    fn hint(&mut self, target: GLenum, mode: GLenum) {
        unsafe { gl::Hint(target, mode) }
    }

    fn shade_model(&mut self, mode: GLenum) {
        legacy!(self, shade_model, "glShadeModel", mode)
    }

    fn materialfv(&mut self, face: GLenum, pname: GLenum, params: &[f32]) {
        legacy!(self, materialfv, "glMaterialfv", face, pname, params.as_ptr())
    }

    fn get_materialfv(&mut self, face: GLenum, pname: GLenum, out: &mut [f32]) {
        legacy!(self, get_materialfv, "glGetMaterialfv", face, pname, out.as_mut_ptr())
    }

    fn lightfv(&mut self, light: GLenum, pname: GLenum, params: &[f32]) {
        legacy!(self, lightfv, "glLightfv", light, pname, params.as_ptr())
    }

    fn get_lightfv(&mut self, light: GLenum, pname: GLenum, out: &mut [f32]) {
        legacy!(self, get_lightfv, "glGetLightfv", light, pname, out.as_mut_ptr())
    }

    fn light_modelfv(&mut self, pname: GLenum, params: &[f32]) {
        legacy!(self, light_modelfv, "glLightModelfv", pname, params.as_ptr())
    }

    fn fogfv(&mut self, pname: GLenum, params: &[f32]) {
        legacy!(self, fogfv, "glFogfv", pname, params.as_ptr())
    }

    fn matrix_mode(&mut self, mode: GLenum) {
        legacy!(self, matrix_mode, "glMatrixMode", mode)
    }

    fn load_identity(&mut self) {
        legacy!(self, load_identity, "glLoadIdentity")
    }

    fn load_matrixf(&mut self, m: &[f32; 16]) {
        legacy!(self, load_matrixf, "glLoadMatrixf", m.as_ptr())
    }

    fn mult_matrixf(&mut self, m: &[f32; 16]) {
        legacy!(self, mult_matrixf, "glMultMatrixf", m.as_ptr())
    }

    fn push_matrix(&mut self) {
        legacy!(self, push_matrix, "glPushMatrix")
    }

    fn pop_matrix(&mut self) {
        legacy!(self, pop_matrix, "glPopMatrix")
    }

    fn current_palette_matrix(&mut self, index: GLuint) {
        legacy!(self, current_palette_matrix, "glCurrentPaletteMatrixOES", index)
    }

    fn load_palette_from_modelview_matrix(&mut self) {
        legacy!(
            self,
            load_palette_from_modelview,
            "glLoadPaletteFromModelViewMatrixOES"
        )
    }

    fn active_texture(&mut self, unit: GLenum) {
        unsafe { gl::ActiveTexture(unit) }
    }

    fn client_active_texture(&mut self, unit: GLenum) {
        legacy!(self, client_active_texture, "glClientActiveTexture", unit)
    }

    fn gen_texture(&mut self) -> GLuint {
        let mut id = 0;
        unsafe { gl::GenTextures(1, &mut id) };
        id
    }

    fn delete_texture(&mut self, id: GLuint) {
        unsafe { gl::DeleteTextures(1, &id) }
    }

    fn bind_texture(&mut self, target: GLenum, id: GLuint) {
        unsafe { gl::BindTexture(target, id) }
    }

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
    ) {
        let data = pixels.map(|v| v.as_ptr() as *const c_void).unwrap_or(ptr::null());
        unsafe {
            gl::TexImage2D(
                target,
                level,
                internal_format as GLint,
                width,
                height,
                0,
                format,
                ty,
                data,
            )
        }
    }

    fn tex_parameteri(&mut self, target: GLenum, pname: GLenum, param: GLint) {
        unsafe { gl::TexParameteri(target, pname, param) }
    }

    fn gen_buffer(&mut self) -> GLuint {
        let mut id = 0;
        unsafe { gl::GenBuffers(1, &mut id) };
        id
    }

    fn delete_buffer(&mut self, id: GLuint) {
        unsafe { gl::DeleteBuffers(1, &id) }
    }

    fn bind_buffer(&mut self, target: GLenum, id: GLuint) {
        unsafe { gl::BindBuffer(target, id) }
    }

    fn buffer_data(&mut self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum) {
        let data = data.map(|v| v.as_ptr() as *const c_void).unwrap_or(ptr::null());
        unsafe { gl::BufferData(target, size as GLsizeiptr, data, usage) }
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) {
        unsafe {
            gl::BufferSubData(
                target,
                offset as GLintptr,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
            )
        }
    }

    fn gen_framebuffer(&mut self) -> GLuint {
        let mut id = 0;
        unsafe { gl::GenFramebuffers(1, &mut id) };
        id
    }

    fn delete_framebuffer(&mut self, id: GLuint) {
        unsafe { gl::DeleteFramebuffers(1, &id) }
    }

    fn bind_framebuffer(&mut self, target: GLenum, id: GLuint) {
        unsafe { gl::BindFramebuffer(target, id) }
    }

    fn gen_renderbuffer(&mut self) -> GLuint {
        let mut id = 0;
        unsafe { gl::GenRenderbuffers(1, &mut id) };
        id
    }

    fn delete_renderbuffer(&mut self, id: GLuint) {
        unsafe { gl::DeleteRenderbuffers(1, &id) }
    }

    fn bind_renderbuffer(&mut self, target: GLenum, id: GLuint) {
        unsafe { gl::BindRenderbuffer(target, id) }
    }

    fn renderbuffer_storage(&mut self, format: GLenum, width: GLsizei, height: GLsizei) {
        unsafe { gl::RenderbufferStorage(gl::RENDERBUFFER, format, width, height) }
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: GLsizei,
        format: GLenum,
        width: GLsizei,
        height: GLsizei,
    ) {
        unsafe {
            gl::RenderbufferStorageMultisample(gl::RENDERBUFFER, samples, format, width, height)
        }
    }

    fn framebuffer_renderbuffer(&mut self, attachment: GLenum, renderbuffer: GLuint) {
        unsafe {
            gl::FramebufferRenderbuffer(gl::FRAMEBUFFER, attachment, gl::RENDERBUFFER, renderbuffer)
        }
    }

    fn framebuffer_texture_2d(&mut self, attachment: GLenum, target: GLenum, texture: GLuint) {
        unsafe { gl::FramebufferTexture2D(gl::FRAMEBUFFER, attachment, target, texture, 0) }
    }

    fn check_framebuffer_status(&mut self) -> GLenum {
        unsafe { gl::CheckFramebufferStatus(gl::FRAMEBUFFER) }
    }

    fn read_pixels(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei, out: &mut [u8]) {
        let needed = (width.max(0) * height.max(0) * 4) as usize;
        if out.len() < needed {
            self.pending = Some(c::INVALID_VALUE);
            return;
        }

        unsafe {
            gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
            gl::ReadPixels(
                x,
                y,
                width,
                height,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                out.as_mut_ptr() as *mut c_void,
            )
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        unsafe { gl::EnableVertexAttribArray(index) }
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        unsafe { gl::DisableVertexAttribArray(index) }
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        ty: GLenum,
        normalized: bool,
        stride: GLsizei,
        offset: usize,
    ) {
        unsafe {
            gl::VertexAttribPointer(
                index,
                size,
                ty,
                gl_bool(normalized),
                stride,
                offset as *const c_void,
            )
        }
    }

    fn get_vertex_attribiv(&mut self, index: GLuint, pname: GLenum) -> GLint {
        let mut v = 0;
        unsafe { gl::GetVertexAttribiv(index, pname, &mut v) };
        v
    }

    fn enable_client_state(&mut self, array: GLenum) {
        legacy!(self, enable_client_state, "glEnableClientState", array)
    }

    fn disable_client_state(&mut self, array: GLenum) {
        legacy!(self, disable_client_state, "glDisableClientState", array)
    }

    fn client_pointer(&mut self, array: GLenum, size: GLint, ty: GLenum, stride: GLsizei, offset: usize) {
        let offset = offset as *const c_void;
        match array {
            c::VERTEX_ARRAY => legacy!(self, vertex_pointer, "glVertexPointer", size, ty, stride, offset),
            c::NORMAL_ARRAY => legacy!(self, normal_pointer, "glNormalPointer", ty, stride, offset),
            c::COLOR_ARRAY => legacy!(self, color_pointer, "glColorPointer", size, ty, stride, offset),
            c::TEXTURE_COORD_ARRAY => {
                legacy!(self, tex_coord_pointer, "glTexCoordPointer", size, ty, stride, offset)
            }
            c::POINT_SIZE_ARRAY => {
                legacy!(self, point_size_pointer, "glPointSizePointerOES", ty, stride, offset)
            }
            c::WEIGHT_ARRAY => legacy!(self, weight_pointer, "glWeightPointerOES", size, ty, stride, offset),
            c::MATRIX_INDEX_ARRAY => legacy!(
                self,
                matrix_index_pointer,
                "glMatrixIndexPointerOES",
                size,
                ty,
                stride,
                offset
            ),
            _ => self.pending = Some(c::INVALID_ENUM),
        }
    }

    fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) {
        unsafe { gl::DrawArrays(mode, first, count) }
    }

    fn draw_elements(&mut self, mode: GLenum, count: GLsizei, ty: GLenum, offset: usize) {
        unsafe { gl::DrawElements(mode, count, ty, offset as *const c_void) }
    }

    fn create_shader(&mut self, stage: GLenum) -> GLuint {
        unsafe { gl::CreateShader(stage) }
    }

    fn shader_source(&mut self, shader: GLuint, source: &str) {
        let src = cstring(source);
        unsafe { gl::ShaderSource(shader, 1, &src.as_ptr(), ptr::null()) }
    }

    fn compile_shader(&mut self, shader: GLuint) {
        unsafe { gl::CompileShader(shader) }
    }

    fn get_shaderiv(&mut self, shader: GLuint, pname: GLenum) -> GLint {
        let mut v = 0;
        unsafe { gl::GetShaderiv(shader, pname, &mut v) };
        v
    }

    fn get_shader_info_log(&mut self, shader: GLuint) -> String {
        let len = self.get_shaderiv(shader, gl::INFO_LOG_LENGTH);
        unsafe {
            Self::info_log(len, |len, buf| {
                gl::GetShaderInfoLog(shader, len, ptr::null_mut(), buf)
            })
        }
    }

    fn delete_shader(&mut self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn create_program(&mut self) -> GLuint {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&mut self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn detach_shader(&mut self, program: GLuint, shader: GLuint) {
        unsafe { gl::DetachShader(program, shader) }
    }

    fn bind_attrib_location(&mut self, program: GLuint, index: GLuint, name: &str) {
        let name = cstring(name);
        unsafe { gl::BindAttribLocation(program, index, name.as_ptr()) }
    }

    fn link_program(&mut self, program: GLuint) {
        unsafe { gl::LinkProgram(program) }
    }

    fn get_programiv(&mut self, program: GLuint, pname: GLenum) -> GLint {
        let mut v = 0;
        unsafe { gl::GetProgramiv(program, pname, &mut v) };
        v
    }

    fn get_program_info_log(&mut self, program: GLuint) -> String {
        let len = self.get_programiv(program, gl::INFO_LOG_LENGTH);
        unsafe {
            Self::info_log(len, |len, buf| {
                gl::GetProgramInfoLog(program, len, ptr::null_mut(), buf)
            })
        }
    }

    fn delete_program(&mut self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn use_program(&mut self, program: GLuint) {
        unsafe { gl::UseProgram(program) }
    }

    fn get_active_uniform(&mut self, program: GLuint, index: GLuint) -> Option<ActiveVariable> {
        unsafe { Self::active_variable(program, index, gl::GetActiveUniform) }
    }

    fn get_active_attrib(&mut self, program: GLuint, index: GLuint) -> Option<ActiveVariable> {
        unsafe { Self::active_variable(program, index, gl::GetActiveAttrib) }
    }

    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint {
        let name = cstring(name);
        unsafe { gl::GetUniformLocation(program, name.as_ptr()) }
    }

    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint {
        let name = cstring(name);
        unsafe { gl::GetAttribLocation(program, name.as_ptr()) }
    }

    fn uniform_fv(&mut self, location: GLint, components: usize, data: &[f32]) {
        let count = (data.len() / components.max(1)) as GLsizei;
        unsafe {
            match components {
                1 => gl::Uniform1fv(location, count, data.as_ptr()),
                2 => gl::Uniform2fv(location, count, data.as_ptr()),
                3 => gl::Uniform3fv(location, count, data.as_ptr()),
                4 => gl::Uniform4fv(location, count, data.as_ptr()),
                _ => self.pending = Some(c::INVALID_VALUE),
            }
        }
    }

    fn uniform_iv(&mut self, location: GLint, components: usize, data: &[i32]) {
        let count = (data.len() / components.max(1)) as GLsizei;
        unsafe {
            match components {
                1 => gl::Uniform1iv(location, count, data.as_ptr()),
                2 => gl::Uniform2iv(location, count, data.as_ptr()),
                3 => gl::Uniform3iv(location, count, data.as_ptr()),
                4 => gl::Uniform4iv(location, count, data.as_ptr()),
                _ => self.pending = Some(c::INVALID_VALUE),
            }
        }
    }

    fn uniform_matrix_fv(&mut self, location: GLint, dimension: usize, data: &[f32]) {
        let count = (data.len() / (dimension * dimension).max(1)) as GLsizei;
        unsafe {
            match dimension {
                2 => gl::UniformMatrix2fv(location, count, gl::FALSE, data.as_ptr()),
                3 => gl::UniformMatrix3fv(location, count, gl::FALSE, data.as_ptr()),
                4 => gl::UniformMatrix4fv(location, count, gl::FALSE, data.as_ptr()),
                _ => self.pending = Some(c::INVALID_VALUE),
            }
        }
    }

    fn get_uniformfv(&mut self, program: GLuint, location: GLint, out: &mut [f32]) {
        unsafe { gl::GetUniformfv(program, location, out.as_mut_ptr()) }
    }

    fn get_uniformiv(&mut self, program: GLuint, location: GLint, out: &mut [i32]) {
        unsafe { gl::GetUniformiv(program, location, out.as_mut_ptr()) }
    }

    fn flush(&mut self) {
        unsafe { gl::Flush() }
    }

    fn finish(&mut self) {
        unsafe { gl::Finish() }
    }
}
