//! A software mirror of a GL context.
//!
//! `HeadlessDriver` keeps every piece of server state the core touches, parses the
//! declarations of GLSL sources so that programs can be introspected, and rasterizes
//! triangles with a flat color into RGBA8 color buffers. It is what the test-suite renders
//! with, and it counts every entry point call so redundant state changes can be asserted.
//!
//! Clones share the same context, so a clone kept aside works as a probe after the driver has
//! been handed to a `GLContext`.

use std::cell::RefCell;
use std::rc::Rc;

use byteorder::{ByteOrder, NativeEndian};
use gl::types::*;

use super::consts as c;
use super::types::UniformType;
use super::{ActiveVariable, Driver};
use crate::utils::{FastHashMap, FastHashSet};

const MAX_TEXTURE_UNITS: usize = 8;
const MAX_VERTEX_ATTRIBS: usize = 16;
const MAX_PALETTE_MATRICES: usize = 11;
const MAX_STACK_DEPTH: usize = 32;
const MAX_LIGHTS: u32 = 8;

type Mat = [f32; 16];

const IDENTITY: Mat = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

fn mat_mul(a: &Mat, b: &Mat) -> Mat {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

fn mat_transform(m: &Mat, v: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (row, o) in out.iter_mut().enumerate() {
        *o = (0..4).map(|k| m[k * 4 + row] * v[k]).sum();
    }
    out
}

/// RGBA8 pixels, bottom row first.
#[derive(Debug, Clone, Default)]
struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Surface {
    fn new(width: usize, height: usize) -> Self {
        Surface {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    fn get(&self, x: usize, y: usize) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }

        let i = (y * self.width + x) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    fn put(&mut self, x: usize, y: usize, v: [u8; 4]) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 4;
            self.pixels[i..i + 4].copy_from_slice(&v);
        }
    }
}

fn to_u8(v: f32) -> u8 {
    (v.max(0.0).min(1.0) * 255.0).round() as u8
}

#[derive(Debug, Clone, Default)]
struct TextureObject {
    surface: Surface,
}

#[derive(Debug, Clone, Default)]
struct RenderbufferObject {
    format: GLenum,
    samples: GLsizei,
    width: usize,
    height: usize,
    surface: Option<Surface>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Attachment {
    Renderbuffer(GLuint),
    Texture(GLuint),
}

#[derive(Debug, Clone, Default)]
struct FramebufferObject {
    color: Option<Attachment>,
    depth: Option<GLuint>,
    stencil: Option<GLuint>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Pointer {
    enabled: bool,
    size: GLint,
    ty: GLenum,
    normalized: bool,
    stride: GLsizei,
    offset: usize,
    buffer: GLuint,
}

impl Default for Pointer {
    fn default() -> Self {
        Pointer {
            enabled: false,
            size: 4,
            ty: c::FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
            buffer: 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Qualifier {
    Uniform,
    Attribute,
}

#[derive(Debug, Clone)]
struct Declaration {
    qualifier: Qualifier,
    ty: UniformType,
    name: String,
    size: GLint,
}

#[derive(Debug, Clone)]
struct ShaderObject {
    stage: GLenum,
    source: String,
    compiled: bool,
    log: String,
    declarations: Vec<Declaration>,
}

#[derive(Debug, Copy, Clone)]
enum FragColor {
    Constant([f32; 4]),
    Uniform(GLint),
    White,
}

#[derive(Debug, Clone)]
struct UniformSlot {
    name: String,
    ty: UniformType,
    size: GLint,
    location: GLint,
}

#[derive(Debug, Clone)]
struct ProgramObject {
    shaders: Vec<GLuint>,
    bindings: FastHashMap<String, GLuint>,
    linked: bool,
    deleted: bool,
    log: String,
    attributes: Vec<(ActiveVariable, GLint)>,
    uniforms: Vec<UniformSlot>,
    values: FastHashMap<GLint, Vec<f32>>,
    position: Option<GLint>,
    mvp: Option<GLint>,
    color: FragColor,
}

impl ProgramObject {
    fn new() -> Self {
        ProgramObject {
            shaders: Vec::new(),
            bindings: FastHashMap::default(),
            linked: false,
            deleted: false,
            log: String::new(),
            attributes: Vec::new(),
            uniforms: Vec::new(),
            values: FastHashMap::default(),
            position: None,
            mvp: None,
            color: FragColor::White,
        }
    }

    /// Resolves a location into its uniform and array element.
    fn slot(&self, location: GLint) -> Option<(&UniformSlot, GLint)> {
        self.uniforms
            .iter()
            .find(|v| location >= v.location && location < v.location + v.size)
            .map(|v| (v, location - v.location))
    }

    fn location(&self, name: &str) -> GLint {
        let (base, index) = match name.find('[') {
            Some(i) => {
                let index = name[i + 1..]
                    .trim_end_matches(']')
                    .parse::<GLint>()
                    .unwrap_or(-1);
                (&name[..i], index)
            }
            None => (name, 0),
        };

        self.uniforms
            .iter()
            .find(|v| v.name == base)
            .and_then(|v| {
                if index >= 0 && index < v.size {
                    Some(v.location + index)
                } else {
                    None
                }
            })
            .unwrap_or(-1)
    }
}

#[derive(Debug, Clone, Default)]
struct Stacks {
    modelview: Vec<Mat>,
    projection: Vec<Mat>,
    texture: Vec<Vec<Mat>>,
    palette: Vec<Vec<Mat>>,
}

struct HeadlessState {
    calls: FastHashMap<&'static str, usize>,
    errors: Vec<GLenum>,
    lost: bool,
    version: String,
    extensions: String,

    enabled: FastHashSet<(GLenum, usize)>,
    params: FastHashMap<GLenum, Vec<f64>>,
    materials: FastHashMap<GLenum, [f32; 4]>,
    lights: FastHashMap<(GLenum, GLenum), [f32; 4]>,

    stacks: Stacks,
    textures_2d: [GLuint; MAX_TEXTURE_UNITS],
    textures_cube: [GLuint; MAX_TEXTURE_UNITS],

    next_name: GLuint,
    textures: FastHashMap<GLuint, TextureObject>,
    buffers: FastHashMap<GLuint, Vec<u8>>,
    framebuffers: FastHashMap<GLuint, FramebufferObject>,
    renderbuffers: FastHashMap<GLuint, RenderbufferObject>,
    shaders: FastHashMap<GLuint, ShaderObject>,
    programs: FastHashMap<GLuint, ProgramObject>,

    attribs: [Pointer; MAX_VERTEX_ATTRIBS],
    clients: FastHashMap<(GLenum, usize), Pointer>,

    screen: Surface,
    draws: usize,
}

impl HeadlessState {
    fn new(width: usize, height: usize) -> Self {
        let (w, h) = (width as f64, height as f64);
        let mut params = FastHashMap::default();

        {
            let mut set = |pname: GLenum, v: &[f64]| {
                params.insert(pname, v.to_vec());
            };

            let e = |v: GLenum| f64::from(v);

            set(c::COLOR_CLEAR_VALUE, &[0.0, 0.0, 0.0, 0.0]);
            set(c::DEPTH_CLEAR_VALUE, &[1.0]);
            set(c::STENCIL_CLEAR_VALUE, &[0.0]);
            set(c::COLOR_WRITEMASK, &[1.0, 1.0, 1.0, 1.0]);
            set(c::DEPTH_WRITEMASK, &[1.0]);
            set(c::STENCIL_WRITEMASK, &[-1.0]);
            set(c::DEPTH_FUNC, &[e(c::LESS)]);
            set(c::DEPTH_RANGE, &[0.0, 1.0]);
            set(c::POLYGON_OFFSET_FACTOR, &[0.0]);
            set(c::POLYGON_OFFSET_UNITS, &[0.0]);
            set(c::LINE_WIDTH, &[1.0]);
            set(c::POINT_SIZE, &[1.0]);
            set(c::POINT_SIZE_MIN, &[0.0]);
            set(c::POINT_SIZE_MAX, &[64.0]);
            set(c::POINT_FADE_THRESHOLD_SIZE, &[1.0]);
            set(c::POINT_DISTANCE_ATTENUATION, &[1.0, 0.0, 0.0]);
            set(c::ALPHA_TEST_FUNC, &[e(c::ALWAYS)]);
            set(c::ALPHA_TEST_REF, &[0.0]);
            set(c::BLEND_SRC_RGB, &[e(c::ONE)]);
            set(c::BLEND_DST_RGB, &[e(c::ZERO)]);
            set(c::BLEND_SRC_ALPHA, &[e(c::ONE)]);
            set(c::BLEND_DST_ALPHA, &[e(c::ZERO)]);
            set(c::BLEND_EQUATION_RGB, &[e(c::FUNC_ADD)]);
            set(c::BLEND_EQUATION_ALPHA, &[e(c::FUNC_ADD)]);
            set(c::STENCIL_FUNC, &[e(c::ALWAYS)]);
            set(c::STENCIL_REF, &[0.0]);
            set(c::STENCIL_VALUE_MASK, &[-1.0]);
            set(c::STENCIL_FAIL, &[e(c::KEEP)]);
            set(c::STENCIL_PASS_DEPTH_FAIL, &[e(c::KEEP)]);
            set(c::STENCIL_PASS_DEPTH_PASS, &[e(c::KEEP)]);
            set(c::CULL_FACE_MODE, &[e(c::BACK)]);
            set(c::FRONT_FACE, &[e(c::CCW)]);
            set(c::VIEWPORT, &[0.0, 0.0, w, h]);
            set(c::SCISSOR_BOX, &[0.0, 0.0, w, h]);
            set(c::SHADE_MODEL, &[e(c::SMOOTH)]);
            set(c::LIGHT_MODEL_AMBIENT, &[0.2, 0.2, 0.2, 1.0]);
            set(c::LIGHT_MODEL_TWO_SIDE, &[0.0]);
            set(c::FOG_COLOR, &[0.0, 0.0, 0.0, 0.0]);
            set(c::FOG_MODE, &[e(c::EXP)]);
            set(c::FOG_DENSITY, &[1.0]);
            set(c::FOG_START, &[0.0]);
            set(c::FOG_END, &[1.0]);
            set(c::PERSPECTIVE_CORRECTION_HINT, &[e(c::DONT_CARE)]);
            set(c::POINT_SMOOTH_HINT, &[e(c::DONT_CARE)]);
            set(c::LINE_SMOOTH_HINT, &[e(c::DONT_CARE)]);
            set(c::FOG_HINT, &[e(c::DONT_CARE)]);
            set(c::GENERATE_MIPMAP_HINT, &[e(c::DONT_CARE)]);
            set(c::ACTIVE_TEXTURE, &[e(c::TEXTURE0)]);
            set(c::CLIENT_ACTIVE_TEXTURE, &[e(c::TEXTURE0)]);
            set(c::ARRAY_BUFFER_BINDING, &[0.0]);
            set(c::ELEMENT_ARRAY_BUFFER_BINDING, &[0.0]);
            set(c::FRAMEBUFFER_BINDING, &[0.0]);
            set(c::RENDERBUFFER_BINDING, &[0.0]);
            set(c::CURRENT_PROGRAM, &[0.0]);
            set(c::MATRIX_MODE, &[e(c::MODELVIEW)]);
            set(c::CURRENT_PALETTE_MATRIX, &[0.0]);

            set(c::MAX_TEXTURE_UNITS, &[MAX_TEXTURE_UNITS as f64]);
            set(c::MAX_TEXTURE_IMAGE_UNITS, &[MAX_TEXTURE_UNITS as f64]);
            set(c::MAX_COMBINED_TEXTURE_IMAGE_UNITS, &[MAX_TEXTURE_UNITS as f64]);
            set(c::MAX_VERTEX_ATTRIBS, &[MAX_VERTEX_ATTRIBS as f64]);
            set(c::MAX_VERTEX_UNIFORM_VECTORS, &[256.0]);
            set(c::MAX_LIGHTS, &[f64::from(MAX_LIGHTS)]);
            set(c::MAX_CLIP_PLANES, &[6.0]);
            set(c::MAX_PALETTE_MATRICES, &[MAX_PALETTE_MATRICES as f64]);
            set(c::MAX_VERTEX_UNITS, &[4.0]);
            set(c::MAX_SAMPLES, &[4.0]);
            set(c::MAX_RENDERBUFFER_SIZE, &[4096.0]);
            set(c::MAX_TEXTURE_SIZE, &[4096.0]);
            set(c::MAX_VIEWPORT_DIMS, &[4096.0, 4096.0]);
            set(c::MAX_MODELVIEW_STACK_DEPTH, &[MAX_STACK_DEPTH as f64]);
            set(c::MAX_PROJECTION_STACK_DEPTH, &[MAX_STACK_DEPTH as f64]);
            set(c::MAX_TEXTURE_STACK_DEPTH, &[MAX_STACK_DEPTH as f64]);
            set(c::STENCIL_BITS, &[8.0]);
            set(c::DEPTH_BITS, &[24.0]);
            set(c::SAMPLES, &[0.0]);
        }

        let mut materials = FastHashMap::default();
        materials.insert(c::AMBIENT, [0.2, 0.2, 0.2, 1.0]);
        materials.insert(c::DIFFUSE, [0.8, 0.8, 0.8, 1.0]);
        materials.insert(c::SPECULAR, [0.0, 0.0, 0.0, 1.0]);
        materials.insert(c::EMISSION, [0.0, 0.0, 0.0, 1.0]);
        materials.insert(c::SHININESS, [0.0; 4]);

        let mut enabled = FastHashSet::default();
        enabled.insert((c::DITHER, 0));
        enabled.insert((c::MULTISAMPLE, 0));

        HeadlessState {
            calls: FastHashMap::default(),
            errors: Vec::new(),
            lost: false,
            version: "2.1 Headless".into(),
            extensions: "GL_OES_matrix_palette GL_OES_point_sprite GL_OES_point_size_array \
                         GL_OES_packed_depth_stencil GL_EXT_framebuffer_multisample \
                         GL_OES_framebuffer_object"
                .into(),

            enabled,
            params,
            materials,
            lights: FastHashMap::default(),

            stacks: Stacks {
                modelview: vec![IDENTITY],
                projection: vec![IDENTITY],
                texture: vec![vec![IDENTITY]; MAX_TEXTURE_UNITS],
                palette: vec![vec![IDENTITY]; MAX_PALETTE_MATRICES],
            },
            textures_2d: [0; MAX_TEXTURE_UNITS],
            textures_cube: [0; MAX_TEXTURE_UNITS],

            next_name: 1,
            textures: FastHashMap::default(),
            buffers: FastHashMap::default(),
            framebuffers: FastHashMap::default(),
            renderbuffers: FastHashMap::default(),
            shaders: FastHashMap::default(),
            programs: FastHashMap::default(),

            attribs: [Pointer::default(); MAX_VERTEX_ATTRIBS],
            clients: FastHashMap::default(),

            screen: Surface::new(width, height),
            draws: 0,
        }
    }

    fn error(&mut self, code: GLenum) {
        if !self.errors.contains(&code) {
            self.errors.push(code);
        }
    }

    fn name(&mut self) -> GLuint {
        let v = self.next_name;
        self.next_name += 1;
        v
    }

    fn param(&self, pname: GLenum) -> f64 {
        self.params.get(&pname).map(|v| v[0]).unwrap_or(0.0)
    }

    fn set(&mut self, pname: GLenum, v: &[f64]) {
        self.params.insert(pname, v.to_vec());
    }

    /// Flat lighting without normals: emission, plus the ambient terms, plus the diffuse
    /// color of every enabled light. Unlit draws are white.
    fn fixed_color(&self) -> [f32; 4] {
        if !self.enabled.contains(&(c::LIGHTING, 0)) {
            return [1.0; 4];
        }

        let material = |pname: GLenum| self.materials.get(&pname).cloned().unwrap_or([0.0; 4]);
        let (ambient, diffuse) = (material(c::AMBIENT), material(c::DIFFUSE));

        let mut color = material(c::EMISSION);
        let scene = self.params.get(&c::LIGHT_MODEL_AMBIENT).cloned().unwrap_or_default();
        for i in 0..3 {
            color[i] += scene.get(i).cloned().unwrap_or(0.0) as f32 * ambient[i];
        }

        for light in (0..MAX_LIGHTS).map(|v| c::LIGHT0 + v) {
            if !self.enabled.contains(&(light, 0)) {
                continue;
            }

            let value = |pname| {
                self.lights
                    .get(&(light, pname))
                    .cloned()
                    .unwrap_or_else(|| light_default(light, pname))
            };

            let (a, d) = (value(c::AMBIENT), value(c::DIFFUSE));
            for i in 0..3 {
                color[i] += a[i] * ambient[i] + d[i] * diffuse[i];
            }
        }

        for v in color.iter_mut().take(3) {
            *v = v.max(0.0).min(1.0);
        }

        color[3] = diffuse[3];
        color
    }

    fn active_unit(&self) -> usize {
        (self.param(c::ACTIVE_TEXTURE) as GLenum - c::TEXTURE0) as usize
    }

    fn client_unit(&self) -> usize {
        (self.param(c::CLIENT_ACTIVE_TEXTURE) as GLenum - c::TEXTURE0) as usize
    }

    fn capability_key(&self, cap: GLenum) -> Option<(GLenum, usize)> {
        let known = match cap {
            c::BLEND
            | c::DEPTH_TEST
            | c::CULL_FACE
            | c::SCISSOR_TEST
            | c::STENCIL_TEST
            | c::POLYGON_OFFSET_FILL
            | c::SAMPLE_ALPHA_TO_COVERAGE
            | c::SAMPLE_ALPHA_TO_ONE
            | c::SAMPLE_COVERAGE
            | c::MULTISAMPLE
            | c::DITHER
            | c::ALPHA_TEST
            | c::FOG
            | c::LIGHTING
            | c::NORMALIZE
            | c::RESCALE_NORMAL
            | c::COLOR_MATERIAL
            | c::COLOR_LOGIC_OP
            | c::LINE_SMOOTH
            | c::POINT_SMOOTH
            | c::POINT_SPRITE
            | c::MATRIX_PALETTE
            | c::VERTEX_PROGRAM_POINT_SIZE
            | c::TEXTURE_2D => true,
            v if v >= c::LIGHT0 && v < c::LIGHT0 + MAX_LIGHTS => true,
            v if v >= c::CLIP_PLANE0 && v < c::CLIP_PLANE0 + 6 => true,
            _ => false,
        };

        if !known {
            return None;
        }

        if cap == c::TEXTURE_2D {
            Some((cap, self.active_unit()))
        } else {
            Some((cap, 0))
        }
    }

    fn client_key(&self, array: GLenum) -> Option<(GLenum, usize)> {
        match array {
            c::TEXTURE_COORD_ARRAY => Some((array, self.client_unit())),
            c::VERTEX_ARRAY
            | c::NORMAL_ARRAY
            | c::COLOR_ARRAY
            | c::POINT_SIZE_ARRAY
            | c::WEIGHT_ARRAY
            | c::MATRIX_INDEX_ARRAY => Some((array, 0)),
            _ => None,
        }
    }

    fn query(&mut self, pname: GLenum) -> Option<Vec<f64>> {
        let unit = self.active_unit();
        let matrix = |m: Option<&Mat>| m.map(|m| m.iter().map(|v| f64::from(*v)).collect());
        let v = match pname {
            c::MODELVIEW_MATRIX => matrix(self.stacks.modelview.last()),
            c::PROJECTION_MATRIX => matrix(self.stacks.projection.last()),
            c::TEXTURE_MATRIX => matrix(self.stacks.texture[unit].last()),
            c::TEXTURE_BINDING_2D => Some(vec![f64::from(self.textures_2d[unit])]),
            c::TEXTURE_BINDING_CUBE_MAP => Some(vec![f64::from(self.textures_cube[unit])]),
            _ => self.params.get(&pname).cloned(),
        };

        if v.is_none() {
            self.error(c::INVALID_ENUM);
        }

        v
    }

    fn matrix_stack(&mut self) -> Option<&mut Vec<Mat>> {
        let unit = self.active_unit();
        let palette = self.param(c::CURRENT_PALETTE_MATRIX) as usize;
        match self.param(c::MATRIX_MODE) as GLenum {
            c::MODELVIEW => Some(&mut self.stacks.modelview),
            c::PROJECTION => Some(&mut self.stacks.projection),
            c::TEXTURE => self.stacks.texture.get_mut(unit),
            c::MATRIX_PALETTE => self.stacks.palette.get_mut(palette),
            _ => None,
        }
    }

    fn stack_limit(&self) -> usize {
        if self.param(c::MATRIX_MODE) as GLenum == c::MATRIX_PALETTE {
            1
        } else {
            MAX_STACK_DEPTH
        }
    }

    fn with_top<F: FnOnce(&mut Mat)>(&mut self, f: F) {
        if let Some(top) = self.matrix_stack().and_then(|v| v.last_mut()) {
            f(top);
        }
    }

    fn unit_of(&mut self, unit: GLenum, max: usize) -> Option<GLenum> {
        if unit >= c::TEXTURE0 && ((unit - c::TEXTURE0) as usize) < max {
            Some(unit)
        } else {
            self.error(c::INVALID_ENUM);
            None
        }
    }

    fn bound_buffer(&self, target: GLenum) -> Option<GLuint> {
        match target {
            c::ARRAY_BUFFER => Some(self.param(c::ARRAY_BUFFER_BINDING) as GLuint),
            c::ELEMENT_ARRAY_BUFFER => Some(self.param(c::ELEMENT_ARRAY_BUFFER_BINDING) as GLuint),
            _ => None,
        }
    }

    fn bound_framebuffer(&self) -> GLuint {
        self.param(c::FRAMEBUFFER_BINDING) as GLuint
    }

    fn bound_renderbuffer(&self) -> GLuint {
        self.param(c::RENDERBUFFER_BINDING) as GLuint
    }

    fn target(&mut self) -> Option<&mut Surface> {
        let fbo = self.bound_framebuffer();
        if fbo == 0 {
            return Some(&mut self.screen);
        }

        let color = self.framebuffers.get(&fbo)?.color?;
        match color {
            Attachment::Renderbuffer(id) => {
                self.renderbuffers.get_mut(&id).and_then(|v| v.surface.as_mut())
            }
            Attachment::Texture(id) => self.textures.get_mut(&id).map(|v| &mut v.surface),
        }
    }

    fn target_size(&self, attachment: Attachment) -> Option<(usize, usize)> {
        match attachment {
            Attachment::Renderbuffer(id) => self.renderbuffers.get(&id).map(|v| (v.width, v.height)),
            Attachment::Texture(id) => self
                .textures
                .get(&id)
                .map(|v| (v.surface.width, v.surface.height)),
        }
    }

    fn framebuffer_status(&self) -> GLenum {
        let fbo = self.bound_framebuffer();
        if fbo == 0 {
            return c::FRAMEBUFFER_COMPLETE;
        }

        let obj = match self.framebuffers.get(&fbo) {
            Some(v) => v,
            None => return c::FRAMEBUFFER_UNSUPPORTED,
        };

        let attachments: Vec<Attachment> = obj
            .color
            .into_iter()
            .chain(obj.depth.map(Attachment::Renderbuffer))
            .chain(obj.stencil.map(Attachment::Renderbuffer))
            .collect();

        if attachments.is_empty() {
            return c::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }

        let mut size = None;
        for v in attachments {
            match self.target_size(v) {
                Some((0, _)) | Some((_, 0)) | None => return c::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
                Some(dim) => {
                    if size.is_some() && size != Some(dim) {
                        return c::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
                    }
                    size = Some(dim);
                }
            }
        }

        c::FRAMEBUFFER_COMPLETE
    }

    fn scissor_box(&self) -> Option<[i64; 4]> {
        if !self.enabled.contains(&(c::SCISSOR_TEST, 0)) {
            return None;
        }

        let v = self.params.get(&c::SCISSOR_BOX)?;
        Some([v[0] as i64, v[1] as i64, v[2] as i64, v[3] as i64])
    }

    fn clear(&mut self, mask: GLbitfield) {
        if mask & c::COLOR_BUFFER_BIT == 0 {
            return;
        }

        let color = self.params[&c::COLOR_CLEAR_VALUE].clone();
        let pixel = [
            to_u8(color[0] as f32),
            to_u8(color[1] as f32),
            to_u8(color[2] as f32),
            to_u8(color[3] as f32),
        ];

        let scissor = self.scissor_box();
        if let Some(surface) = self.target() {
            for y in 0..surface.height {
                for x in 0..surface.width {
                    if let Some(b) = scissor {
                        let (x, y) = (x as i64, y as i64);
                        if x < b[0] || y < b[1] || x >= b[0] + b[2] || y >= b[1] + b[3] {
                            continue;
                        }
                    }

                    surface.put(x, y, pixel);
                }
            }
        }
    }

    fn fetch(&self, pointer: &Pointer, index: u32) -> Option<[f32; 4]> {
        if !pointer.enabled || pointer.ty != c::FLOAT || pointer.buffer == 0 {
            return None;
        }

        let data = self.buffers.get(&pointer.buffer)?;
        let size = pointer.size.max(1).min(4) as usize;
        let stride = if pointer.stride == 0 {
            size * 4
        } else {
            pointer.stride as usize
        };

        let base = pointer.offset + (index as usize) * stride;
        if base + size * 4 > data.len() {
            return None;
        }

        let mut v = [0.0, 0.0, 0.0, 1.0];
        for (i, item) in v.iter_mut().enumerate().take(size) {
            *item = NativeEndian::read_f32(&data[base + i * 4..]);
        }

        Some(v)
    }

    fn indices(&mut self, count: GLsizei, ty: GLenum, offset: usize) -> Option<Vec<u32>> {
        let buffer = self.param(c::ELEMENT_ARRAY_BUFFER_BINDING) as GLuint;
        let data = self.buffers.get(&buffer)?;
        let stride = match ty {
            c::UNSIGNED_BYTE => 1,
            c::UNSIGNED_SHORT => 2,
            c::UNSIGNED_INT => 4,
            _ => return None,
        };

        let mut v = Vec::with_capacity(count.max(0) as usize);
        for i in 0..count.max(0) as usize {
            let p = offset + i * stride;
            if p + stride > data.len() {
                return None;
            }

            v.push(match stride {
                1 => u32::from(data[p]),
                2 => u32::from(NativeEndian::read_u16(&data[p..])),
                _ => NativeEndian::read_u32(&data[p..]),
            });
        }

        Some(v)
    }

    fn draw(&mut self, mode: GLenum, indices: &[u32]) {
        self.draws += 1;

        let program = self.param(c::CURRENT_PROGRAM) as GLuint;
        let (pointer, mvp, color) = if program != 0 {
            let obj = match self.programs.get(&program) {
                Some(v) if v.linked => v,
                _ => {
                    self.error(c::INVALID_OPERATION);
                    return;
                }
            };

            let pointer = match obj.position {
                Some(location) => self.attribs[location as usize],
                None => return,
            };

            let mvp = obj
                .mvp
                .and_then(|v| obj.values.get(&v))
                .filter(|v| v.len() >= 16)
                .map(|v| {
                    let mut m = [0.0; 16];
                    m.copy_from_slice(&v[..16]);
                    m
                })
                .unwrap_or(IDENTITY);

            let color = match obj.color {
                FragColor::Constant(v) => v,
                FragColor::White => [1.0; 4],
                FragColor::Uniform(location) => {
                    let mut v = [0.0; 4];
                    if let Some(values) = obj.values.get(&location) {
                        for (o, i) in v.iter_mut().zip(values.iter()) {
                            *o = *i;
                        }
                    }
                    v
                }
            };

            (pointer, mvp, color)
        } else {
            let pointer = match self.clients.get(&(c::VERTEX_ARRAY, 0)) {
                Some(v) => *v,
                None => return,
            };

            let projection = self.stacks.projection.last().cloned().unwrap_or(IDENTITY);
            let modelview = self.stacks.modelview.last().cloned().unwrap_or(IDENTITY);
            (pointer, mat_mul(&projection, &modelview), self.fixed_color())
        };

        let viewport = self.params[&c::VIEWPORT].clone();
        let mut points = Vec::with_capacity(indices.len());
        for i in indices {
            let v = match self.fetch(&pointer, *i) {
                Some(v) => mat_transform(&mvp, v),
                None => return,
            };

            if v[3] <= 0.0 {
                points.push(None);
                continue;
            }

            let (x, y) = (v[0] / v[3], v[1] / v[3]);
            points.push(Some((
                viewport[0] as f32 + (x + 1.0) * 0.5 * viewport[2] as f32,
                viewport[1] as f32 + (y + 1.0) * 0.5 * viewport[3] as f32,
            )));
        }

        let mut triangles = Vec::new();
        match mode {
            c::TRIANGLES => {
                for t in points.chunks(3).filter(|t| t.len() == 3) {
                    triangles.push((t[0], t[1], t[2]));
                }
            }
            c::TRIANGLE_STRIP => {
                for i in 2..points.len() {
                    triangles.push((points[i - 2], points[i - 1], points[i]));
                }
            }
            c::TRIANGLE_FAN => {
                for i in 2..points.len() {
                    triangles.push((points[0], points[i - 1], points[i]));
                }
            }
            _ => (),
        }

        let blend = self.enabled.contains(&(c::BLEND, 0))
            && self.param(c::BLEND_SRC_RGB) as GLenum == c::SRC_ALPHA
            && self.param(c::BLEND_DST_RGB) as GLenum == c::ONE_MINUS_SRC_ALPHA;
        let scissor = self.scissor_box();
        let write = self.params[&c::COLOR_WRITEMASK].iter().any(|v| *v != 0.0);

        let surface = match self.target() {
            Some(v) => v,
            None => return,
        };

        if !write {
            return;
        }

        if mode == c::POINTS {
            for (x, y) in points.into_iter().filter_map(|v| v) {
                if x >= 0.0 && y >= 0.0 {
                    let src = [to_u8(color[0]), to_u8(color[1]), to_u8(color[2]), to_u8(color[3])];
                    surface.put(x as usize, y as usize, src);
                }
            }
            return;
        }

        for (a, b, c) in triangles {
            if let (Some(a), Some(b), Some(c)) = (a, b, c) {
                rasterize(surface, a, b, c, color, blend, scissor);
            }
        }
    }
}

fn rasterize(
    surface: &mut Surface,
    a: (f32, f32),
    b: (f32, f32),
    c: (f32, f32),
    color: [f32; 4],
    blend: bool,
    scissor: Option<[i64; 4]>,
) {
    let edge = |p: (f32, f32), q: (f32, f32), x: f32, y: f32| {
        (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
    };

    let area = edge(a, b, c.0, c.1);
    if area == 0.0 {
        return;
    }

    let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as usize;
    let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as usize;
    let max_x = (a.0.max(b.0).max(c.0).ceil().max(0.0) as usize).min(surface.width);
    let max_y = (a.1.max(b.1).max(c.1).ceil().max(0.0) as usize).min(surface.height);

    for y in min_y..max_y {
        for x in min_x..max_x {
            if let Some(s) = scissor {
                let (xi, yi) = (x as i64, y as i64);
                if xi < s[0] || yi < s[1] || xi >= s[0] + s[2] || yi >= s[1] + s[3] {
                    continue;
                }
            }

            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b, c, px, py) / area;
            let w1 = edge(c, a, px, py) / area;
            let w2 = edge(a, b, px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let out = if blend {
                let dst = surface.get(x, y);
                let alpha = color[3];
                let mix = |s: f32, d: u8| s * alpha + f32::from(d) / 255.0 * (1.0 - alpha);
                [
                    to_u8(mix(color[0], dst[0])),
                    to_u8(mix(color[1], dst[1])),
                    to_u8(mix(color[2], dst[2])),
                    to_u8(mix(color[3], dst[3])),
                ]
            } else {
                [to_u8(color[0]), to_u8(color[1]), to_u8(color[2]), to_u8(color[3])]
            };

            surface.put(x, y, out);
        }
    }
}

/// Removes comments, collects `#define`s and drops the other preprocessor lines.
fn preprocess(source: &str) -> (String, FastHashMap<String, String>) {
    let mut stripped = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '/' && chars.peek() == Some(&'/') {
            while let Some(v) = chars.next() {
                if v == '\n' {
                    stripped.push('\n');
                    break;
                }
            }
        } else if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut last = ' ';
            while let Some(v) = chars.next() {
                if last == '*' && v == '/' {
                    break;
                }
                last = v;
            }
            stripped.push(' ');
        } else {
            stripped.push(ch);
        }
    }

    let mut defines = FastHashMap::default();
    let mut body = String::with_capacity(stripped.len());
    for line in stripped.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            let mut tokens = line[1..].split_whitespace();
            if tokens.next() == Some("define") {
                if let (Some(k), Some(v)) = (tokens.next(), tokens.next()) {
                    defines.insert(k.to_owned(), v.to_owned());
                }
            }
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    (body, defines)
}

/// Parses the global uniform and attribute declarations of a shader.
fn parse_declarations(source: &str) -> ::std::result::Result<Vec<Declaration>, String> {
    let (body, defines) = preprocess(source);

    if !body.contains("void main") {
        return Err("ERROR: 0:0: 'main' : function is not defined".into());
    }

    if body.matches('{').count() != body.matches('}').count() {
        return Err("ERROR: 0:0: '' : syntax error, unbalanced braces".into());
    }

    let mut declarations = Vec::new();
    for statement in body.split(';') {
        let statement = match statement.rfind(|ch: char| ch == '{' || ch == '}') {
            Some(i) => &statement[i + 1..],
            None => statement,
        };

        let mut tokens = statement.split_whitespace().peekable();
        let qualifier = match tokens.next() {
            Some("uniform") => Qualifier::Uniform,
            Some("attribute") => Qualifier::Attribute,
            _ => continue,
        };

        while let Some(&v) = tokens.peek() {
            if v == "lowp" || v == "mediump" || v == "highp" {
                tokens.next();
            } else {
                break;
            }
        }

        let ty_name = tokens.next().unwrap_or("");
        let ty = UniformType::from_glsl(ty_name)
            .ok_or_else(|| format!("ERROR: 0:0: '{}' : unknown type", ty_name))?;

        let rest: String = tokens.collect::<Vec<_>>().join("");
        for declarator in rest.split(',').filter(|v| !v.is_empty()) {
            let (name, size) = match declarator.find('[') {
                Some(i) => {
                    let expr = declarator[i + 1..].trim_end_matches(']');
                    let expr = defines.get(expr).map(|v| v.as_str()).unwrap_or(expr);
                    let size = expr
                        .parse::<GLint>()
                        .map_err(|_| format!("ERROR: 0:0: '{}' : array size must be a constant", expr))?;
                    (&declarator[..i], size)
                }
                None => (declarator, 1),
            };

            declarations.push(Declaration {
                qualifier,
                ty,
                name: name.to_owned(),
                size,
            });
        }
    }

    Ok(declarations)
}

fn after<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.starts_with(prefix) {
        Some(s[prefix.len()..].trim_start())
    } else {
        None
    }
}

/// Recognizes `gl_FragColor = vec4(<literals>)`.
fn constant_frag_color(source: &str) -> Option<[f32; 4]> {
    let (body, _) = preprocess(source);
    let start = body.find("gl_FragColor")?;
    let rest = body[start + "gl_FragColor".len()..].trim_start();
    let rest = after(rest, "=")?;
    let rest = after(rest, "vec4")?;
    let rest = after(rest, "(")?;
    let args = &rest[..rest.find(')')?];

    let values: Vec<f32> = args
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<::std::result::Result<_, _>>()
        .ok()?;

    match values.len() {
        1 => Some([values[0]; 4]),
        4 => Some([values[0], values[1], values[2], values[3]]),
        _ => None,
    }
}

/// A driver that renders into memory.
#[derive(Clone)]
pub struct HeadlessDriver {
    state: Rc<RefCell<HeadlessState>>,
}

/// Clones of a `HeadlessDriver` share its state, so a clone kept aside inspects the driver
/// owned by a context.
pub type HeadlessProbe = HeadlessDriver;

impl HeadlessDriver {
    /// Creates a context with a `width` x `height` default framebuffer.
    pub fn new(width: usize, height: usize) -> Self {
        HeadlessDriver {
            state: Rc::new(RefCell::new(HeadlessState::new(width, height))),
        }
    }

    /// Overrides the reported `GL_VERSION` and `GL_EXTENSIONS` strings.
    pub fn with_strings(self, version: &str, extensions: &str) -> Self {
        {
            let mut s = self.state.borrow_mut();
            s.version = version.to_owned();
            s.extensions = extensions.to_owned();
        }
        self
    }

    fn with<T, F>(&self, call: &'static str, f: F) -> T
    where
        T: Default,
        F: FnOnce(&mut HeadlessState) -> T,
    {
        let mut s = self.state.borrow_mut();
        *s.calls.entry(call).or_insert(0) += 1;

        if s.lost {
            s.error(c::CONTEXT_LOST);
            return T::default();
        }

        f(&mut s)
    }

    /// The number of times the entry point `name` (e.g. `"glEnable"`) was called.
    pub fn calls(&self, name: &str) -> usize {
        self.state.borrow().calls.get(name).cloned().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.borrow().calls.values().sum()
    }

    pub fn reset_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Raises `code` as if the last call failed.
    pub fn inject_error(&self, code: GLenum) {
        self.state.borrow_mut().error(code);
    }

    /// Simulates a context loss. Every following call reports `GL_CONTEXT_LOST`.
    pub fn lose_context(&self) {
        let mut s = self.state.borrow_mut();
        s.lost = true;
        s.error(c::CONTEXT_LOST);
    }

    pub fn enabled(&self, cap: GLenum) -> bool {
        let s = self.state.borrow();
        s.capability_key(cap)
            .map(|k| s.enabled.contains(&k))
            .unwrap_or(false)
    }

    pub fn client_enabled(&self, array: GLenum) -> bool {
        let s = self.state.borrow();
        s.client_key(array)
            .and_then(|k| s.clients.get(&k))
            .map(|v| v.enabled)
            .unwrap_or(false)
    }

    /// The raw values of a state parameter.
    pub fn param(&self, pname: GLenum) -> Vec<f64> {
        self.state
            .borrow()
            .params
            .get(&pname)
            .cloned()
            .unwrap_or_default()
    }

    pub fn current_program(&self) -> GLuint {
        self.state.borrow().param(c::CURRENT_PROGRAM) as GLuint
    }

    /// The indices of the enabled generic vertex attributes.
    pub fn enabled_attribs(&self) -> Vec<GLuint> {
        self.state
            .borrow()
            .attribs
            .iter()
            .enumerate()
            .filter(|(_, v)| v.enabled)
            .map(|(i, _)| i as GLuint)
            .collect()
    }

    /// The top of a fixed-function matrix stack.
    pub fn matrix(&self, mode: GLenum) -> Mat {
        let s = self.state.borrow();
        let top = match mode {
            c::MODELVIEW => s.stacks.modelview.last(),
            c::PROJECTION => s.stacks.projection.last(),
            c::TEXTURE => s.stacks.texture[s.active_unit()].last(),
            c::MATRIX_PALETTE => s.stacks.palette[s.param(c::CURRENT_PALETTE_MATRIX) as usize].last(),
            _ => None,
        };

        top.cloned().unwrap_or(IDENTITY)
    }

    pub fn palette_matrix(&self, index: usize) -> Mat {
        let s = self.state.borrow();
        s.stacks
            .palette
            .get(index)
            .and_then(|v| v.last())
            .cloned()
            .unwrap_or(IDENTITY)
    }

    pub fn matrix_depth(&self, mode: GLenum) -> usize {
        let s = self.state.borrow();
        match mode {
            c::MODELVIEW => s.stacks.modelview.len(),
            c::PROJECTION => s.stacks.projection.len(),
            _ => 1,
        }
    }

    /// The values last uploaded to the uniform `name` of `program`.
    pub fn uniform(&self, program: GLuint, name: &str) -> Option<Vec<f32>> {
        let s = self.state.borrow();
        let obj = s.programs.get(&program)?;
        let location = obj.location(name);
        if location < 0 {
            return None;
        }

        Some(obj.values.get(&location).cloned().unwrap_or_default())
    }

    /// The attribute layout of a linked program, ordered by location.
    pub fn attrib_layout(&self, program: GLuint) -> Vec<(String, GLint)> {
        let s = self.state.borrow();
        let mut v: Vec<_> = s
            .programs
            .get(&program)
            .map(|v| {
                v.attributes
                    .iter()
                    .map(|(a, l)| (a.name.clone(), *l))
                    .collect()
            })
            .unwrap_or_default();
        v.sort_by_key(|v| v.1);
        v
    }

    /// Reads a pixel of the default framebuffer. `(0, 0)` is the bottom-left corner.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        self.state.borrow().screen.get(x, y)
    }

    /// The first texel of the 2D texture bound to `unit`, or `None` if nothing is bound.
    pub fn bound_texel(&self, unit: usize) -> Option<[u8; 4]> {
        let s = self.state.borrow();
        let id = s.textures_2d[unit];
        if id == 0 {
            return None;
        }

        s.textures.get(&id).map(|v| v.surface.get(0, 0))
    }

    /// The number of GL objects that have not been deleted.
    pub fn live_objects(&self) -> usize {
        let s = self.state.borrow();
        s.textures.len()
            + s.buffers.len()
            + s.framebuffers.len()
            + s.renderbuffers.len()
            + s.shaders.len()
            + s.programs.values().filter(|v| !v.deleted).count()
    }

    pub fn live_programs(&self) -> usize {
        let s = self.state.borrow();
        s.programs.values().filter(|v| !v.deleted).count()
    }

    pub fn framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    /// The number of draw calls received.
    pub fn draws(&self) -> usize {
        self.state.borrow().draws
    }
}

fn write_out<T: Copy>(out: &mut [T], values: &[T]) {
    for (o, v) in out.iter_mut().zip(values.iter()) {
        *o = *v;
    }
}

fn light_default(light: GLenum, pname: GLenum) -> [f32; 4] {
    let first = light == c::LIGHT0;
    match pname {
        c::AMBIENT => [0.0, 0.0, 0.0, 1.0],
        c::DIFFUSE | c::SPECULAR if first => [1.0, 1.0, 1.0, 1.0],
        c::DIFFUSE | c::SPECULAR => [0.0, 0.0, 0.0, 1.0],
        c::POSITION => [0.0, 0.0, 1.0, 0.0],
        c::SPOT_DIRECTION => [0.0, 0.0, -1.0, 0.0],
        c::SPOT_CUTOFF => [180.0, 0.0, 0.0, 0.0],
        c::CONSTANT_ATTENUATION => [1.0, 0.0, 0.0, 0.0],
        _ => [0.0; 4],
    }
}

fn is_light_param(pname: GLenum) -> bool {
    match pname {
        c::AMBIENT
        | c::DIFFUSE
        | c::SPECULAR
        | c::POSITION
        | c::SPOT_DIRECTION
        | c::SPOT_EXPONENT
        | c::SPOT_CUTOFF
        | c::CONSTANT_ATTENUATION
        | c::LINEAR_ATTENUATION
        | c::QUADRATIC_ATTENUATION => true,
        _ => false,
    }
}

impl Driver for HeadlessDriver {
    fn get_error(&mut self) -> GLenum {
        let mut s = self.state.borrow_mut();
        *s.calls.entry("glGetError").or_insert(0) += 1;
        if s.errors.is_empty() {
            c::NO_ERROR
        } else {
            s.errors.remove(0)
        }
    }

    fn get_string(&mut self, name: GLenum) -> Option<String> {
        self.with("glGetString", |s| match name {
            c::VERSION => Some(s.version.clone()),
            c::VENDOR => Some("cc3".into()),
            c::RENDERER => Some("Headless".into()),
            c::EXTENSIONS => Some(s.extensions.clone()),
            c::SHADING_LANGUAGE_VERSION => Some("1.20".into()),
            _ => {
                s.error(c::INVALID_ENUM);
                None
            }
        })
    }

    fn get_integerv(&mut self, pname: GLenum, out: &mut [GLint]) {
        self.with("glGetIntegerv", |s| {
            if let Some(v) = s.query(pname) {
                let v: Vec<GLint> = v.into_iter().map(|v| v as GLint).collect();
                write_out(out, &v);
            }
        })
    }

    fn get_floatv(&mut self, pname: GLenum, out: &mut [GLfloat]) {
        self.with("glGetFloatv", |s| {
            if let Some(v) = s.query(pname) {
                let v: Vec<GLfloat> = v.into_iter().map(|v| v as GLfloat).collect();
                write_out(out, &v);
            }
        })
    }

    fn get_booleanv(&mut self, pname: GLenum, out: &mut [bool]) {
        self.with("glGetBooleanv", |s| {
            if let Some(v) = s.query(pname) {
                let v: Vec<bool> = v.into_iter().map(|v| v != 0.0).collect();
                write_out(out, &v);
            }
        })
    }

    fn is_enabled(&mut self, cap: GLenum) -> bool {
        self.with("glIsEnabled", |s| {
            if let Some(k) = s.client_key(cap) {
                return s.clients.get(&k).map(|v| v.enabled).unwrap_or(false);
            }

            match s.capability_key(cap) {
                Some(k) => s.enabled.contains(&k),
                None => {
                    s.error(c::INVALID_ENUM);
                    false
                }
            }
        })
    }

    fn enable(&mut self, cap: GLenum) {
        self.with("glEnable", |s| match s.capability_key(cap) {
            Some(k) => {
                s.enabled.insert(k);
            }
            None => s.error(c::INVALID_ENUM),
        })
    }

    fn disable(&mut self, cap: GLenum) {
        self.with("glDisable", |s| match s.capability_key(cap) {
            Some(k) => {
                s.enabled.remove(&k);
            }
            None => s.error(c::INVALID_ENUM),
        })
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.with("glClearColor", |s| {
            let v = [r, g, b, a].iter().map(|v| f64::from(v.max(0.0).min(1.0))).collect::<Vec<_>>();
            s.set(c::COLOR_CLEAR_VALUE, &v);
        })
    }

    fn clear_depth(&mut self, depth: f32) {
        self.with("glClearDepth", |s| {
            s.set(c::DEPTH_CLEAR_VALUE, &[f64::from(depth.max(0.0).min(1.0))])
        })
    }

    fn clear_stencil(&mut self, v: GLint) {
        self.with("glClearStencil", |s| s.set(c::STENCIL_CLEAR_VALUE, &[f64::from(v)]))
    }

    fn clear(&mut self, mask: GLbitfield) {
        self.with("glClear", |s| {
            if s.framebuffer_status() != c::FRAMEBUFFER_COMPLETE {
                s.error(c::INVALID_FRAMEBUFFER_OPERATION);
                return;
            }

            s.clear(mask)
        })
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.with("glColorMask", |s| {
            let v: Vec<f64> = [r, g, b, a].iter().map(|v| if *v { 1.0 } else { 0.0 }).collect();
            s.set(c::COLOR_WRITEMASK, &v);
        })
    }

    fn depth_mask(&mut self, flag: bool) {
        self.with("glDepthMask", |s| {
            s.set(c::DEPTH_WRITEMASK, &[if flag { 1.0 } else { 0.0 }])
        })
    }

    fn stencil_mask(&mut self, mask: GLuint) {
        self.with("glStencilMask", |s| {
            s.set(c::STENCIL_WRITEMASK, &[f64::from(mask as GLint)])
        })
    }

    fn depth_func(&mut self, func: GLenum) {
        self.with("glDepthFunc", |s| {
            if func < c::NEVER || func > c::ALWAYS {
                s.error(c::INVALID_ENUM);
            } else {
                s.set(c::DEPTH_FUNC, &[f64::from(func)]);
            }
        })
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        self.with("glDepthRangef", |s| {
            s.set(c::DEPTH_RANGE, &[f64::from(near), f64::from(far)])
        })
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.with("glPolygonOffset", |s| {
            s.set(c::POLYGON_OFFSET_FACTOR, &[f64::from(factor)]);
            s.set(c::POLYGON_OFFSET_UNITS, &[f64::from(units)]);
        })
    }

    fn line_width(&mut self, width: f32) {
        self.with("glLineWidth", |s| {
            if width <= 0.0 {
                s.error(c::INVALID_VALUE);
            } else {
                s.set(c::LINE_WIDTH, &[f64::from(width)]);
            }
        })
    }

    fn point_size(&mut self, size: f32) {
        self.with("glPointSize", |s| {
            if size <= 0.0 {
                s.error(c::INVALID_VALUE);
            } else {
                s.set(c::POINT_SIZE, &[f64::from(size)]);
            }
        })
    }

    fn point_parameterfv(&mut self, pname: GLenum, params: &[f32]) {
        self.with("glPointParameterfv", |s| match pname {
            c::POINT_SIZE_MIN | c::POINT_SIZE_MAX | c::POINT_FADE_THRESHOLD_SIZE => {
                s.set(pname, &[f64::from(params[0])])
            }
            c::POINT_DISTANCE_ATTENUATION => {
                let v: Vec<f64> = params.iter().take(3).map(|v| f64::from(*v)).collect();
                s.set(pname, &v)
            }
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn alpha_func(&mut self, func: GLenum, reference: f32) {
        self.with("glAlphaFunc", |s| {
            s.set(c::ALPHA_TEST_FUNC, &[f64::from(func)]);
            s.set(c::ALPHA_TEST_REF, &[f64::from(reference.max(0.0).min(1.0))]);
        })
    }

    fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum) {
        self.with("glBlendFuncSeparate", |s| {
            s.set(c::BLEND_SRC_RGB, &[f64::from(src_rgb)]);
            s.set(c::BLEND_DST_RGB, &[f64::from(dst_rgb)]);
            s.set(c::BLEND_SRC_ALPHA, &[f64::from(src_a)]);
            s.set(c::BLEND_DST_ALPHA, &[f64::from(dst_a)]);
        })
    }

    fn blend_equation_separate(&mut self, rgb: GLenum, alpha: GLenum) {
        self.with("glBlendEquationSeparate", |s| {
            s.set(c::BLEND_EQUATION_RGB, &[f64::from(rgb)]);
            s.set(c::BLEND_EQUATION_ALPHA, &[f64::from(alpha)]);
        })
    }

    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        self.with("glStencilFunc", |s| {
            s.set(c::STENCIL_FUNC, &[f64::from(func)]);
            s.set(c::STENCIL_REF, &[f64::from(reference)]);
            s.set(c::STENCIL_VALUE_MASK, &[f64::from(mask as GLint)]);
        })
    }

    fn stencil_op(&mut self, fail: GLenum, zfail: GLenum, zpass: GLenum) {
        self.with("glStencilOp", |s| {
            s.set(c::STENCIL_FAIL, &[f64::from(fail)]);
            s.set(c::STENCIL_PASS_DEPTH_FAIL, &[f64::from(zfail)]);
            s.set(c::STENCIL_PASS_DEPTH_PASS, &[f64::from(zpass)]);
        })
    }

    fn cull_face(&mut self, mode: GLenum) {
        self.with("glCullFace", |s| match mode {
            c::FRONT | c::BACK | c::FRONT_AND_BACK => s.set(c::CULL_FACE_MODE, &[f64::from(mode)]),
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn front_face(&mut self, mode: GLenum) {
        self.with("glFrontFace", |s| match mode {
            c::CW | c::CCW => s.set(c::FRONT_FACE, &[f64::from(mode)]),
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn viewport(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.with("glViewport", |s| {
            if width < 0 || height < 0 {
                s.error(c::INVALID_VALUE);
            } else {
                let v = [x, y, width, height].iter().map(|v| f64::from(*v)).collect::<Vec<_>>();
                s.set(c::VIEWPORT, &v);
            }
        })
    }

    fn scissor(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.with("glScissor", |s| {
            if width < 0 || height < 0 {
                s.error(c::INVALID_VALUE);
            } else {
                let v = [x, y, width, height].iter().map(|v| f64::from(*v)).collect::<Vec<_>>();
                s.set(c::SCISSOR_BOX, &v);
            }
        })
    }

    fn hint(&mut self, target: GLenum, mode: GLenum) {
        self.with("glHint", |s| {
            if !s.params.contains_key(&target) || mode < c::DONT_CARE || mode > c::NICEST {
                s.error(c::INVALID_ENUM);
            } else {
                s.set(target, &[f64::from(mode)]);
            }
        })
    }

    fn shade_model(&mut self, mode: GLenum) {
        self.with("glShadeModel", |s| match mode {
            c::FLAT | c::SMOOTH => s.set(c::SHADE_MODEL, &[f64::from(mode)]),
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn materialfv(&mut self, _: GLenum, pname: GLenum, params: &[f32]) {
        self.with("glMaterialfv", |s| {
            let mut v = [0.0; 4];
            write_out(&mut v, params);
            match pname {
                c::AMBIENT | c::DIFFUSE | c::SPECULAR | c::EMISSION | c::SHININESS => {
                    s.materials.insert(pname, v);
                }
                _ => s.error(c::INVALID_ENUM),
            }
        })
    }

    fn get_materialfv(&mut self, _: GLenum, pname: GLenum, out: &mut [f32]) {
        self.with("glGetMaterialfv", |s| match s.materials.get(&pname) {
            Some(v) => write_out(out, v),
            None => s.error(c::INVALID_ENUM),
        })
    }

    fn lightfv(&mut self, light: GLenum, pname: GLenum, params: &[f32]) {
        self.with("glLightfv", |s| {
            if light < c::LIGHT0 || light >= c::LIGHT0 + MAX_LIGHTS || !is_light_param(pname) {
                s.error(c::INVALID_ENUM);
                return;
            }

            let mut v = [0.0; 4];
            write_out(&mut v, params);
            s.lights.insert((light, pname), v);
        })
    }

    fn get_lightfv(&mut self, light: GLenum, pname: GLenum, out: &mut [f32]) {
        self.with("glGetLightfv", |s| {
            if light < c::LIGHT0 || light >= c::LIGHT0 + MAX_LIGHTS || !is_light_param(pname) {
                s.error(c::INVALID_ENUM);
                return;
            }

            let v = s
                .lights
                .get(&(light, pname))
                .cloned()
                .unwrap_or_else(|| light_default(light, pname));
            write_out(out, &v);
        })
    }

    fn light_modelfv(&mut self, pname: GLenum, params: &[f32]) {
        self.with("glLightModelfv", |s| match pname {
            c::LIGHT_MODEL_AMBIENT | c::LIGHT_MODEL_TWO_SIDE => {
                let v: Vec<f64> = params.iter().map(|v| f64::from(*v)).collect();
                s.set(pname, &v);
            }
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn fogfv(&mut self, pname: GLenum, params: &[f32]) {
        self.with("glFogfv", |s| match pname {
            c::FOG_COLOR | c::FOG_MODE | c::FOG_DENSITY | c::FOG_START | c::FOG_END => {
                let v: Vec<f64> = params.iter().map(|v| f64::from(*v)).collect();
                s.set(pname, &v);
            }
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn matrix_mode(&mut self, mode: GLenum) {
        self.with("glMatrixMode", |s| match mode {
            c::MODELVIEW | c::PROJECTION | c::TEXTURE | c::MATRIX_PALETTE => {
                s.set(c::MATRIX_MODE, &[f64::from(mode)])
            }
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn load_identity(&mut self) {
        self.with("glLoadIdentity", |s| s.with_top(|m| *m = IDENTITY))
    }

    fn load_matrixf(&mut self, v: &[f32; 16]) {
        self.with("glLoadMatrixf", |s| s.with_top(|m| *m = *v))
    }

    fn mult_matrixf(&mut self, v: &[f32; 16]) {
        self.with("glMultMatrixf", |s| s.with_top(|m| *m = mat_mul(m, v)))
    }

    fn push_matrix(&mut self) {
        self.with("glPushMatrix", |s| {
            let limit = s.stack_limit();
            let overflow = match s.matrix_stack() {
                Some(stack) if stack.len() >= limit => true,
                Some(stack) => {
                    let top = stack.last().cloned().unwrap_or(IDENTITY);
                    stack.push(top);
                    false
                }
                None => false,
            };

            if overflow {
                s.error(c::STACK_OVERFLOW);
            }
        })
    }

    fn pop_matrix(&mut self) {
        self.with("glPopMatrix", |s| {
            let underflow = match s.matrix_stack() {
                Some(stack) if stack.len() <= 1 => true,
                Some(stack) => {
                    stack.pop();
                    false
                }
                None => false,
            };

            if underflow {
                s.error(c::STACK_UNDERFLOW);
            }
        })
    }

    fn current_palette_matrix(&mut self, index: GLuint) {
        self.with("glCurrentPaletteMatrixOES", |s| {
            if (index as usize) < MAX_PALETTE_MATRICES {
                s.set(c::CURRENT_PALETTE_MATRIX, &[f64::from(index)]);
            } else {
                s.error(c::INVALID_VALUE);
            }
        })
    }

    fn load_palette_from_modelview_matrix(&mut self) {
        self.with("glLoadPaletteFromModelViewMatrixOES", |s| {
            let top = s.stacks.modelview.last().cloned().unwrap_or(IDENTITY);
            let index = s.param(c::CURRENT_PALETTE_MATRIX) as usize;
            if let Some(m) = s.stacks.palette.get_mut(index).and_then(|v| v.last_mut()) {
                *m = top;
            }
        })
    }

    fn active_texture(&mut self, unit: GLenum) {
        self.with("glActiveTexture", |s| {
            if let Some(unit) = s.unit_of(unit, MAX_TEXTURE_UNITS) {
                s.set(c::ACTIVE_TEXTURE, &[f64::from(unit)]);
            }
        })
    }

    fn client_active_texture(&mut self, unit: GLenum) {
        self.with("glClientActiveTexture", |s| {
            if let Some(unit) = s.unit_of(unit, MAX_TEXTURE_UNITS) {
                s.set(c::CLIENT_ACTIVE_TEXTURE, &[f64::from(unit)]);
            }
        })
    }

    fn gen_texture(&mut self) -> GLuint {
        self.with("glGenTextures", |s| {
            let id = s.name();
            s.textures.insert(id, TextureObject::default());
            id
        })
    }

    fn delete_texture(&mut self, id: GLuint) {
        self.with("glDeleteTextures", |s| {
            if s.textures.remove(&id).is_some() {
                for v in s.textures_2d.iter_mut().chain(s.textures_cube.iter_mut()) {
                    if *v == id {
                        *v = 0;
                    }
                }
            }
        })
    }

    fn bind_texture(&mut self, target: GLenum, id: GLuint) {
        self.with("glBindTexture", |s| {
            if id != 0 && !s.textures.contains_key(&id) {
                s.textures.insert(id, TextureObject::default());
            }

            let unit = s.active_unit();
            match target {
                c::TEXTURE_2D => s.textures_2d[unit] = id,
                c::TEXTURE_CUBE_MAP => s.textures_cube[unit] = id,
                _ => s.error(c::INVALID_ENUM),
            }
        })
    }

    fn tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        _: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        pixels: Option<&[u8]>,
    ) {
        self.with("glTexImage2D", |s| {
            if width < 0 || height < 0 {
                s.error(c::INVALID_VALUE);
                return;
            }

            let unit = s.active_unit();
            let id = if target == c::TEXTURE_2D {
                s.textures_2d[unit]
            } else if target >= c::TEXTURE_CUBE_MAP_POSITIVE_X && target < c::TEXTURE_CUBE_MAP_POSITIVE_X + 6 {
                s.textures_cube[unit]
            } else {
                s.error(c::INVALID_ENUM);
                return;
            };

            if id == 0 {
                s.error(c::INVALID_OPERATION);
                return;
            }

            if level != 0 {
                return;
            }

            let mut surface = Surface::new(width as usize, height as usize);
            if let Some(data) = pixels {
                if format == c::RGBA && ty == c::UNSIGNED_BYTE {
                    write_out(&mut surface.pixels, data);
                }
            }

            if let Some(obj) = s.textures.get_mut(&id) {
                obj.surface = surface;
            }
        })
    }

    fn tex_parameteri(&mut self, target: GLenum, _: GLenum, _: GLint) {
        self.with("glTexParameteri", |s| match target {
            c::TEXTURE_2D | c::TEXTURE_CUBE_MAP => (),
            _ => s.error(c::INVALID_ENUM),
        })
    }

    fn gen_buffer(&mut self) -> GLuint {
        self.with("glGenBuffers", |s| {
            let id = s.name();
            s.buffers.insert(id, Vec::new());
            id
        })
    }

    fn delete_buffer(&mut self, id: GLuint) {
        self.with("glDeleteBuffers", |s| {
            if s.buffers.remove(&id).is_none() {
                return;
            }

            for pname in &[c::ARRAY_BUFFER_BINDING, c::ELEMENT_ARRAY_BUFFER_BINDING] {
                if s.param(*pname) as GLuint == id {
                    s.set(*pname, &[0.0]);
                }
            }
        })
    }

    fn bind_buffer(&mut self, target: GLenum, id: GLuint) {
        self.with("glBindBuffer", |s| {
            let pname = match target {
                c::ARRAY_BUFFER => c::ARRAY_BUFFER_BINDING,
                c::ELEMENT_ARRAY_BUFFER => c::ELEMENT_ARRAY_BUFFER_BINDING,
                _ => {
                    s.error(c::INVALID_ENUM);
                    return;
                }
            };

            if id != 0 && !s.buffers.contains_key(&id) {
                s.buffers.insert(id, Vec::new());
            }

            s.set(pname, &[f64::from(id)]);
        })
    }

    fn buffer_data(&mut self, target: GLenum, size: usize, data: Option<&[u8]>, _: GLenum) {
        self.with("glBufferData", |s| {
            let id = match s.bound_buffer(target) {
                Some(0) => return s.error(c::INVALID_OPERATION),
                Some(v) => v,
                None => return s.error(c::INVALID_ENUM),
            };

            let mut bytes = vec![0; size];
            if let Some(data) = data {
                write_out(&mut bytes, data);
            }

            s.buffers.insert(id, bytes);
        })
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) {
        self.with("glBufferSubData", |s| {
            let id = match s.bound_buffer(target) {
                Some(0) => return s.error(c::INVALID_OPERATION),
                Some(v) => v,
                None => return s.error(c::INVALID_ENUM),
            };

            let fits = match s.buffers.get_mut(&id) {
                Some(buf) if offset + data.len() <= buf.len() => {
                    buf[offset..offset + data.len()].copy_from_slice(data);
                    true
                }
                _ => false,
            };

            if !fits {
                s.error(c::INVALID_VALUE);
            }
        })
    }

    fn gen_framebuffer(&mut self) -> GLuint {
        self.with("glGenFramebuffers", |s| {
            let id = s.name();
            s.framebuffers.insert(id, FramebufferObject::default());
            id
        })
    }

    fn delete_framebuffer(&mut self, id: GLuint) {
        self.with("glDeleteFramebuffers", |s| {
            if s.framebuffers.remove(&id).is_some() && s.bound_framebuffer() == id {
                s.set(c::FRAMEBUFFER_BINDING, &[0.0]);
            }
        })
    }

    fn bind_framebuffer(&mut self, target: GLenum, id: GLuint) {
        self.with("glBindFramebuffer", |s| {
            if target != c::FRAMEBUFFER {
                return s.error(c::INVALID_ENUM);
            }

            if id != 0 && !s.framebuffers.contains_key(&id) {
                s.framebuffers.insert(id, FramebufferObject::default());
            }

            s.set(c::FRAMEBUFFER_BINDING, &[f64::from(id)]);
        })
    }

    fn gen_renderbuffer(&mut self) -> GLuint {
        self.with("glGenRenderbuffers", |s| {
            let id = s.name();
            s.renderbuffers.insert(id, RenderbufferObject::default());
            id
        })
    }

    fn delete_renderbuffer(&mut self, id: GLuint) {
        self.with("glDeleteRenderbuffers", |s| {
            if s.renderbuffers.remove(&id).is_some() && s.bound_renderbuffer() == id {
                s.set(c::RENDERBUFFER_BINDING, &[0.0]);
            }
        })
    }

    fn bind_renderbuffer(&mut self, target: GLenum, id: GLuint) {
        self.with("glBindRenderbuffer", |s| {
            if target != c::RENDERBUFFER {
                return s.error(c::INVALID_ENUM);
            }

            if id != 0 && !s.renderbuffers.contains_key(&id) {
                s.renderbuffers.insert(id, RenderbufferObject::default());
            }

            s.set(c::RENDERBUFFER_BINDING, &[f64::from(id)]);
        })
    }

    fn renderbuffer_storage(&mut self, format: GLenum, width: GLsizei, height: GLsizei) {
        self.renderbuffer_storage_multisample(0, format, width, height);
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: GLsizei,
        format: GLenum,
        width: GLsizei,
        height: GLsizei,
    ) {
        self.with("glRenderbufferStorage", |s| {
            if width < 0 || height < 0 || width > 4096 || height > 4096 || samples > 4 {
                return s.error(c::INVALID_VALUE);
            }

            let id = s.bound_renderbuffer();
            let color = match format {
                c::RGBA4 | c::RGB5_A1 | c::RGB565 | c::RGB8 | c::RGBA8 => true,
                c::DEPTH_COMPONENT16 | c::DEPTH_COMPONENT24 | c::DEPTH24_STENCIL8 | c::STENCIL_INDEX8 => false,
                _ => return s.error(c::INVALID_ENUM),
            };

            match s.renderbuffers.get_mut(&id) {
                Some(obj) if id != 0 => {
                    obj.format = format;
                    obj.samples = samples;
                    obj.width = width as usize;
                    obj.height = height as usize;
                    obj.surface = if color {
                        Some(Surface::new(width as usize, height as usize))
                    } else {
                        None
                    };
                }
                _ => s.error(c::INVALID_OPERATION),
            }
        })
    }

    fn framebuffer_renderbuffer(&mut self, attachment: GLenum, renderbuffer: GLuint) {
        self.with("glFramebufferRenderbuffer", |s| {
            let fbo = s.bound_framebuffer();
            let rb = if renderbuffer == 0 { None } else { Some(renderbuffer) };
            match s.framebuffers.get_mut(&fbo) {
                Some(obj) if fbo != 0 => match attachment {
                    c::COLOR_ATTACHMENT0 => obj.color = rb.map(Attachment::Renderbuffer),
                    c::DEPTH_ATTACHMENT => obj.depth = rb,
                    c::STENCIL_ATTACHMENT => obj.stencil = rb,
                    _ => s.error(c::INVALID_ENUM),
                },
                _ => s.error(c::INVALID_OPERATION),
            }
        })
    }

    fn framebuffer_texture_2d(&mut self, attachment: GLenum, _: GLenum, texture: GLuint) {
        self.with("glFramebufferTexture2D", |s| {
            let fbo = s.bound_framebuffer();
            match s.framebuffers.get_mut(&fbo) {
                Some(obj) if fbo != 0 && attachment == c::COLOR_ATTACHMENT0 => {
                    obj.color = if texture == 0 {
                        None
                    } else {
                        Some(Attachment::Texture(texture))
                    };
                }
                Some(_) if fbo != 0 => s.error(c::INVALID_ENUM),
                _ => s.error(c::INVALID_OPERATION),
            }
        })
    }

    fn check_framebuffer_status(&mut self) -> GLenum {
        self.with("glCheckFramebufferStatus", |s| s.framebuffer_status())
    }

    fn read_pixels(&mut self, x: GLint, y: GLint, width: GLsizei, height: GLsizei, out: &mut [u8]) {
        self.with("glReadPixels", |s| {
            if width < 0 || height < 0 || out.len() < (width * height * 4) as usize {
                return s.error(c::INVALID_VALUE);
            }

            let surface = match s.target() {
                Some(v) => v.clone(),
                None => return s.error(c::INVALID_FRAMEBUFFER_OPERATION),
            };

            for row in 0..height {
                for col in 0..width {
                    let (px, py) = (x + col, y + row);
                    let v = if px < 0 || py < 0 {
                        [0; 4]
                    } else {
                        surface.get(px as usize, py as usize)
                    };

                    let i = ((row * width + col) * 4) as usize;
                    out[i..i + 4].copy_from_slice(&v);
                }
            }
        })
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        self.with("glEnableVertexAttribArray", |s| match s.attribs.get_mut(index as usize) {
            Some(v) => v.enabled = true,
            None => s.error(c::INVALID_VALUE),
        })
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        self.with("glDisableVertexAttribArray", |s| match s.attribs.get_mut(index as usize) {
            Some(v) => v.enabled = false,
            None => s.error(c::INVALID_VALUE),
        })
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
        self.with("glVertexAttribPointer", |s| {
            if size < 1 || size > 4 || stride < 0 {
                return s.error(c::INVALID_VALUE);
            }

            let buffer = s.param(c::ARRAY_BUFFER_BINDING) as GLuint;
            match s.attribs.get_mut(index as usize) {
                Some(v) => {
                    v.size = size;
                    v.ty = ty;
                    v.normalized = normalized;
                    v.stride = stride;
                    v.offset = offset;
                    v.buffer = buffer;
                }
                None => s.error(c::INVALID_VALUE),
            }
        })
    }

    fn get_vertex_attribiv(&mut self, index: GLuint, pname: GLenum) -> GLint {
        self.with("glGetVertexAttribiv", |s| {
            let v = match s.attribs.get(index as usize) {
                Some(v) => *v,
                None => {
                    s.error(c::INVALID_VALUE);
                    return 0;
                }
            };

            match pname {
                c::VERTEX_ATTRIB_ARRAY_ENABLED => v.enabled as GLint,
                c::VERTEX_ATTRIB_ARRAY_SIZE => v.size,
                c::VERTEX_ATTRIB_ARRAY_TYPE => v.ty as GLint,
                c::VERTEX_ATTRIB_ARRAY_STRIDE => v.stride,
                c::VERTEX_ATTRIB_ARRAY_NORMALIZED => v.normalized as GLint,
                c::VERTEX_ATTRIB_ARRAY_BUFFER_BINDING => v.buffer as GLint,
                _ => {
                    s.error(c::INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn enable_client_state(&mut self, array: GLenum) {
        self.with("glEnableClientState", |s| match s.client_key(array) {
            Some(k) => s.clients.entry(k).or_insert_with(Pointer::default).enabled = true,
            None => s.error(c::INVALID_ENUM),
        })
    }

    fn disable_client_state(&mut self, array: GLenum) {
        self.with("glDisableClientState", |s| match s.client_key(array) {
            Some(k) => s.clients.entry(k).or_insert_with(Pointer::default).enabled = false,
            None => s.error(c::INVALID_ENUM),
        })
    }

    fn client_pointer(&mut self, array: GLenum, size: GLint, ty: GLenum, stride: GLsizei, offset: usize) {
        self.with("glClientPointer", |s| {
            let buffer = s.param(c::ARRAY_BUFFER_BINDING) as GLuint;
            match s.client_key(array) {
                Some(k) => {
                    let v = s.clients.entry(k).or_insert_with(Pointer::default);
                    v.size = size;
                    v.ty = ty;
                    v.stride = stride;
                    v.offset = offset;
                    v.buffer = buffer;
                }
                None => s.error(c::INVALID_ENUM),
            }
        })
    }

    fn draw_arrays(&mut self, mode: GLenum, first: GLint, count: GLsizei) {
        self.with("glDrawArrays", |s| {
            if first < 0 || count < 0 {
                return s.error(c::INVALID_VALUE);
            }

            if s.framebuffer_status() != c::FRAMEBUFFER_COMPLETE {
                return s.error(c::INVALID_FRAMEBUFFER_OPERATION);
            }

            let indices: Vec<u32> = (first as u32..(first + count) as u32).collect();
            s.draw(mode, &indices);
        })
    }

    fn draw_elements(&mut self, mode: GLenum, count: GLsizei, ty: GLenum, offset: usize) {
        self.with("glDrawElements", |s| {
            if count < 0 {
                return s.error(c::INVALID_VALUE);
            }

            if s.framebuffer_status() != c::FRAMEBUFFER_COMPLETE {
                return s.error(c::INVALID_FRAMEBUFFER_OPERATION);
            }

            match s.indices(count, ty, offset) {
                Some(indices) => s.draw(mode, &indices),
                None => s.error(c::INVALID_OPERATION),
            }
        })
    }

    fn create_shader(&mut self, stage: GLenum) -> GLuint {
        self.with("glCreateShader", |s| {
            if stage != c::VERTEX_SHADER && stage != c::FRAGMENT_SHADER {
                s.error(c::INVALID_ENUM);
                return 0;
            }

            let id = s.name();
            s.shaders.insert(
                id,
                ShaderObject {
                    stage,
                    source: String::new(),
                    compiled: false,
                    log: String::new(),
                    declarations: Vec::new(),
                },
            );
            id
        })
    }

    fn shader_source(&mut self, shader: GLuint, source: &str) {
        self.with("glShaderSource", |s| match s.shaders.get_mut(&shader) {
            Some(v) => v.source = source.to_owned(),
            None => s.error(c::INVALID_VALUE),
        })
    }

    fn compile_shader(&mut self, shader: GLuint) {
        self.with("glCompileShader", |s| match s.shaders.get_mut(&shader) {
            Some(v) => match parse_declarations(&v.source) {
                Ok(declarations) => {
                    v.compiled = true;
                    v.log.clear();
                    v.declarations = declarations;
                }
                Err(log) => {
                    v.compiled = false;
                    v.log = log;
                    v.declarations.clear();
                }
            },
            None => s.error(c::INVALID_VALUE),
        })
    }

    fn get_shaderiv(&mut self, shader: GLuint, pname: GLenum) -> GLint {
        self.with("glGetShaderiv", |s| {
            let v = match s.shaders.get(&shader) {
                Some(v) => v,
                None => {
                    s.error(c::INVALID_VALUE);
                    return 0;
                }
            };

            match pname {
                c::COMPILE_STATUS => v.compiled as GLint,
                c::INFO_LOG_LENGTH if v.log.is_empty() => 0,
                c::INFO_LOG_LENGTH => v.log.len() as GLint + 1,
                _ => {
                    s.error(c::INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn get_shader_info_log(&mut self, shader: GLuint) -> String {
        self.with("glGetShaderInfoLog", |s| {
            s.shaders.get(&shader).map(|v| v.log.clone()).unwrap_or_default()
        })
    }

    fn delete_shader(&mut self, shader: GLuint) {
        self.with("glDeleteShader", |s| {
            s.shaders.remove(&shader);
        })
    }

    fn create_program(&mut self) -> GLuint {
        self.with("glCreateProgram", |s| {
            let id = s.name();
            s.programs.insert(id, ProgramObject::new());
            id
        })
    }

    fn attach_shader(&mut self, program: GLuint, shader: GLuint) {
        self.with("glAttachShader", |s| {
            if !s.shaders.contains_key(&shader) {
                return s.error(c::INVALID_VALUE);
            }

            match s.programs.get_mut(&program) {
                Some(v) if !v.shaders.contains(&shader) => v.shaders.push(shader),
                Some(_) => s.error(c::INVALID_OPERATION),
                None => s.error(c::INVALID_VALUE),
            }
        })
    }

    fn detach_shader(&mut self, program: GLuint, shader: GLuint) {
        self.with("glDetachShader", |s| match s.programs.get_mut(&program) {
            Some(v) => v.shaders.retain(|v| *v != shader),
            None => s.error(c::INVALID_VALUE),
        })
    }

    fn bind_attrib_location(&mut self, program: GLuint, index: GLuint, name: &str) {
        self.with("glBindAttribLocation", |s| {
            if index as usize >= MAX_VERTEX_ATTRIBS {
                return s.error(c::INVALID_VALUE);
            }

            match s.programs.get_mut(&program) {
                Some(v) => {
                    v.bindings.insert(name.to_owned(), index);
                }
                None => s.error(c::INVALID_VALUE),
            }
        })
    }

    fn link_program(&mut self, program: GLuint) {
        self.with("glLinkProgram", |s| {
            let shaders = match s.programs.get(&program) {
                Some(v) => v.shaders.clone(),
                None => return s.error(c::INVALID_VALUE),
            };

            let mut vs = None;
            let mut fs = None;
            for id in shaders {
                if let Some(v) = s.shaders.get(&id) {
                    if v.stage == c::VERTEX_SHADER {
                        vs = Some(v.clone());
                    } else {
                        fs = Some(v.clone());
                    }
                }
            }

            let result = link(vs, fs, s.programs.get(&program).map(|v| &v.bindings));
            if let Some(obj) = s.programs.get_mut(&program) {
                obj.values.clear();
                match result {
                    Ok(linked) => {
                        obj.linked = true;
                        obj.log.clear();
                        obj.attributes = linked.attributes;
                        obj.uniforms = linked.uniforms;
                        obj.position = linked.position;
                        obj.mvp = linked.mvp;
                        obj.color = linked.color;
                    }
                    Err(log) => {
                        obj.linked = false;
                        obj.log = log;
                        obj.attributes.clear();
                        obj.uniforms.clear();
                    }
                }
            }
        })
    }

    fn get_programiv(&mut self, program: GLuint, pname: GLenum) -> GLint {
        self.with("glGetProgramiv", |s| {
            let v = match s.programs.get(&program) {
                Some(v) => v,
                None => {
                    s.error(c::INVALID_VALUE);
                    return 0;
                }
            };

            match pname {
                c::LINK_STATUS => v.linked as GLint,
                c::INFO_LOG_LENGTH if v.log.is_empty() => 0,
                c::INFO_LOG_LENGTH => v.log.len() as GLint + 1,
                c::ACTIVE_UNIFORMS => v.uniforms.len() as GLint,
                c::ACTIVE_ATTRIBUTES => v.attributes.len() as GLint,
                _ => {
                    s.error(c::INVALID_ENUM);
                    0
                }
            }
        })
    }

    fn get_program_info_log(&mut self, program: GLuint) -> String {
        self.with("glGetProgramInfoLog", |s| {
            s.programs.get(&program).map(|v| v.log.clone()).unwrap_or_default()
        })
    }

    fn delete_program(&mut self, program: GLuint) {
        self.with("glDeleteProgram", |s| {
            if s.param(c::CURRENT_PROGRAM) as GLuint == program {
                if let Some(v) = s.programs.get_mut(&program) {
                    v.deleted = true;
                }
            } else {
                s.programs.remove(&program);
            }
        })
    }

    fn use_program(&mut self, program: GLuint) {
        self.with("glUseProgram", |s| {
            if program != 0 {
                match s.programs.get(&program) {
                    Some(v) if v.linked && !v.deleted => (),
                    Some(_) => return s.error(c::INVALID_OPERATION),
                    None => return s.error(c::INVALID_VALUE),
                }
            }

            let last = s.param(c::CURRENT_PROGRAM) as GLuint;
            if last != program && s.programs.get(&last).map(|v| v.deleted).unwrap_or(false) {
                s.programs.remove(&last);
            }

            s.set(c::CURRENT_PROGRAM, &[f64::from(program)]);
        })
    }

    fn get_active_uniform(&mut self, program: GLuint, index: GLuint) -> Option<ActiveVariable> {
        self.with("glGetActiveUniform", |s| {
            let v = s.programs.get(&program)?.uniforms.get(index as usize)?;
            Some(ActiveVariable {
                name: if v.size > 1 {
                    format!("{}[0]", v.name)
                } else {
                    v.name.clone()
                },
                size: v.size,
                ty: GLenum::from(v.ty),
            })
        })
    }

    fn get_active_attrib(&mut self, program: GLuint, index: GLuint) -> Option<ActiveVariable> {
        self.with("glGetActiveAttrib", |s| {
            let v = s.programs.get(&program)?.attributes.get(index as usize)?;
            Some(v.0.clone())
        })
    }

    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.with("glGetUniformLocation", |s| match s.programs.get(&program) {
            Some(v) if v.linked => v.location(name),
            Some(_) => {
                s.error(c::INVALID_OPERATION);
                -1
            }
            None => {
                s.error(c::INVALID_VALUE);
                -1
            }
        })
    }

    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint {
        self.with("glGetAttribLocation", |s| match s.programs.get(&program) {
            Some(v) if v.linked => v
                .attributes
                .iter()
                .find(|v| v.0.name == name)
                .map(|v| v.1)
                .unwrap_or(-1),
            Some(_) => {
                s.error(c::INVALID_OPERATION);
                -1
            }
            None => {
                s.error(c::INVALID_VALUE);
                -1
            }
        })
    }

    fn uniform_fv(&mut self, location: GLint, components: usize, data: &[f32]) {
        self.with("glUniformfv", |s| {
            upload(s, location, components, data, |ty| {
                ty.matrix_dimension().is_none() && !ty.is_sampler() && ty.components() == components
            })
        })
    }

    fn uniform_iv(&mut self, location: GLint, components: usize, data: &[i32]) {
        self.with("glUniformiv", |s| {
            let data: Vec<f32> = data.iter().map(|v| *v as f32).collect();
            upload(s, location, components, &data, |ty| {
                ty.is_integer() && ty.components() == components
            })
        })
    }

    fn uniform_matrix_fv(&mut self, location: GLint, dimension: usize, data: &[f32]) {
        self.with("glUniformMatrixfv", |s| {
            upload(s, location, dimension * dimension, data, |ty| {
                ty.matrix_dimension() == Some(dimension)
            })
        })
    }

    fn get_uniformfv(&mut self, program: GLuint, location: GLint, out: &mut [f32]) {
        self.with("glGetUniformfv", |s| match s.programs.get(&program) {
            Some(v) if v.slot(location).is_some() => {
                if let Some(values) = v.values.get(&location) {
                    write_out(out, values);
                }
            }
            _ => s.error(c::INVALID_OPERATION),
        })
    }

    fn get_uniformiv(&mut self, program: GLuint, location: GLint, out: &mut [i32]) {
        self.with("glGetUniformiv", |s| match s.programs.get(&program) {
            Some(v) if v.slot(location).is_some() => {
                if let Some(values) = v.values.get(&location) {
                    let values: Vec<i32> = values.iter().map(|v| *v as i32).collect();
                    write_out(out, &values);
                }
            }
            _ => s.error(c::INVALID_OPERATION),
        })
    }

    fn flush(&mut self) {
        self.with("glFlush", |_| ())
    }

    fn finish(&mut self) {
        self.with("glFinish", |_| ())
    }
}

/// Stores uniform values into the current program, one array element per location.
fn upload<F>(s: &mut HeadlessState, location: GLint, components: usize, data: &[f32], accepts: F)
where
    F: Fn(UniformType) -> bool,
{
    if location == -1 {
        return;
    }

    let program = s.param(c::CURRENT_PROGRAM) as GLuint;
    let found = s
        .programs
        .get(&program)
        .filter(|v| v.linked)
        .and_then(|v| v.slot(location))
        .map(|(slot, element)| (slot.ty, slot.size - element));

    let (ty, remaining) = match found {
        Some(v) => v,
        None => return s.error(c::INVALID_OPERATION),
    };

    if !accepts(ty) || components == 0 {
        return s.error(c::INVALID_OPERATION);
    }

    if let Some(obj) = s.programs.get_mut(&program) {
        for (i, chunk) in data.chunks(components).take(remaining as usize).enumerate() {
            obj.values.insert(location + i as GLint, chunk.to_vec());
        }
    }
}

struct Linked {
    attributes: Vec<(ActiveVariable, GLint)>,
    uniforms: Vec<UniformSlot>,
    position: Option<GLint>,
    mvp: Option<GLint>,
    color: FragColor,
}

fn link(
    vs: Option<ShaderObject>,
    fs: Option<ShaderObject>,
    bindings: Option<&FastHashMap<String, GLuint>>,
) -> ::std::result::Result<Linked, String> {
    let vs = vs.ok_or_else(|| "ERROR: No vertex shader attached.".to_owned())?;
    let fs = fs.ok_or_else(|| "ERROR: No fragment shader attached.".to_owned())?;

    if !vs.compiled || !fs.compiled {
        return Err("ERROR: One or more attached shaders not successfully compiled.".into());
    }

    if !vs.source.contains("gl_Position") {
        return Err("ERROR: Vertex shader does not write gl_Position.".into());
    }

    let mut attributes = Vec::new();
    let mut used = FastHashSet::default();
    let declared: Vec<&Declaration> = vs
        .declarations
        .iter()
        .filter(|v| v.qualifier == Qualifier::Attribute)
        .collect();

    for v in &declared {
        if let Some(index) = bindings.and_then(|b| b.get(&v.name)) {
            used.insert(*index);
        }
    }

    let mut position = None;
    for v in &declared {
        let location = match bindings.and_then(|b| b.get(&v.name)) {
            Some(index) => *index,
            None => {
                let free = (0..MAX_VERTEX_ATTRIBS as GLuint)
                    .find(|i| !used.contains(i))
                    .ok_or_else(|| "ERROR: Too many vertex attributes.".to_owned())?;
                used.insert(free);
                free
            }
        };

        if position.is_none() {
            position = Some(location as GLint);
        }

        attributes.push((
            ActiveVariable {
                name: v.name.clone(),
                size: v.size,
                ty: GLenum::from(v.ty),
            },
            location as GLint,
        ));
    }

    let mut uniforms: Vec<UniformSlot> = Vec::new();
    let mut next = 0;
    let mut mvp = None;
    let mut fragment_color = None;

    for (stage, v) in vs
        .declarations
        .iter()
        .map(|v| (c::VERTEX_SHADER, v))
        .chain(fs.declarations.iter().map(|v| (c::FRAGMENT_SHADER, v)))
        .filter(|(_, v)| v.qualifier == Qualifier::Uniform)
    {
        let location = match uniforms.iter().find(|u| u.name == v.name) {
            Some(u) if u.ty != v.ty || u.size != v.size => {
                return Err(format!(
                    "ERROR: Uniform '{}' differs between vertex and fragment shaders.",
                    v.name
                ));
            }
            Some(u) => u.location,
            None => {
                let location = next;
                next += v.size;
                uniforms.push(UniformSlot {
                    name: v.name.clone(),
                    ty: v.ty,
                    size: v.size,
                    location,
                });
                location
            }
        };

        if stage == c::VERTEX_SHADER && v.ty == UniformType::Mat4 && mvp.is_none() {
            mvp = Some(location);
        }

        if stage == c::FRAGMENT_SHADER && v.ty == UniformType::Vec4 && fragment_color.is_none() {
            fragment_color = Some(location);
        }
    }

    let color = match constant_frag_color(&fs.source) {
        Some(v) => FragColor::Constant(v),
        None => fragment_color
            .map(FragColor::Uniform)
            .unwrap_or(FragColor::White),
    };

    Ok(Linked {
        attributes,
        uniforms,
        position,
        mvp,
        color,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const VS: &str = "
        #define LIGHTS 4
        attribute highp vec4 a_cc3Position; // position
        attribute vec3 a_cc3Normal;
        uniform mat4 u_cc3MatrixModelViewProj;
        uniform lowp vec4 u_cc3LightDiffuse[LIGHTS], u_extra;
        /* uniform vec4 u_ignored; */
        void main() { gl_Position = u_cc3MatrixModelViewProj * a_cc3Position; }
    ";

    const FS: &str = "
        precision mediump float;
        uniform lowp vec4 u_cc3Color;
        void main() { gl_FragColor = u_cc3Color; }
    ";

    #[test]
    fn declarations() {
        let v = parse_declarations(VS).unwrap();
        let names: Vec<_> = v.iter().map(|v| (v.name.as_str(), v.size)).collect();
        assert_eq!(
            names,
            vec![
                ("a_cc3Position", 1),
                ("a_cc3Normal", 1),
                ("u_cc3MatrixModelViewProj", 1),
                ("u_cc3LightDiffuse", 4),
                ("u_extra", 1),
            ]
        );

        assert!(parse_declarations("uniform vec4 u;").is_err());
        assert!(parse_declarations("void main() {").is_err());
        assert!(parse_declarations("uniform vex4 u; void main() {}").is_err());
    }

    #[test]
    fn constant_colors() {
        assert_eq!(
            constant_frag_color("void main() { gl_FragColor = vec4(1.0, 0.0, 0.5, 1.0); }"),
            Some([1.0, 0.0, 0.5, 1.0])
        );
        assert_eq!(constant_frag_color(FS), None);
    }

    fn program(driver: &mut HeadlessDriver) -> GLuint {
        let vs = driver.create_shader(c::VERTEX_SHADER);
        driver.shader_source(vs, VS);
        driver.compile_shader(vs);
        let fs = driver.create_shader(c::FRAGMENT_SHADER);
        driver.shader_source(fs, FS);
        driver.compile_shader(fs);

        let p = driver.create_program();
        driver.attach_shader(p, vs);
        driver.attach_shader(p, fs);
        driver.bind_attrib_location(p, 3, "a_cc3Normal");
        driver.link_program(p);
        p
    }

    #[test]
    fn introspection() {
        let mut driver = HeadlessDriver::new(4, 4);
        let p = program(&mut driver);

        assert_eq!(driver.get_programiv(p, c::LINK_STATUS), 1);
        assert_eq!(driver.get_programiv(p, c::ACTIVE_UNIFORMS), 4);
        assert_eq!(driver.get_attrib_location(p, "a_cc3Position"), 0);
        assert_eq!(driver.get_attrib_location(p, "a_cc3Normal"), 3);
        assert_eq!(driver.get_uniform_location(p, "u_cc3LightDiffuse[2]"), 3);
        assert_eq!(driver.get_uniform_location(p, "u_cc3LightDiffuse[4]"), -1);

        let v = driver.get_active_uniform(p, 1).unwrap();
        assert_eq!(v.name, "u_cc3LightDiffuse[0]");
        assert_eq!(v.size, 4);
        assert_eq!(driver.get_error(), c::NO_ERROR);
    }

    #[test]
    fn uniforms() {
        let mut driver = HeadlessDriver::new(4, 4);
        let p = program(&mut driver);

        driver.uniform_fv(0, 4, &[0.0; 4]);
        assert_eq!(driver.get_error(), c::INVALID_OPERATION);

        driver.use_program(p);
        let color = driver.get_uniform_location(p, "u_cc3Color");
        driver.uniform_fv(color, 4, &[1.0, 0.5, 0.25, 1.0]);
        assert_eq!(driver.uniform(p, "u_cc3Color"), Some(vec![1.0, 0.5, 0.25, 1.0]));

        driver.uniform_fv(color, 3, &[1.0, 0.5, 0.25]);
        assert_eq!(driver.get_error(), c::INVALID_OPERATION);

        let mut out = [0.0; 4];
        driver.get_uniformfv(p, color, &mut out);
        assert_eq!(out, [1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn clear_and_read() {
        let mut driver = HeadlessDriver::new(4, 4);
        driver.clear_color(1.0, 0.0, 0.0, 1.0);
        driver.clear(c::COLOR_BUFFER_BIT);
        assert_eq!(driver.pixel(3, 3), [255, 0, 0, 255]);

        let mut out = [0; 4];
        driver.read_pixels(0, 0, 1, 1, &mut out);
        assert_eq!(out, [255, 0, 0, 255]);
        assert_eq!(driver.calls("glClear"), 1);
    }

    #[test]
    fn matrix_stacks() {
        let mut driver = HeadlessDriver::new(4, 4);
        driver.matrix_mode(c::PROJECTION);
        driver.push_matrix();
        assert_eq!(driver.matrix_depth(c::PROJECTION), 2);
        driver.pop_matrix();
        driver.pop_matrix();
        assert_eq!(driver.get_error(), c::STACK_UNDERFLOW);

        driver.matrix_mode(c::MATRIX_PALETTE);
        driver.push_matrix();
        assert_eq!(driver.get_error(), c::STACK_OVERFLOW);
    }

    #[test]
    fn lost() {
        let mut driver = HeadlessDriver::new(4, 4);
        driver.lose_context();
        driver.enable(c::BLEND);
        assert_eq!(driver.get_error(), c::CONTEXT_LOST);
        assert_eq!(driver.get_error(), c::NO_ERROR);
        assert!(!driver.enabled(c::BLEND));
    }
}
