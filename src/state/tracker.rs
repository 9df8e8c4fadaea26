use gl::types::*;
use smallvec::SmallVec;

use super::{AttribPointer, LightParam, MaterialParam, Policy, Slot, Value};
use crate::driver::consts as c;
use crate::driver::{get_float, get_integer, Driver};
use crate::settings::Pipeline;

/// The driver side of a group of slots.
pub struct TrackerOps {
    /// Queries the current driver value. `None` means the value can not be known.
    pub read: fn(&mut dyn Driver, Slot) -> Option<Value>,
    /// Issues the GL call that sets the value. Returns false if the value does not fit the slot.
    pub apply: fn(&mut dyn Driver, Slot, &Value) -> bool,
}

/// A cached mirror of one GL state slot.
pub struct Tracker {
    slot: Slot,
    policy: Policy,
    ops: &'static TrackerOps,
    value: Option<Value>,
    original: Option<Value>,
    was_read: bool,
    applied: usize,
}

impl Tracker {
    pub fn new(slot: Slot, policy: Policy, pipeline: Pipeline) -> Self {
        Tracker {
            slot,
            policy,
            ops: ops_of(slot, pipeline),
            value: None,
            original: None,
            was_read: false,
            applied: 0,
        }
    }

    #[inline]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    #[inline]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    /// The last known value, `None` if unknown.
    #[inline]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The value captured from the driver before the engine touched the slot.
    #[inline]
    pub fn original(&self) -> Option<&Value> {
        self.original.as_ref()
    }

    #[inline]
    pub fn was_read(&self) -> bool {
        self.was_read
    }

    /// The number of driver calls issued to change this slot.
    #[inline]
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Reads the driver value into both the cache and the original.
    pub fn read_original(&mut self, driver: &mut dyn Driver) {
        let v = (self.ops.read)(driver, self.slot);
        self.original = v.clone();
        self.value = v;
        self.was_read = true;
    }

    /// Reads the driver value into the cache only. The original is left alone.
    pub fn read_current(&mut self, driver: &mut dyn Driver) -> Option<&Value> {
        self.value = (self.ops.read)(driver, self.slot);
        self.value.as_ref()
    }

    /// Frame open. Returns true if the tracker must be restored at close.
    pub fn open(&mut self, driver: &mut dyn Driver) -> bool {
        match self.policy {
            Policy::Ignore => {
                self.value = None;
                false
            }
            Policy::ReadOnce => {
                if !self.was_read {
                    self.read_original(driver);
                }
                false
            }
            Policy::ReadOnceAndRestore => {
                if self.was_read {
                    // Restored at the last close.
                    self.value = self.original.clone();
                } else {
                    self.read_original(driver);
                }
                false
            }
            Policy::ReadOncePerFrame => {
                self.read_original(driver);
                false
            }
            Policy::ReadOncePerFrameAndRestore => {
                self.read_original(driver);
                true
            }
        }
    }

    /// Returns true if writing `value` would reach the driver.
    #[inline]
    pub fn differs(&self, value: &Value) -> bool {
        self.value.as_ref() != Some(value)
    }

    /// Applies `value` unconditionally.
    pub fn apply(&mut self, driver: &mut dyn Driver, value: Value) -> bool {
        if !(self.ops.apply)(driver, self.slot, &value) {
            warn!("{:?} does not fit slot {:?}.", value, self.slot);
            return false;
        }

        self.applied += 1;
        self.value = Some(value);
        true
    }

    /// Re-applies the original value. Does nothing if it was never known.
    pub fn restore(&mut self, driver: &mut dyn Driver) {
        if let Some(v) = self.original.clone() {
            self.apply(driver, v);
        }
    }

    /// Marks the cached value unknown, so the next write always reaches the driver.
    pub fn invalidate(&mut self) {
        self.value = None;
    }

    /// Forgets everything, including the original value.
    pub fn reset(&mut self) {
        self.value = None;
        self.original = None;
        self.was_read = false;
    }
}

/// Maps a fixed-function vertex array index to its client array.
///
/// Indices `0..6` are vertex, normal, color, point size, weight and matrix index arrays; `6 + i`
/// is the texture coordinate array of unit `i`.
pub fn client_array(index: u8) -> GLenum {
    match index {
        0 => c::VERTEX_ARRAY,
        1 => c::NORMAL_ARRAY,
        2 => c::COLOR_ARRAY,
        3 => c::POINT_SIZE_ARRAY,
        4 => c::WEIGHT_ARRAY,
        5 => c::MATRIX_INDEX_ARRAY,
        _ => c::TEXTURE_COORD_ARRAY,
    }
}

/// The number of fixed-function vertex array indices that are not texture coordinates.
pub const CLIENT_TEXCOORD_BASE: u8 = 6;

/// The slots that must hold a given value before `slot` can be written.
pub fn prerequisites(slot: Slot, value: &Value, pipeline: Pipeline) -> SmallVec<[(Slot, Value); 2]> {
    let mut v = SmallVec::new();
    match slot {
        Slot::Texture2D(unit) | Slot::TextureCube(unit) => {
            v.push((Slot::ActiveTexture, texture_unit(unit)));
        }
        Slot::TextureUnitEnabled(unit) => {
            v.push((Slot::ActiveTexture, texture_unit(unit)));
        }
        Slot::VertexAttribPointer(index) => {
            if let Value::Pointer(ref p) = *value {
                v.push((Slot::ArrayBuffer, Value::UInt(p.buffer)));
            }

            if pipeline == Pipeline::Fixed && index >= CLIENT_TEXCOORD_BASE {
                v.push((Slot::ClientActiveTexture, texture_unit(index - CLIENT_TEXCOORD_BASE)));
            }
        }
        Slot::VertexAttribEnabled(index) => {
            if pipeline == Pipeline::Fixed && index >= CLIENT_TEXCOORD_BASE {
                v.push((Slot::ClientActiveTexture, texture_unit(index - CLIENT_TEXCOORD_BASE)));
            }
        }
        _ => {}
    }
    v
}

#[inline]
fn texture_unit(unit: u8) -> Value {
    Value::Enum(c::TEXTURE0 + GLenum::from(unit))
}

/// Picks the function table of a slot.
pub fn ops_of(slot: Slot, pipeline: Pipeline) -> &'static TrackerOps {
    if pipeline == Pipeline::Programmable && slot.is_fixed_function() {
        return &INERT;
    }

    match slot {
        Slot::Capability(_) | Slot::TextureUnitEnabled(_) => &CAPABILITY,
        Slot::Material(_) | Slot::SceneAmbient | Slot::Light(_, _) | Slot::ShadeModel => &LIGHTING,
        Slot::FogColor | Slot::FogMode | Slot::FogDensity | Slot::FogStart | Slot::FogEnd => &LIGHTING,
        Slot::Hint(_) => &HINT,
        Slot::ArrayBuffer
        | Slot::IndexBuffer
        | Slot::ActiveTexture
        | Slot::ClientActiveTexture
        | Slot::Texture2D(_)
        | Slot::TextureCube(_)
        | Slot::Framebuffer
        | Slot::Renderbuffer
        | Slot::Program => &BINDING,
        Slot::MatrixMode | Slot::PaletteMatrix => &MATRIX,
        Slot::VertexAttribEnabled(_) | Slot::VertexAttribPointer(_) => match pipeline {
            Pipeline::Programmable => &VERTEX_PROGRAMMABLE,
            Pipeline::Fixed => &VERTEX_FIXED,
        },
        _ => &RASTER,
    }
}

/// Fixed-function slots in a programmable context: the value is stored, never applied.
static INERT: TrackerOps = TrackerOps {
    read: read_nothing,
    apply: apply_nothing,
};

static CAPABILITY: TrackerOps = TrackerOps {
    read: read_capability,
    apply: apply_capability,
};

static RASTER: TrackerOps = TrackerOps {
    read: read_raster,
    apply: apply_raster,
};

static LIGHTING: TrackerOps = TrackerOps {
    read: read_lighting,
    apply: apply_lighting,
};

static HINT: TrackerOps = TrackerOps {
    read: read_hint,
    apply: apply_hint,
};

static BINDING: TrackerOps = TrackerOps {
    read: read_binding,
    apply: apply_binding,
};

static MATRIX: TrackerOps = TrackerOps {
    read: read_matrix,
    apply: apply_matrix,
};

static VERTEX_PROGRAMMABLE: TrackerOps = TrackerOps {
    read: read_attrib,
    apply: apply_attrib,
};

static VERTEX_FIXED: TrackerOps = TrackerOps {
    read: read_client_array,
    apply: apply_client_array,
};

fn read_nothing(_: &mut dyn Driver, _: Slot) -> Option<Value> {
    None
}

fn apply_nothing(_: &mut dyn Driver, _: Slot, _: &Value) -> bool {
    true
}

fn read_hint(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    match slot {
        Slot::Hint(target) => Some(Value::Enum(enumerant(driver, target.into()))),
        _ => None,
    }
}

fn apply_hint(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    match (slot, value) {
        (Slot::Hint(target), Value::Enum(mode)) => {
            driver.hint(target.into(), *mode);
            true
        }
        _ => false,
    }
}

fn read_matrix(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    match slot {
        Slot::MatrixMode => Some(Value::Enum(enumerant(driver, c::MATRIX_MODE))),
        Slot::PaletteMatrix => Some(Value::UInt(
            get_integer(driver, c::CURRENT_PALETTE_MATRIX) as GLuint,
        )),
        _ => None,
    }
}

fn apply_matrix(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    match (slot, value) {
        (Slot::MatrixMode, Value::Enum(mode)) => driver.matrix_mode(*mode),
        (Slot::PaletteMatrix, Value::UInt(index)) => driver.current_palette_matrix(*index),
        _ => return false,
    }

    true
}

fn read_attrib(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    match slot {
        Slot::VertexAttribEnabled(index) => {
            let v = driver.get_vertex_attribiv(index.into(), c::VERTEX_ATTRIB_ARRAY_ENABLED);
            Some(Value::Bool(v != 0))
        }
        // The offset of a pointer is not queryable through the integer getters.
        _ => None,
    }
}

fn apply_attrib(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    match (slot, value) {
        (Slot::VertexAttribEnabled(index), Value::Bool(true)) => {
            driver.enable_vertex_attrib_array(index.into())
        }
        (Slot::VertexAttribEnabled(index), Value::Bool(false)) => {
            driver.disable_vertex_attrib_array(index.into())
        }
        (Slot::VertexAttribPointer(index), Value::Pointer(p)) => {
            driver.vertex_attrib_pointer(index.into(), p.size, p.ty, p.normalized, p.stride, p.offset)
        }
        _ => return false,
    }

    true
}

fn read_client_array(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    match slot {
        Slot::VertexAttribEnabled(index) if index >= CLIENT_TEXCOORD_BASE => {
            let unit = c::TEXTURE0 + GLenum::from(index - CLIENT_TEXCOORD_BASE);
            let prev = enumerant(driver, c::CLIENT_ACTIVE_TEXTURE);
            driver.client_active_texture(unit);
            let v = driver.is_enabled(c::TEXTURE_COORD_ARRAY);
            driver.client_active_texture(prev);
            Some(Value::Bool(v))
        }
        Slot::VertexAttribEnabled(index) => Some(Value::Bool(driver.is_enabled(client_array(index)))),
        _ => None,
    }
}

fn apply_client_array(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    match (slot, value) {
        (Slot::VertexAttribEnabled(index), Value::Bool(true)) => {
            driver.enable_client_state(client_array(index))
        }
        (Slot::VertexAttribEnabled(index), Value::Bool(false)) => {
            driver.disable_client_state(client_array(index))
        }
        (Slot::VertexAttribPointer(index), Value::Pointer(p)) => {
            driver.client_pointer(client_array(index), p.size, p.ty, p.stride, p.offset)
        }
        _ => return false,
    }

    true
}

fn read_capability(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    match slot {
        Slot::Capability(cap) => Some(Value::Bool(driver.is_enabled(cap.into()))),
        Slot::TextureUnitEnabled(unit) => {
            let prev = get_integer(driver, c::ACTIVE_TEXTURE) as GLenum;
            driver.active_texture(c::TEXTURE0 + GLenum::from(unit));
            let v = driver.is_enabled(c::TEXTURE_2D);
            driver.active_texture(prev);
            Some(Value::Bool(v))
        }
        _ => None,
    }
}

fn apply_capability(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    let cap = match slot {
        Slot::Capability(cap) => cap.into(),
        Slot::TextureUnitEnabled(_) => c::TEXTURE_2D,
        _ => return false,
    };

    match *value {
        Value::Bool(true) => driver.enable(cap),
        Value::Bool(false) => driver.disable(cap),
        _ => return false,
    }

    true
}

fn floats4(driver: &mut dyn Driver, pname: GLenum) -> [f32; 4] {
    let mut v = [0.0; 4];
    driver.get_floatv(pname, &mut v);
    v
}

fn floats2(driver: &mut dyn Driver, pname: GLenum) -> [f32; 2] {
    let mut v = [0.0; 2];
    driver.get_floatv(pname, &mut v);
    v
}

fn rect(driver: &mut dyn Driver, pname: GLenum) -> [GLint; 4] {
    let mut v = [0; 4];
    driver.get_integerv(pname, &mut v);
    v
}

fn enumerant(driver: &mut dyn Driver, pname: GLenum) -> GLenum {
    get_integer(driver, pname) as GLenum
}

fn read_raster(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    let v = match slot {
        Slot::ClearColor => Value::Vec4(floats4(driver, c::COLOR_CLEAR_VALUE)),
        Slot::ClearDepth => Value::Float(get_float(driver, c::DEPTH_CLEAR_VALUE)),
        Slot::ClearStencil => Value::Int(get_integer(driver, c::STENCIL_CLEAR_VALUE)),
        Slot::ColorMask => {
            let mut v = [true; 4];
            driver.get_booleanv(c::COLOR_WRITEMASK, &mut v);
            Value::Mask(v)
        }
        Slot::DepthMask => {
            let mut v = [true];
            driver.get_booleanv(c::DEPTH_WRITEMASK, &mut v);
            Value::Bool(v[0])
        }
        Slot::StencilMask => Value::UInt(get_integer(driver, c::STENCIL_WRITEMASK) as GLuint),
        Slot::DepthFunc => Value::Enum(enumerant(driver, c::DEPTH_FUNC)),
        Slot::DepthRange => Value::Vec2(floats2(driver, c::DEPTH_RANGE)),
        Slot::PolygonOffset => Value::Vec2([
            get_float(driver, c::POLYGON_OFFSET_FACTOR),
            get_float(driver, c::POLYGON_OFFSET_UNITS),
        ]),
        Slot::LineWidth => Value::Float(get_float(driver, c::LINE_WIDTH)),
        Slot::PointSize => Value::Float(get_float(driver, c::POINT_SIZE)),
        Slot::PointSizeAttenuation => {
            let mut v = [0.0; 3];
            driver.get_floatv(c::POINT_DISTANCE_ATTENUATION, &mut v);
            Value::Vec3(v)
        }
        Slot::PointSizeMinimum => Value::Float(get_float(driver, c::POINT_SIZE_MIN)),
        Slot::PointSizeMaximum => Value::Float(get_float(driver, c::POINT_SIZE_MAX)),
        Slot::PointSizeFadeThreshold => Value::Float(get_float(driver, c::POINT_FADE_THRESHOLD_SIZE)),
        Slot::AlphaFunc => Value::AlphaFunc {
            func: enumerant(driver, c::ALPHA_TEST_FUNC),
            reference: get_float(driver, c::ALPHA_TEST_REF),
        },
        Slot::BlendFunc => Value::BlendFunc {
            src_rgb: enumerant(driver, c::BLEND_SRC_RGB),
            dst_rgb: enumerant(driver, c::BLEND_DST_RGB),
            src_alpha: enumerant(driver, c::BLEND_SRC_ALPHA),
            dst_alpha: enumerant(driver, c::BLEND_DST_ALPHA),
        },
        Slot::BlendEquation => Value::BlendEquation {
            rgb: enumerant(driver, c::BLEND_EQUATION_RGB),
            alpha: enumerant(driver, c::BLEND_EQUATION_ALPHA),
        },
        Slot::StencilFunc => Value::StencilFunc {
            func: enumerant(driver, c::STENCIL_FUNC),
            reference: get_integer(driver, c::STENCIL_REF),
            mask: get_integer(driver, c::STENCIL_VALUE_MASK) as GLuint,
        },
        Slot::StencilOp => Value::StencilOp {
            fail: enumerant(driver, c::STENCIL_FAIL),
            zfail: enumerant(driver, c::STENCIL_PASS_DEPTH_FAIL),
            zpass: enumerant(driver, c::STENCIL_PASS_DEPTH_PASS),
        },
        Slot::CullFace => Value::Enum(enumerant(driver, c::CULL_FACE_MODE)),
        Slot::FrontFace => Value::Enum(enumerant(driver, c::FRONT_FACE)),
        Slot::Viewport => Value::Rect(rect(driver, c::VIEWPORT)),
        Slot::Scissor => Value::Rect(rect(driver, c::SCISSOR_BOX)),
        _ => return None,
    };

    Some(v)
}

fn apply_raster(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    match (slot, value) {
        (Slot::ClearColor, Value::Vec4(v)) => driver.clear_color(v[0], v[1], v[2], v[3]),
        (Slot::ClearDepth, Value::Float(v)) => driver.clear_depth(*v),
        (Slot::ClearStencil, Value::Int(v)) => driver.clear_stencil(*v),
        (Slot::ColorMask, Value::Mask(v)) => driver.color_mask(v[0], v[1], v[2], v[3]),
        (Slot::DepthMask, Value::Bool(v)) => driver.depth_mask(*v),
        (Slot::StencilMask, Value::UInt(v)) => driver.stencil_mask(*v),
        (Slot::DepthFunc, Value::Enum(v)) => driver.depth_func(*v),
        (Slot::DepthRange, Value::Vec2(v)) => driver.depth_range(v[0], v[1]),
        (Slot::PolygonOffset, Value::Vec2(v)) => driver.polygon_offset(v[0], v[1]),
        (Slot::LineWidth, Value::Float(v)) => driver.line_width(*v),
        (Slot::PointSize, Value::Float(v)) => driver.point_size(*v),
        (Slot::PointSizeAttenuation, Value::Vec3(v)) => {
            driver.point_parameterfv(c::POINT_DISTANCE_ATTENUATION, v)
        }
        (Slot::PointSizeMinimum, Value::Float(v)) => driver.point_parameterfv(c::POINT_SIZE_MIN, &[*v]),
        (Slot::PointSizeMaximum, Value::Float(v)) => driver.point_parameterfv(c::POINT_SIZE_MAX, &[*v]),
        (Slot::PointSizeFadeThreshold, Value::Float(v)) => {
            driver.point_parameterfv(c::POINT_FADE_THRESHOLD_SIZE, &[*v])
        }
        (Slot::AlphaFunc, Value::AlphaFunc { func, reference }) => driver.alpha_func(*func, *reference),
        (
            Slot::BlendFunc,
            Value::BlendFunc {
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            },
        ) => driver.blend_func_separate(*src_rgb, *dst_rgb, *src_alpha, *dst_alpha),
        (Slot::BlendEquation, Value::BlendEquation { rgb, alpha }) => {
            driver.blend_equation_separate(*rgb, *alpha)
        }
        (Slot::StencilFunc, Value::StencilFunc { func, reference, mask }) => {
            driver.stencil_func(*func, *reference, *mask)
        }
        (Slot::StencilOp, Value::StencilOp { fail, zfail, zpass }) => {
            driver.stencil_op(*fail, *zfail, *zpass)
        }
        (Slot::CullFace, Value::Enum(v)) => driver.cull_face(*v),
        (Slot::FrontFace, Value::Enum(v)) => driver.front_face(*v),
        (Slot::Viewport, Value::Rect(v)) => driver.viewport(v[0], v[1], v[2], v[3]),
        (Slot::Scissor, Value::Rect(v)) => driver.scissor(v[0], v[1], v[2], v[3]),
        _ => return false,
    }

    true
}

fn material_pname(param: MaterialParam) -> GLenum {
    match param {
        MaterialParam::Ambient => c::AMBIENT,
        MaterialParam::Diffuse => c::DIFFUSE,
        MaterialParam::Specular => c::SPECULAR,
        MaterialParam::Emission => c::EMISSION,
        MaterialParam::Shininess => c::SHININESS,
    }
}

fn light_pname(param: LightParam) -> GLenum {
    match param {
        LightParam::Ambient => c::AMBIENT,
        LightParam::Diffuse => c::DIFFUSE,
        LightParam::Specular => c::SPECULAR,
        LightParam::Position => c::POSITION,
        LightParam::SpotDirection => c::SPOT_DIRECTION,
        LightParam::SpotExponent => c::SPOT_EXPONENT,
        LightParam::SpotCutoff => c::SPOT_CUTOFF,
        LightParam::Attenuation => c::CONSTANT_ATTENUATION,
    }
}

fn read_lighting(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    let v = match slot {
        Slot::ShadeModel => Value::Enum(enumerant(driver, c::SHADE_MODEL)),
        Slot::SceneAmbient => Value::Vec4(floats4(driver, c::LIGHT_MODEL_AMBIENT)),
        Slot::Material(MaterialParam::Shininess) => {
            let mut v = [0.0; 4];
            driver.get_materialfv(c::FRONT, c::SHININESS, &mut v);
            Value::Float(v[0])
        }
        Slot::Material(param) => {
            let mut v = [0.0; 4];
            driver.get_materialfv(c::FRONT, material_pname(param), &mut v);
            Value::Vec4(v)
        }
        Slot::Light(index, param) => {
            let light = c::LIGHT0 + GLenum::from(index);
            let mut v = [0.0; 4];
            match param {
                LightParam::Attenuation => {
                    let mut out = [0.0; 3];
                    let pnames = [
                        c::CONSTANT_ATTENUATION,
                        c::LINEAR_ATTENUATION,
                        c::QUADRATIC_ATTENUATION,
                    ];

                    for (o, pname) in out.iter_mut().zip(pnames.iter()) {
                        driver.get_lightfv(light, *pname, &mut v);
                        *o = v[0];
                    }

                    Value::Vec3(out)
                }
                LightParam::SpotDirection => {
                    driver.get_lightfv(light, c::SPOT_DIRECTION, &mut v);
                    Value::Vec3([v[0], v[1], v[2]])
                }
                LightParam::SpotExponent | LightParam::SpotCutoff => {
                    driver.get_lightfv(light, light_pname(param), &mut v);
                    Value::Float(v[0])
                }
                _ => {
                    driver.get_lightfv(light, light_pname(param), &mut v);
                    Value::Vec4(v)
                }
            }
        }
        Slot::FogColor => Value::Vec4(floats4(driver, c::FOG_COLOR)),
        Slot::FogMode => Value::Enum(enumerant(driver, c::FOG_MODE)),
        Slot::FogDensity => Value::Float(get_float(driver, c::FOG_DENSITY)),
        Slot::FogStart => Value::Float(get_float(driver, c::FOG_START)),
        Slot::FogEnd => Value::Float(get_float(driver, c::FOG_END)),
        _ => return None,
    };

    Some(v)
}

fn apply_lighting(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    match (slot, value) {
        (Slot::ShadeModel, Value::Enum(v)) => driver.shade_model(*v),
        (Slot::SceneAmbient, Value::Vec4(v)) => driver.light_modelfv(c::LIGHT_MODEL_AMBIENT, v),
        (Slot::Material(MaterialParam::Shininess), Value::Float(v)) => {
            driver.materialfv(c::FRONT_AND_BACK, c::SHININESS, &[*v])
        }
        (Slot::Material(param), Value::Vec4(v)) if param != MaterialParam::Shininess => {
            driver.materialfv(c::FRONT_AND_BACK, material_pname(param), v)
        }
        (Slot::Light(index, LightParam::Attenuation), Value::Vec3(v)) => {
            let light = c::LIGHT0 + GLenum::from(index);
            driver.lightfv(light, c::CONSTANT_ATTENUATION, &v[0..1]);
            driver.lightfv(light, c::LINEAR_ATTENUATION, &v[1..2]);
            driver.lightfv(light, c::QUADRATIC_ATTENUATION, &v[2..3]);
        }
        (Slot::Light(index, LightParam::SpotDirection), Value::Vec3(v)) => {
            driver.lightfv(c::LIGHT0 + GLenum::from(index), c::SPOT_DIRECTION, v)
        }
        (Slot::Light(index, param), Value::Float(v))
            if param == LightParam::SpotExponent || param == LightParam::SpotCutoff =>
        {
            driver.lightfv(c::LIGHT0 + GLenum::from(index), light_pname(param), &[*v])
        }
        (Slot::Light(index, param), Value::Vec4(v))
            if param == LightParam::Ambient
                || param == LightParam::Diffuse
                || param == LightParam::Specular
                || param == LightParam::Position =>
        {
            driver.lightfv(c::LIGHT0 + GLenum::from(index), light_pname(param), v)
        }
        (Slot::FogColor, Value::Vec4(v)) => driver.fogfv(c::FOG_COLOR, v),
        (Slot::FogMode, Value::Enum(v)) => driver.fogfv(c::FOG_MODE, &[*v as f32]),
        (Slot::FogDensity, Value::Float(v)) => driver.fogfv(c::FOG_DENSITY, &[*v]),
        (Slot::FogStart, Value::Float(v)) => driver.fogfv(c::FOG_START, &[*v]),
        (Slot::FogEnd, Value::Float(v)) => driver.fogfv(c::FOG_END, &[*v]),
        _ => return false,
    }

    true
}

fn read_binding(driver: &mut dyn Driver, slot: Slot) -> Option<Value> {
    let uint = |driver: &mut dyn Driver, pname| Value::UInt(get_integer(driver, pname) as GLuint);

    let v = match slot {
        Slot::ArrayBuffer => uint(driver, c::ARRAY_BUFFER_BINDING),
        Slot::IndexBuffer => uint(driver, c::ELEMENT_ARRAY_BUFFER_BINDING),
        Slot::Framebuffer => uint(driver, c::FRAMEBUFFER_BINDING),
        Slot::Renderbuffer => uint(driver, c::RENDERBUFFER_BINDING),
        Slot::Program => uint(driver, c::CURRENT_PROGRAM),
        Slot::ActiveTexture => Value::Enum(enumerant(driver, c::ACTIVE_TEXTURE)),
        Slot::ClientActiveTexture => Value::Enum(enumerant(driver, c::CLIENT_ACTIVE_TEXTURE)),
        Slot::Texture2D(unit) | Slot::TextureCube(unit) => {
            let pname = match slot {
                Slot::Texture2D(_) => c::TEXTURE_BINDING_2D,
                _ => c::TEXTURE_BINDING_CUBE_MAP,
            };

            let prev = enumerant(driver, c::ACTIVE_TEXTURE);
            driver.active_texture(c::TEXTURE0 + GLenum::from(unit));
            let v = uint(driver, pname);
            driver.active_texture(prev);
            v
        }
        _ => return None,
    };

    Some(v)
}

fn apply_binding(driver: &mut dyn Driver, slot: Slot, value: &Value) -> bool {
    match (slot, value) {
        (Slot::ArrayBuffer, Value::UInt(v)) => driver.bind_buffer(c::ARRAY_BUFFER, *v),
        (Slot::IndexBuffer, Value::UInt(v)) => driver.bind_buffer(c::ELEMENT_ARRAY_BUFFER, *v),
        (Slot::Framebuffer, Value::UInt(v)) => driver.bind_framebuffer(c::FRAMEBUFFER, *v),
        (Slot::Renderbuffer, Value::UInt(v)) => driver.bind_renderbuffer(c::RENDERBUFFER, *v),
        (Slot::Program, Value::UInt(v)) => driver.use_program(*v),
        (Slot::ActiveTexture, Value::Enum(v)) => driver.active_texture(*v),
        (Slot::ClientActiveTexture, Value::Enum(v)) => driver.client_active_texture(*v),
        (Slot::Texture2D(_), Value::UInt(v)) => driver.bind_texture(c::TEXTURE_2D, *v),
        (Slot::TextureCube(_), Value::UInt(v)) => driver.bind_texture(c::TEXTURE_CUBE_MAP, *v),
        _ => return false,
    }

    true
}

impl Default for AttribPointer {
    fn default() -> Self {
        AttribPointer {
            buffer: 0,
            size: 4,
            ty: c::FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::headless::HeadlessDriver;
    use crate::driver::types::Capability;

    #[test]
    fn policies() {
        let mut driver = HeadlessDriver::new(4, 4);
        let probe = driver.clone();

        let mut once = Tracker::new(Slot::Capability(Capability::Blend), Policy::ReadOnce, Pipeline::Programmable);
        let mut ignore = Tracker::new(Slot::Capability(Capability::Dither), Policy::Ignore, Pipeline::Programmable);

        assert!(!once.open(&mut driver));
        assert_eq!(once.value(), Some(&Value::Bool(false)));
        assert!(!ignore.open(&mut driver));
        assert_eq!(ignore.value(), None);

        // Read only once.
        probe.reset_calls();
        once.open(&mut driver);
        assert_eq!(probe.calls("glIsEnabled"), 0);

        let mut every = Tracker::new(Slot::DepthFunc, Policy::ReadOncePerFrameAndRestore, Pipeline::Programmable);
        assert!(every.open(&mut driver));
        assert!(every.open(&mut driver));
        assert_eq!(probe.calls("glGetIntegerv"), 2);
        assert_eq!(every.original(), Some(&Value::Enum(c::LESS)));
    }

    #[test]
    fn apply_and_restore() {
        let mut driver = HeadlessDriver::new(4, 4);
        let probe = driver.clone();

        let mut t = Tracker::new(Slot::BlendFunc, Policy::ReadOnceAndRestore, Pipeline::Programmable);
        t.open(&mut driver);
        assert!(t.apply(&mut driver, Value::blend_func(c::SRC_ALPHA, c::ONE_MINUS_SRC_ALPHA)));
        assert_eq!(probe.param(c::BLEND_SRC_RGB), vec![f64::from(c::SRC_ALPHA)]);

        t.restore(&mut driver);
        assert_eq!(probe.param(c::BLEND_SRC_RGB), vec![f64::from(c::ONE)]);
        assert_eq!(t.applied(), 2);

        // A value of the wrong shape is refused.
        assert!(!t.apply(&mut driver, Value::Float(1.0)));
        assert_eq!(t.applied(), 2);
    }

    #[test]
    fn inert_in_programmable() {
        let mut driver = HeadlessDriver::new(4, 4);
        let probe = driver.clone();

        let mut t = Tracker::new(Slot::FogDensity, Policy::ReadOnce, Pipeline::Programmable);
        t.open(&mut driver);
        assert_eq!(t.value(), None);
        assert!(t.apply(&mut driver, Value::Float(0.5)));
        assert_eq!(probe.calls("glFogfv"), 0);
        assert_eq!(t.value(), Some(&Value::Float(0.5)));
    }

    #[test]
    fn client_arrays() {
        assert_eq!(client_array(0), c::VERTEX_ARRAY);
        assert_eq!(client_array(5), c::MATRIX_INDEX_ARRAY);
        assert_eq!(client_array(7), c::TEXTURE_COORD_ARRAY);

        let p = AttribPointer {
            buffer: 3,
            ..AttribPointer::default()
        };

        let pre = prerequisites(Slot::VertexAttribPointer(7), &Value::Pointer(p), Pipeline::Fixed);
        assert_eq!(pre.len(), 2);
        assert_eq!(pre[0], (Slot::ArrayBuffer, Value::UInt(3)));
        assert_eq!(pre[1], (Slot::ClientActiveTexture, Value::Enum(c::TEXTURE0 + 1)));

        let pre = prerequisites(Slot::Texture2D(2), &Value::UInt(1), Pipeline::Programmable);
        assert_eq!(&pre[..], &[(Slot::ActiveTexture, Value::Enum(c::TEXTURE0 + 2))]);
    }
}
