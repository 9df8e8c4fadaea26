//! The GL state cache.
//!
//! Every piece of GL server state the engine touches is mirrored by a `Tracker`. Writes that
//! would not change the driver state are filtered out, and selected state is restored at the
//! end of every frame so that other GL users sharing the context see what they left behind.

pub mod cache;
pub mod tracker;

pub use self::cache::StateCache;
pub use self::tracker::{client_array, Tracker};

use gl::types::*;

use crate::driver::types::{Capability, HintTarget};
use crate::math::Color;

/// How a tracker treats the value GL held before the engine touched it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// Never reads the driver. The value is unknown at the start of every frame.
    Ignore,
    /// Reads the driver once, the first time the slot is opened or written.
    ReadOnce,
    /// Reads the driver at every frame open.
    ReadOncePerFrame,
    /// Reads the driver at every frame open, and restores that value at frame close.
    ReadOncePerFrameAndRestore,
    /// Reads the driver once, and restores that value at every frame close it was changed.
    ReadOnceAndRestore,
}

impl Policy {
    #[inline]
    pub fn reads(self) -> bool {
        self != Policy::Ignore
    }

    #[inline]
    pub fn reads_per_frame(self) -> bool {
        self == Policy::ReadOncePerFrame || self == Policy::ReadOncePerFrameAndRestore
    }

    #[inline]
    pub fn restores(self) -> bool {
        self == Policy::ReadOnceAndRestore || self == Policy::ReadOncePerFrameAndRestore
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Ignore
    }
}

/// Material properties of the fixed-function pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialParam {
    Ambient,
    Diffuse,
    Specular,
    Emission,
    Shininess,
}

/// Per-light properties of the fixed-function pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightParam {
    Ambient,
    Diffuse,
    Specular,
    Position,
    SpotDirection,
    SpotExponent,
    SpotCutoff,
    /// Constant, linear and quadratic attenuation, applied as one unit.
    Attenuation,
}

/// Identifies one tracked piece of GL state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Capability(Capability),
    /// `GL_TEXTURE_2D` enable of a fixed-function texture unit.
    TextureUnitEnabled(u8),

    ClearColor,
    ClearDepth,
    ClearStencil,
    ColorMask,
    DepthMask,
    StencilMask,
    DepthFunc,
    DepthRange,
    PolygonOffset,
    LineWidth,
    PointSize,
    PointSizeAttenuation,
    PointSizeMinimum,
    PointSizeMaximum,
    PointSizeFadeThreshold,
    AlphaFunc,
    BlendFunc,
    BlendEquation,
    StencilFunc,
    StencilOp,
    CullFace,
    FrontFace,
    Viewport,
    Scissor,
    ShadeModel,

    Material(MaterialParam),
    SceneAmbient,
    Light(u8, LightParam),
    FogColor,
    FogMode,
    FogDensity,
    FogStart,
    FogEnd,
    Hint(HintTarget),

    ArrayBuffer,
    IndexBuffer,
    ActiveTexture,
    ClientActiveTexture,
    Texture2D(u8),
    TextureCube(u8),
    Framebuffer,
    Renderbuffer,
    Program,

    MatrixMode,
    PaletteMatrix,

    VertexAttribEnabled(u8),
    VertexAttribPointer(u8),
}

impl Slot {
    /// Slots that only exist in the fixed-function pipeline.
    pub fn is_fixed_function(self) -> bool {
        match self {
            Slot::Capability(v) => v.is_fixed_function(),
            Slot::Hint(v) => v.is_fixed_function(),
            Slot::TextureUnitEnabled(_)
            | Slot::PointSize
            | Slot::PointSizeAttenuation
            | Slot::PointSizeMinimum
            | Slot::PointSizeMaximum
            | Slot::PointSizeFadeThreshold
            | Slot::AlphaFunc
            | Slot::ShadeModel
            | Slot::Material(_)
            | Slot::SceneAmbient
            | Slot::Light(_, _)
            | Slot::FogColor
            | Slot::FogMode
            | Slot::FogDensity
            | Slot::FogStart
            | Slot::FogEnd
            | Slot::ClientActiveTexture
            | Slot::MatrixMode
            | Slot::PaletteMatrix => true,
            _ => false,
        }
    }

    /// The policy a slot gets unless overridden.
    ///
    /// The state a 2D layer sharing the context relies on is restored; everything else is
    /// re-established by whoever draws next.
    pub fn default_policy(self) -> Policy {
        match self {
            Slot::Capability(Capability::Blend)
            | Slot::Capability(Capability::DepthTest)
            | Slot::Capability(Capability::CullFace)
            | Slot::BlendFunc
            | Slot::DepthMask
            | Slot::DepthFunc
            | Slot::ActiveTexture
            | Slot::Program
            | Slot::VertexAttribEnabled(_) => Policy::ReadOnceAndRestore,
            _ => Policy::Ignore,
        }
    }
}

/// A vertex attribute pointer, including the buffer it sources from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AttribPointer {
    pub buffer: GLuint,
    pub size: GLint,
    pub ty: GLenum,
    pub normalized: bool,
    pub stride: GLsizei,
    pub offset: usize,
}

/// The last known value of a slot. Composite values compare, and are applied, as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(GLint),
    UInt(GLuint),
    Enum(GLenum),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Rect([GLint; 4]),
    Mask([bool; 4]),
    AlphaFunc {
        func: GLenum,
        reference: f32,
    },
    BlendFunc {
        src_rgb: GLenum,
        dst_rgb: GLenum,
        src_alpha: GLenum,
        dst_alpha: GLenum,
    },
    BlendEquation {
        rgb: GLenum,
        alpha: GLenum,
    },
    StencilFunc {
        func: GLenum,
        reference: GLint,
        mask: GLuint,
    },
    StencilOp {
        fail: GLenum,
        zfail: GLenum,
        zpass: GLenum,
    },
    Pointer(AttribPointer),
}

impl Value {
    /// A blend function that uses the same factors for color and alpha.
    pub fn blend_func(src: GLenum, dst: GLenum) -> Self {
        Value::BlendFunc {
            src_rgb: src,
            dst_rgb: dst,
            src_alpha: src,
            dst_alpha: dst,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<GLuint> {
        match *self {
            Value::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<GLenum> {
        match *self {
            Value::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<[f32; 4]> {
        match *self {
            Value::Vec4(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Vec4(v.rgba())
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Value::Vec4(v)
    }
}

impl From<AttribPointer> for Value {
    fn from(v: AttribPointer) -> Self {
        Value::Pointer(v)
    }
}
