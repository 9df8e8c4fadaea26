//! Typed views of the GL enumerants the core passes around.

use std::fmt;

use gl::types::*;

use super::consts as c;

/// The programmable stages a shader source unit can target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

impl From<ShaderStage> for GLenum {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => c::VERTEX_SHADER,
            ShaderStage::Fragment => c::FRAGMENT_SHADER,
        }
    }
}

/// Specifies what kind of primitives to render.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Primitive {
    /// The number of faces (or lines, or points) presented by drawing `count` vertices.
    pub fn faces(self, count: u32) -> u32 {
        match self {
            Primitive::Points => count,
            Primitive::Lines => count / 2,
            Primitive::LineLoop => count,
            Primitive::LineStrip => count.saturating_sub(1),
            Primitive::Triangles => count / 3,
            Primitive::TriangleStrip | Primitive::TriangleFan => count.saturating_sub(2),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Primitive::Points => f.write_str("GL_POINTS"),
            v => f.write_str(enum_name(GLenum::from(v))),
        }
    }
}

impl From<Primitive> for GLenum {
    fn from(primitive: Primitive) -> Self {
        match primitive {
            Primitive::Points => c::POINTS,
            Primitive::Lines => c::LINES,
            Primitive::LineLoop => c::LINE_LOOP,
            Primitive::LineStrip => c::LINE_STRIP,
            Primitive::Triangles => c::TRIANGLES,
            Primitive::TriangleStrip => c::TRIANGLE_STRIP,
            Primitive::TriangleFan => c::TRIANGLE_FAN,
        }
    }
}

/// The integer type of vertex indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

impl IndexType {
    pub fn stride(self) -> usize {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

impl From<IndexType> for GLenum {
    fn from(ty: IndexType) -> Self {
        match ty {
            IndexType::U8 => c::UNSIGNED_BYTE,
            IndexType::U16 => c::UNSIGNED_SHORT,
            IndexType::U32 => c::UNSIGNED_INT,
        }
    }
}

/// The component type of a vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Fixed,
}

impl ElementType {
    pub fn size(self) -> usize {
        match self {
            ElementType::Byte | ElementType::UByte => 1,
            ElementType::Short | ElementType::UShort => 2,
            _ => 4,
        }
    }

    pub fn from_gl(v: GLenum) -> Option<Self> {
        Some(match v {
            c::BYTE => ElementType::Byte,
            c::UNSIGNED_BYTE => ElementType::UByte,
            c::SHORT => ElementType::Short,
            c::UNSIGNED_SHORT => ElementType::UShort,
            c::INT => ElementType::Int,
            c::UNSIGNED_INT => ElementType::UInt,
            c::FLOAT => ElementType::Float,
            c::FIXED => ElementType::Fixed,
            _ => return None,
        })
    }
}

impl From<ElementType> for GLenum {
    fn from(ty: ElementType) -> Self {
        match ty {
            ElementType::Byte => c::BYTE,
            ElementType::UByte => c::UNSIGNED_BYTE,
            ElementType::Short => c::SHORT,
            ElementType::UShort => c::UNSIGNED_SHORT,
            ElementType::Int => c::INT,
            ElementType::UInt => c::UNSIGNED_INT,
            ElementType::Float => c::FLOAT,
            ElementType::Fixed => c::FIXED,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferTarget {
    Array,
    Index,
}

impl From<BufferTarget> for GLenum {
    fn from(target: BufferTarget) -> Self {
        match target {
            BufferTarget::Array => c::ARRAY_BUFFER,
            BufferTarget::Index => c::ELEMENT_ARRAY_BUFFER,
        }
    }
}

/// Hint abouts the intended update strategy of the data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferUsage {
    /// The data store contents will be modified once and used many times.
    Static,
    /// The data store contents will be modified repeatedly and used many times.
    Dynamic,
    /// The data store contents will be modified once and used at most a few times.
    Stream,
}

impl From<BufferUsage> for GLenum {
    fn from(usage: BufferUsage) -> Self {
        match usage {
            BufferUsage::Static => c::STATIC_DRAW,
            BufferUsage::Dynamic => c::DYNAMIC_DRAW,
            BufferUsage::Stream => c::STREAM_DRAW,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

impl From<TextureTarget> for GLenum {
    fn from(target: TextureTarget) -> Self {
        match target {
            TextureTarget::Texture2D => c::TEXTURE_2D,
            TextureTarget::CubeMap => c::TEXTURE_CUBE_MAP,
        }
    }
}

/// A depth comparison function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Never,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Always,
}

impl From<Comparison> for GLenum {
    fn from(cmp: Comparison) -> Self {
        match cmp {
            Comparison::Never => c::NEVER,
            Comparison::Less => c::LESS,
            Comparison::LessOrEqual => c::LEQUAL,
            Comparison::Greater => c::GREATER,
            Comparison::GreaterOrEqual => c::GEQUAL,
            Comparison::Equal => c::EQUAL,
            Comparison::NotEqual => c::NOTEQUAL,
            Comparison::Always => c::ALWAYS,
        }
    }
}

/// Specifies how incoming RGBA values (source) and the RGBA in framebuffer (destination)
/// are combined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendEquation {
    /// Adds source and destination. Source and destination are multiplied
    /// by blending parameters before addition.
    Add,
    /// Subtracts destination from source. Source and destination are
    /// multiplied by blending parameters before subtraction.
    Subtract,
    /// Subtracts source from destination. Source and destination are
    /// multiplied by blending parameters before subtraction.
    ReverseSubtract,
}

impl From<BlendEquation> for GLenum {
    fn from(eq: BlendEquation) -> Self {
        match eq {
            BlendEquation::Add => c::FUNC_ADD,
            BlendEquation::Subtract => c::FUNC_SUBTRACT,
            BlendEquation::ReverseSubtract => c::FUNC_REVERSE_SUBTRACT,
        }
    }
}

/// Blend values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

impl From<BlendFactor> for GLenum {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => c::ZERO,
            BlendFactor::One => c::ONE,
            BlendFactor::SrcColor => c::SRC_COLOR,
            BlendFactor::OneMinusSrcColor => c::ONE_MINUS_SRC_COLOR,
            BlendFactor::SrcAlpha => c::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => c::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DstColor => c::DST_COLOR,
            BlendFactor::OneMinusDstColor => c::ONE_MINUS_DST_COLOR,
            BlendFactor::DstAlpha => c::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => c::ONE_MINUS_DST_ALPHA,
            BlendFactor::SrcAlphaSaturate => c::SRC_ALPHA_SATURATE,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

impl From<CullFace> for GLenum {
    fn from(face: CullFace) -> Self {
        match face {
            CullFace::Front => c::FRONT,
            CullFace::Back => c::BACK,
            CullFace::FrontAndBack => c::FRONT_AND_BACK,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

impl From<FrontFace> for GLenum {
    fn from(front: FrontFace) -> Self {
        match front {
            FrontFace::Clockwise => c::CW,
            FrontFace::CounterClockwise => c::CCW,
        }
    }
}

/// How fog attenuates with distance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FogMode {
    Linear,
    Exp,
    Exp2,
}

impl From<FogMode> for GLenum {
    fn from(mode: FogMode) -> Self {
        match mode {
            FogMode::Linear => c::LINEAR,
            FogMode::Exp => c::EXP,
            FogMode::Exp2 => c::EXP2,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShadeModel {
    Flat,
    Smooth,
}

impl From<ShadeModel> for GLenum {
    fn from(model: ShadeModel) -> Self {
        match model {
            ShadeModel::Flat => c::FLAT,
            ShadeModel::Smooth => c::SMOOTH,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HintTarget {
    GenerateMipmap,
    Fog,
    LineSmooth,
    PerspectiveCorrection,
    PointSmooth,
}

impl HintTarget {
    pub fn is_fixed_function(self) -> bool {
        self != HintTarget::GenerateMipmap
    }
}

impl From<HintTarget> for GLenum {
    fn from(hint: HintTarget) -> Self {
        match hint {
            HintTarget::GenerateMipmap => c::GENERATE_MIPMAP_HINT,
            HintTarget::Fog => c::FOG_HINT,
            HintTarget::LineSmooth => c::LINE_SMOOTH_HINT,
            HintTarget::PerspectiveCorrection => c::PERSPECTIVE_CORRECTION_HINT,
            HintTarget::PointSmooth => c::POINT_SMOOTH_HINT,
        }
    }
}

/// A server side capability toggled with `glEnable` and `glDisable`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Blend,
    DepthTest,
    CullFace,
    ScissorTest,
    StencilTest,
    PolygonOffsetFill,
    SampleAlphaToCoverage,
    SampleCoverage,
    Multisample,
    Dither,
    AlphaTest,
    Fog,
    Lighting,
    Light(u8),
    ClipPlane(u8),
    Normalize,
    RescaleNormal,
    ColorMaterial,
    LineSmooth,
    PointSmooth,
    PointSprite,
    MatrixPalette,
    VertexProgramPointSize,
}

impl Capability {
    /// Capabilities which only exist in the fixed-function pipeline.
    pub fn is_fixed_function(self) -> bool {
        match self {
            Capability::AlphaTest
            | Capability::Fog
            | Capability::Lighting
            | Capability::Light(_)
            | Capability::ClipPlane(_)
            | Capability::Normalize
            | Capability::RescaleNormal
            | Capability::ColorMaterial
            | Capability::LineSmooth
            | Capability::PointSmooth
            | Capability::PointSprite
            | Capability::MatrixPalette => true,
            _ => false,
        }
    }

    /// Capabilities every context is expected to track, apart from the indexed ones.
    pub fn common() -> &'static [Capability] {
        &[
            Capability::Blend,
            Capability::DepthTest,
            Capability::CullFace,
            Capability::ScissorTest,
            Capability::StencilTest,
            Capability::PolygonOffsetFill,
            Capability::SampleAlphaToCoverage,
            Capability::SampleCoverage,
            Capability::Multisample,
            Capability::Dither,
            Capability::AlphaTest,
            Capability::Fog,
            Capability::Lighting,
            Capability::Normalize,
            Capability::RescaleNormal,
            Capability::ColorMaterial,
            Capability::LineSmooth,
            Capability::PointSmooth,
            Capability::PointSprite,
            Capability::MatrixPalette,
        ]
    }
}

impl From<Capability> for GLenum {
    fn from(cap: Capability) -> Self {
        match cap {
            Capability::Blend => c::BLEND,
            Capability::DepthTest => c::DEPTH_TEST,
            Capability::CullFace => c::CULL_FACE,
            Capability::ScissorTest => c::SCISSOR_TEST,
            Capability::StencilTest => c::STENCIL_TEST,
            Capability::PolygonOffsetFill => c::POLYGON_OFFSET_FILL,
            Capability::SampleAlphaToCoverage => c::SAMPLE_ALPHA_TO_COVERAGE,
            Capability::SampleCoverage => c::SAMPLE_COVERAGE,
            Capability::Multisample => c::MULTISAMPLE,
            Capability::Dither => c::DITHER,
            Capability::AlphaTest => c::ALPHA_TEST,
            Capability::Fog => c::FOG,
            Capability::Lighting => c::LIGHTING,
            Capability::Light(i) => c::LIGHT0 + GLenum::from(i),
            Capability::ClipPlane(i) => c::CLIP_PLANE0 + GLenum::from(i),
            Capability::Normalize => c::NORMALIZE,
            Capability::RescaleNormal => c::RESCALE_NORMAL,
            Capability::ColorMaterial => c::COLOR_MATERIAL,
            Capability::LineSmooth => c::LINE_SMOOTH,
            Capability::PointSmooth => c::POINT_SMOOTH,
            Capability::PointSprite => c::POINT_SPRITE,
            Capability::MatrixPalette => c::MATRIX_PALETTE,
            Capability::VertexProgramPointSize => c::VERTEX_PROGRAM_POINT_SIZE,
        }
    }
}

/// The depth and stencil configuration of a framebuffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthFormat {
    None,
    D16,
    D24,
    D24S8,
}

impl DepthFormat {
    pub fn has_depth(self) -> bool {
        self != DepthFormat::None
    }

    pub fn has_stencil(self) -> bool {
        self == DepthFormat::D24S8
    }

    pub fn depth_bits(self) -> u32 {
        match self {
            DepthFormat::None => 0,
            DepthFormat::D16 => 16,
            DepthFormat::D24 | DepthFormat::D24S8 => 24,
        }
    }

    /// The renderbuffer internal format, if any storage is needed.
    pub fn internal_format(self) -> Option<GLenum> {
        match self {
            DepthFormat::None => None,
            DepthFormat::D16 => Some(c::DEPTH_COMPONENT16),
            DepthFormat::D24 => Some(c::DEPTH_COMPONENT24),
            DepthFormat::D24S8 => Some(c::DEPTH24_STENCIL8),
        }
    }

    /// Recognizes a renderbuffer internal format.
    pub fn from_internal_format(v: GLenum) -> Option<Self> {
        match v {
            c::DEPTH_COMPONENT16 => Some(DepthFormat::D16),
            c::DEPTH_COMPONENT24 => Some(DepthFormat::D24),
            c::DEPTH24_STENCIL8 => Some(DepthFormat::D24S8),
            _ => None,
        }
    }
}

impl Default for DepthFormat {
    fn default() -> Self {
        DepthFormat::D16
    }
}

/// The declared type of a shader variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Bool,
    BVec2,
    BVec3,
    BVec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
    SamplerCube,
}

impl UniformType {
    pub fn from_gl(v: GLenum) -> Option<Self> {
        Some(match v {
            c::FLOAT => UniformType::Float,
            c::FLOAT_VEC2 => UniformType::Vec2,
            c::FLOAT_VEC3 => UniformType::Vec3,
            c::FLOAT_VEC4 => UniformType::Vec4,
            c::INT => UniformType::Int,
            c::INT_VEC2 => UniformType::IVec2,
            c::INT_VEC3 => UniformType::IVec3,
            c::INT_VEC4 => UniformType::IVec4,
            c::BOOL => UniformType::Bool,
            c::BOOL_VEC2 => UniformType::BVec2,
            c::BOOL_VEC3 => UniformType::BVec3,
            c::BOOL_VEC4 => UniformType::BVec4,
            c::FLOAT_MAT2 => UniformType::Mat2,
            c::FLOAT_MAT3 => UniformType::Mat3,
            c::FLOAT_MAT4 => UniformType::Mat4,
            c::SAMPLER_2D => UniformType::Sampler2D,
            c::SAMPLER_CUBE => UniformType::SamplerCube,
            _ => return None,
        })
    }

    /// Parses a GLSL type keyword.
    pub fn from_glsl(v: &str) -> Option<Self> {
        Some(match v {
            "float" => UniformType::Float,
            "vec2" => UniformType::Vec2,
            "vec3" => UniformType::Vec3,
            "vec4" => UniformType::Vec4,
            "int" => UniformType::Int,
            "ivec2" => UniformType::IVec2,
            "ivec3" => UniformType::IVec3,
            "ivec4" => UniformType::IVec4,
            "bool" => UniformType::Bool,
            "bvec2" => UniformType::BVec2,
            "bvec3" => UniformType::BVec3,
            "bvec4" => UniformType::BVec4,
            "mat2" => UniformType::Mat2,
            "mat3" => UniformType::Mat3,
            "mat4" => UniformType::Mat4,
            "sampler2D" => UniformType::Sampler2D,
            "samplerCube" => UniformType::SamplerCube,
            _ => return None,
        })
    }

    /// The number of scalars in one element.
    pub fn components(self) -> usize {
        match self {
            UniformType::Float
            | UniformType::Int
            | UniformType::Bool
            | UniformType::Sampler2D
            | UniformType::SamplerCube => 1,
            UniformType::Vec2 | UniformType::IVec2 | UniformType::BVec2 => 2,
            UniformType::Vec3 | UniformType::IVec3 | UniformType::BVec3 => 3,
            UniformType::Vec4 | UniformType::IVec4 | UniformType::BVec4 | UniformType::Mat2 => 4,
            UniformType::Mat3 => 9,
            UniformType::Mat4 => 16,
        }
    }

    /// True if the values are uploaded with the integer family of `glUniform`.
    pub fn is_integer(self) -> bool {
        match self {
            UniformType::Int
            | UniformType::IVec2
            | UniformType::IVec3
            | UniformType::IVec4
            | UniformType::Bool
            | UniformType::BVec2
            | UniformType::BVec3
            | UniformType::BVec4
            | UniformType::Sampler2D
            | UniformType::SamplerCube => true,
            _ => false,
        }
    }

    pub fn matrix_dimension(self) -> Option<usize> {
        match self {
            UniformType::Mat2 => Some(2),
            UniformType::Mat3 => Some(3),
            UniformType::Mat4 => Some(4),
            _ => None,
        }
    }

    pub fn is_sampler(self) -> bool {
        self == UniformType::Sampler2D || self == UniformType::SamplerCube
    }
}

impl From<UniformType> for GLenum {
    fn from(ty: UniformType) -> Self {
        match ty {
            UniformType::Float => c::FLOAT,
            UniformType::Vec2 => c::FLOAT_VEC2,
            UniformType::Vec3 => c::FLOAT_VEC3,
            UniformType::Vec4 => c::FLOAT_VEC4,
            UniformType::Int => c::INT,
            UniformType::IVec2 => c::INT_VEC2,
            UniformType::IVec3 => c::INT_VEC3,
            UniformType::IVec4 => c::INT_VEC4,
            UniformType::Bool => c::BOOL,
            UniformType::BVec2 => c::BOOL_VEC2,
            UniformType::BVec3 => c::BOOL_VEC3,
            UniformType::BVec4 => c::BOOL_VEC4,
            UniformType::Mat2 => c::FLOAT_MAT2,
            UniformType::Mat3 => c::FLOAT_MAT3,
            UniformType::Mat4 => c::FLOAT_MAT4,
            UniformType::Sampler2D => c::SAMPLER_2D,
            UniformType::SamplerCube => c::SAMPLER_CUBE,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(enum_name(GLenum::from(*self)))
    }
}

static NAMES: &[(GLenum, &str)] = &[
    (c::NO_ERROR, "GL_NO_ERROR"),
    (c::INVALID_ENUM, "GL_INVALID_ENUM"),
    (c::INVALID_VALUE, "GL_INVALID_VALUE"),
    (c::INVALID_OPERATION, "GL_INVALID_OPERATION"),
    (c::STACK_OVERFLOW, "GL_STACK_OVERFLOW"),
    (c::STACK_UNDERFLOW, "GL_STACK_UNDERFLOW"),
    (c::OUT_OF_MEMORY, "GL_OUT_OF_MEMORY"),
    (c::INVALID_FRAMEBUFFER_OPERATION, "GL_INVALID_FRAMEBUFFER_OPERATION"),
    (c::CONTEXT_LOST, "GL_CONTEXT_LOST"),
    (c::LINES, "GL_LINES"),
    (c::LINE_LOOP, "GL_LINE_LOOP"),
    (c::LINE_STRIP, "GL_LINE_STRIP"),
    (c::TRIANGLES, "GL_TRIANGLES"),
    (c::TRIANGLE_STRIP, "GL_TRIANGLE_STRIP"),
    (c::TRIANGLE_FAN, "GL_TRIANGLE_FAN"),
    (c::NEVER, "GL_NEVER"),
    (c::LESS, "GL_LESS"),
    (c::EQUAL, "GL_EQUAL"),
    (c::LEQUAL, "GL_LEQUAL"),
    (c::GREATER, "GL_GREATER"),
    (c::NOTEQUAL, "GL_NOTEQUAL"),
    (c::GEQUAL, "GL_GEQUAL"),
    (c::ALWAYS, "GL_ALWAYS"),
    (c::SRC_COLOR, "GL_SRC_COLOR"),
    (c::ONE_MINUS_SRC_COLOR, "GL_ONE_MINUS_SRC_COLOR"),
    (c::SRC_ALPHA, "GL_SRC_ALPHA"),
    (c::ONE_MINUS_SRC_ALPHA, "GL_ONE_MINUS_SRC_ALPHA"),
    (c::DST_ALPHA, "GL_DST_ALPHA"),
    (c::ONE_MINUS_DST_ALPHA, "GL_ONE_MINUS_DST_ALPHA"),
    (c::DST_COLOR, "GL_DST_COLOR"),
    (c::ONE_MINUS_DST_COLOR, "GL_ONE_MINUS_DST_COLOR"),
    (c::SRC_ALPHA_SATURATE, "GL_SRC_ALPHA_SATURATE"),
    (c::FUNC_ADD, "GL_FUNC_ADD"),
    (c::FUNC_SUBTRACT, "GL_FUNC_SUBTRACT"),
    (c::FUNC_REVERSE_SUBTRACT, "GL_FUNC_REVERSE_SUBTRACT"),
    (c::FRONT, "GL_FRONT"),
    (c::BACK, "GL_BACK"),
    (c::FRONT_AND_BACK, "GL_FRONT_AND_BACK"),
    (c::CW, "GL_CW"),
    (c::CCW, "GL_CCW"),
    (c::CULL_FACE, "GL_CULL_FACE"),
    (c::LIGHTING, "GL_LIGHTING"),
    (c::COLOR_MATERIAL, "GL_COLOR_MATERIAL"),
    (c::FOG, "GL_FOG"),
    (c::DEPTH_TEST, "GL_DEPTH_TEST"),
    (c::STENCIL_TEST, "GL_STENCIL_TEST"),
    (c::NORMALIZE, "GL_NORMALIZE"),
    (c::ALPHA_TEST, "GL_ALPHA_TEST"),
    (c::DITHER, "GL_DITHER"),
    (c::BLEND, "GL_BLEND"),
    (c::SCISSOR_TEST, "GL_SCISSOR_TEST"),
    (c::POINT_SMOOTH, "GL_POINT_SMOOTH"),
    (c::LINE_SMOOTH, "GL_LINE_SMOOTH"),
    (c::TEXTURE_2D, "GL_TEXTURE_2D"),
    (c::POLYGON_OFFSET_FILL, "GL_POLYGON_OFFSET_FILL"),
    (c::RESCALE_NORMAL, "GL_RESCALE_NORMAL"),
    (c::MULTISAMPLE, "GL_MULTISAMPLE"),
    (c::SAMPLE_ALPHA_TO_COVERAGE, "GL_SAMPLE_ALPHA_TO_COVERAGE"),
    (c::SAMPLE_COVERAGE, "GL_SAMPLE_COVERAGE"),
    (c::POINT_SPRITE, "GL_POINT_SPRITE_OES"),
    (c::MATRIX_PALETTE, "GL_MATRIX_PALETTE_OES"),
    (c::VERTEX_PROGRAM_POINT_SIZE, "GL_VERTEX_PROGRAM_POINT_SIZE"),
    (c::VERTEX_ARRAY, "GL_VERTEX_ARRAY"),
    (c::NORMAL_ARRAY, "GL_NORMAL_ARRAY"),
    (c::COLOR_ARRAY, "GL_COLOR_ARRAY"),
    (c::TEXTURE_COORD_ARRAY, "GL_TEXTURE_COORD_ARRAY"),
    (c::POINT_SIZE_ARRAY, "GL_POINT_SIZE_ARRAY_OES"),
    (c::WEIGHT_ARRAY, "GL_WEIGHT_ARRAY_OES"),
    (c::MATRIX_INDEX_ARRAY, "GL_MATRIX_INDEX_ARRAY_OES"),
    (c::EXP, "GL_EXP"),
    (c::EXP2, "GL_EXP2"),
    (c::LINEAR, "GL_LINEAR"),
    (c::DONT_CARE, "GL_DONT_CARE"),
    (c::FASTEST, "GL_FASTEST"),
    (c::NICEST, "GL_NICEST"),
    (c::FLAT, "GL_FLAT"),
    (c::SMOOTH, "GL_SMOOTH"),
    (c::MODELVIEW, "GL_MODELVIEW"),
    (c::PROJECTION, "GL_PROJECTION"),
    (c::TEXTURE, "GL_TEXTURE"),
    (c::BYTE, "GL_BYTE"),
    (c::UNSIGNED_BYTE, "GL_UNSIGNED_BYTE"),
    (c::SHORT, "GL_SHORT"),
    (c::UNSIGNED_SHORT, "GL_UNSIGNED_SHORT"),
    (c::INT, "GL_INT"),
    (c::UNSIGNED_INT, "GL_UNSIGNED_INT"),
    (c::FLOAT, "GL_FLOAT"),
    (c::FIXED, "GL_FIXED"),
    (c::RGB, "GL_RGB"),
    (c::RGBA, "GL_RGBA"),
    (c::RGBA4, "GL_RGBA4"),
    (c::RGB5_A1, "GL_RGB5_A1"),
    (c::RGBA8, "GL_RGBA8"),
    (c::RGB565, "GL_RGB565"),
    (c::DEPTH_COMPONENT16, "GL_DEPTH_COMPONENT16"),
    (c::DEPTH_COMPONENT24, "GL_DEPTH_COMPONENT24"),
    (c::DEPTH24_STENCIL8, "GL_DEPTH24_STENCIL8"),
    (c::STENCIL_INDEX8, "GL_STENCIL_INDEX8"),
    (c::TEXTURE_CUBE_MAP, "GL_TEXTURE_CUBE_MAP"),
    (c::ARRAY_BUFFER, "GL_ARRAY_BUFFER"),
    (c::ELEMENT_ARRAY_BUFFER, "GL_ELEMENT_ARRAY_BUFFER"),
    (c::STREAM_DRAW, "GL_STREAM_DRAW"),
    (c::STATIC_DRAW, "GL_STATIC_DRAW"),
    (c::DYNAMIC_DRAW, "GL_DYNAMIC_DRAW"),
    (c::FRAMEBUFFER, "GL_FRAMEBUFFER"),
    (c::RENDERBUFFER, "GL_RENDERBUFFER"),
    (c::FRAMEBUFFER_COMPLETE, "GL_FRAMEBUFFER_COMPLETE"),
    (c::FRAMEBUFFER_INCOMPLETE_ATTACHMENT, "GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT"),
    (
        c::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
        "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT",
    ),
    (c::FRAMEBUFFER_UNSUPPORTED, "GL_FRAMEBUFFER_UNSUPPORTED"),
    (c::FRAGMENT_SHADER, "GL_FRAGMENT_SHADER"),
    (c::VERTEX_SHADER, "GL_VERTEX_SHADER"),
    (c::FLOAT_VEC2, "GL_FLOAT_VEC2"),
    (c::FLOAT_VEC3, "GL_FLOAT_VEC3"),
    (c::FLOAT_VEC4, "GL_FLOAT_VEC4"),
    (c::INT_VEC2, "GL_INT_VEC2"),
    (c::INT_VEC3, "GL_INT_VEC3"),
    (c::INT_VEC4, "GL_INT_VEC4"),
    (c::BOOL, "GL_BOOL"),
    (c::BOOL_VEC2, "GL_BOOL_VEC2"),
    (c::BOOL_VEC3, "GL_BOOL_VEC3"),
    (c::BOOL_VEC4, "GL_BOOL_VEC4"),
    (c::FLOAT_MAT2, "GL_FLOAT_MAT2"),
    (c::FLOAT_MAT3, "GL_FLOAT_MAT3"),
    (c::FLOAT_MAT4, "GL_FLOAT_MAT4"),
    (c::SAMPLER_2D, "GL_SAMPLER_2D"),
    (c::SAMPLER_CUBE, "GL_SAMPLER_CUBE"),
];

/// Returns the symbolic name of a GL enumerant, or `"GL_UNKNOWN"`.
///
/// Several GL enumerants share a value (`GL_ZERO`, `GL_POINTS` and `GL_NO_ERROR` are all
/// zero); the error and primitive names win.
pub fn enum_name(v: GLenum) -> &'static str {
    NAMES
        .iter()
        .find(|e| e.0 == v)
        .map(|e| e.1)
        .unwrap_or("GL_UNKNOWN")
}

/// Formats a GL enumerant for diagnostics, falling back to hex for unknown values.
pub fn describe_enum(v: GLenum) -> String {
    match enum_name(v) {
        "GL_UNKNOWN" => format!("0x{:04X}", v),
        name => name.to_owned(),
    }
}

/// The inverse of `enum_name`.
pub fn enum_from_name(name: &str) -> Option<GLenum> {
    NAMES.iter().find(|e| e.1 == name).map(|e| e.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(enum_name(c::BLEND), "GL_BLEND");
        assert_eq!(enum_name(c::NO_ERROR), "GL_NO_ERROR");
        assert_eq!(describe_enum(0xDEAD), "0xDEAD");
        assert_eq!(enum_from_name("GL_FLOAT_MAT4"), Some(c::FLOAT_MAT4));
        assert_eq!(format!("{}", Primitive::TriangleStrip), "GL_TRIANGLE_STRIP");
    }

    #[test]
    fn faces() {
        assert_eq!(Primitive::Triangles.faces(6), 2);
        assert_eq!(Primitive::TriangleStrip.faces(4), 2);
        assert_eq!(Primitive::TriangleFan.faces(5), 3);
        assert_eq!(Primitive::Lines.faces(6), 3);
        assert_eq!(Primitive::LineStrip.faces(0), 0);
        assert_eq!(Primitive::Points.faces(7), 7);
    }

    #[test]
    fn depth_formats() {
        assert!(DepthFormat::D24S8.has_stencil());
        assert!(!DepthFormat::D24.has_stencil());
        assert_eq!(DepthFormat::D16.depth_bits(), 16);
        assert_eq!(DepthFormat::None.internal_format(), None);
        assert_eq!(
            DepthFormat::from_internal_format(c::DEPTH24_STENCIL8),
            Some(DepthFormat::D24S8)
        );
    }

    #[test]
    fn uniform_types() {
        for ty in &[UniformType::Vec3, UniformType::Mat4, UniformType::SamplerCube] {
            assert_eq!(UniformType::from_gl(GLenum::from(*ty)), Some(*ty));
        }

        assert_eq!(UniformType::from_glsl("mat3"), Some(UniformType::Mat3));
        assert_eq!(UniformType::Mat3.components(), 9);
        assert!(UniformType::Sampler2D.is_integer());
    }
}
