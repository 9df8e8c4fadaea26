//! GL enumerants used by the core, including the fixed-function ones that the generated
//! core-profile bindings of the `gl` crate leave out.

#![allow(missing_docs)]

use gl::types::{GLbitfield, GLenum};

pub const NO_ERROR: GLenum = 0;
pub const INVALID_ENUM: GLenum = 0x0500;
pub const INVALID_VALUE: GLenum = 0x0501;
pub const INVALID_OPERATION: GLenum = 0x0502;
pub const STACK_OVERFLOW: GLenum = 0x0503;
pub const STACK_UNDERFLOW: GLenum = 0x0504;
pub const OUT_OF_MEMORY: GLenum = 0x0505;
pub const INVALID_FRAMEBUFFER_OPERATION: GLenum = 0x0506;
pub const CONTEXT_LOST: GLenum = 0x0507;

pub const FALSE: GLenum = 0;
pub const TRUE: GLenum = 1;

pub const DEPTH_BUFFER_BIT: GLbitfield = 0x0000_0100;
pub const STENCIL_BUFFER_BIT: GLbitfield = 0x0000_0400;
pub const COLOR_BUFFER_BIT: GLbitfield = 0x0000_4000;

// Primitives.
pub const POINTS: GLenum = 0x0000;
pub const LINES: GLenum = 0x0001;
pub const LINE_LOOP: GLenum = 0x0002;
pub const LINE_STRIP: GLenum = 0x0003;
pub const TRIANGLES: GLenum = 0x0004;
pub const TRIANGLE_STRIP: GLenum = 0x0005;
pub const TRIANGLE_FAN: GLenum = 0x0006;

// Comparisons.
pub const NEVER: GLenum = 0x0200;
pub const LESS: GLenum = 0x0201;
pub const EQUAL: GLenum = 0x0202;
pub const LEQUAL: GLenum = 0x0203;
pub const GREATER: GLenum = 0x0204;
pub const NOTEQUAL: GLenum = 0x0205;
pub const GEQUAL: GLenum = 0x0206;
pub const ALWAYS: GLenum = 0x0207;

// Stencil operations.
pub const KEEP: GLenum = 0x1E00;
pub const REPLACE: GLenum = 0x1E01;
pub const INCR: GLenum = 0x1E02;
pub const DECR: GLenum = 0x1E03;
pub const INVERT: GLenum = 0x150A;

// Blending.
pub const ZERO: GLenum = 0;
pub const ONE: GLenum = 1;
pub const SRC_COLOR: GLenum = 0x0300;
pub const ONE_MINUS_SRC_COLOR: GLenum = 0x0301;
pub const SRC_ALPHA: GLenum = 0x0302;
pub const ONE_MINUS_SRC_ALPHA: GLenum = 0x0303;
pub const DST_ALPHA: GLenum = 0x0304;
pub const ONE_MINUS_DST_ALPHA: GLenum = 0x0305;
pub const DST_COLOR: GLenum = 0x0306;
pub const ONE_MINUS_DST_COLOR: GLenum = 0x0307;
pub const SRC_ALPHA_SATURATE: GLenum = 0x0308;
pub const FUNC_ADD: GLenum = 0x8006;
pub const FUNC_SUBTRACT: GLenum = 0x800A;
pub const FUNC_REVERSE_SUBTRACT: GLenum = 0x800B;
pub const BLEND_EQUATION_RGB: GLenum = 0x8009;
pub const BLEND_EQUATION_ALPHA: GLenum = 0x883D;
pub const BLEND_DST_RGB: GLenum = 0x80C8;
pub const BLEND_SRC_RGB: GLenum = 0x80C9;
pub const BLEND_DST_ALPHA: GLenum = 0x80CA;
pub const BLEND_SRC_ALPHA: GLenum = 0x80CB;

// Faces.
pub const FRONT: GLenum = 0x0404;
pub const BACK: GLenum = 0x0405;
pub const FRONT_AND_BACK: GLenum = 0x0408;
pub const CW: GLenum = 0x0900;
pub const CCW: GLenum = 0x0901;

// Server capabilities.
pub const CULL_FACE: GLenum = 0x0B44;
pub const LIGHTING: GLenum = 0x0B50;
pub const COLOR_MATERIAL: GLenum = 0x0B57;
pub const FOG: GLenum = 0x0B60;
pub const DEPTH_TEST: GLenum = 0x0B71;
pub const STENCIL_TEST: GLenum = 0x0B90;
pub const NORMALIZE: GLenum = 0x0BA1;
pub const ALPHA_TEST: GLenum = 0x0BC0;
pub const DITHER: GLenum = 0x0BD0;
pub const BLEND: GLenum = 0x0BE2;
pub const COLOR_LOGIC_OP: GLenum = 0x0BF2;
pub const SCISSOR_TEST: GLenum = 0x0C11;
pub const POINT_SMOOTH: GLenum = 0x0B10;
pub const LINE_SMOOTH: GLenum = 0x0B20;
pub const TEXTURE_2D: GLenum = 0x0DE1;
pub const POLYGON_OFFSET_FILL: GLenum = 0x8037;
pub const RESCALE_NORMAL: GLenum = 0x803A;
pub const MULTISAMPLE: GLenum = 0x809D;
pub const SAMPLE_ALPHA_TO_COVERAGE: GLenum = 0x809E;
pub const SAMPLE_ALPHA_TO_ONE: GLenum = 0x809F;
pub const SAMPLE_COVERAGE: GLenum = 0x80A0;
pub const POINT_SPRITE: GLenum = 0x8861;
pub const MATRIX_PALETTE: GLenum = 0x8840;
pub const VERTEX_PROGRAM_POINT_SIZE: GLenum = 0x8642;
pub const CLIP_PLANE0: GLenum = 0x3000;
pub const LIGHT0: GLenum = 0x4000;

// Client arrays.
pub const VERTEX_ARRAY: GLenum = 0x8074;
pub const NORMAL_ARRAY: GLenum = 0x8075;
pub const COLOR_ARRAY: GLenum = 0x8076;
pub const TEXTURE_COORD_ARRAY: GLenum = 0x8078;
pub const POINT_SIZE_ARRAY: GLenum = 0x8B9C;
pub const WEIGHT_ARRAY: GLenum = 0x86AD;
pub const MATRIX_INDEX_ARRAY: GLenum = 0x8844;

// Queries.
pub const LINE_WIDTH: GLenum = 0x0B21;
pub const POINT_SIZE: GLenum = 0x0B11;
pub const CULL_FACE_MODE: GLenum = 0x0B45;
pub const FRONT_FACE: GLenum = 0x0B46;
pub const SHADE_MODEL: GLenum = 0x0B54;
pub const DEPTH_RANGE: GLenum = 0x0B70;
pub const DEPTH_WRITEMASK: GLenum = 0x0B72;
pub const DEPTH_CLEAR_VALUE: GLenum = 0x0B73;
pub const DEPTH_FUNC: GLenum = 0x0B74;
pub const STENCIL_CLEAR_VALUE: GLenum = 0x0B91;
pub const STENCIL_FUNC: GLenum = 0x0B92;
pub const STENCIL_VALUE_MASK: GLenum = 0x0B93;
pub const STENCIL_FAIL: GLenum = 0x0B94;
pub const STENCIL_PASS_DEPTH_FAIL: GLenum = 0x0B95;
pub const STENCIL_PASS_DEPTH_PASS: GLenum = 0x0B96;
pub const STENCIL_REF: GLenum = 0x0B97;
pub const STENCIL_WRITEMASK: GLenum = 0x0B98;
pub const MATRIX_MODE: GLenum = 0x0BA0;
pub const VIEWPORT: GLenum = 0x0BA2;
pub const MODELVIEW_MATRIX: GLenum = 0x0BA6;
pub const PROJECTION_MATRIX: GLenum = 0x0BA7;
pub const TEXTURE_MATRIX: GLenum = 0x0BA8;
pub const ALPHA_TEST_FUNC: GLenum = 0x0BC1;
pub const ALPHA_TEST_REF: GLenum = 0x0BC2;
pub const SCISSOR_BOX: GLenum = 0x0C10;
pub const COLOR_CLEAR_VALUE: GLenum = 0x0C22;
pub const COLOR_WRITEMASK: GLenum = 0x0C23;
pub const LIGHT_MODEL_AMBIENT: GLenum = 0x0B53;
pub const LIGHT_MODEL_TWO_SIDE: GLenum = 0x0B52;
pub const POLYGON_OFFSET_UNITS: GLenum = 0x2A00;
pub const POLYGON_OFFSET_FACTOR: GLenum = 0x8038;
pub const STENCIL_BITS: GLenum = 0x0D57;
pub const DEPTH_BITS: GLenum = 0x0D56;
pub const MAX_LIGHTS: GLenum = 0x0D31;
pub const MAX_CLIP_PLANES: GLenum = 0x0D32;
pub const MAX_TEXTURE_SIZE: GLenum = 0x0D33;
pub const MAX_MODELVIEW_STACK_DEPTH: GLenum = 0x0D36;
pub const MAX_PROJECTION_STACK_DEPTH: GLenum = 0x0D38;
pub const MAX_TEXTURE_STACK_DEPTH: GLenum = 0x0D39;
pub const MAX_VIEWPORT_DIMS: GLenum = 0x0D3A;
pub const MAX_TEXTURE_UNITS: GLenum = 0x84E2;
pub const MAX_PALETTE_MATRICES: GLenum = 0x8842;
pub const MAX_VERTEX_UNITS: GLenum = 0x86A4;
pub const MAX_VERTEX_ATTRIBS: GLenum = 0x8869;
pub const MAX_TEXTURE_IMAGE_UNITS: GLenum = 0x8872;
pub const MAX_COMBINED_TEXTURE_IMAGE_UNITS: GLenum = 0x8B4D;
pub const MAX_VERTEX_UNIFORM_VECTORS: GLenum = 0x8DFB;
pub const MAX_RENDERBUFFER_SIZE: GLenum = 0x84E8;
pub const MAX_SAMPLES: GLenum = 0x8D57;
pub const CURRENT_PALETTE_MATRIX: GLenum = 0x8843;
pub const SAMPLES: GLenum = 0x80A9;
pub const RENDERBUFFER_SAMPLES: GLenum = 0x8CAB;

// Fog.
pub const FOG_DENSITY: GLenum = 0x0B62;
pub const FOG_START: GLenum = 0x0B63;
pub const FOG_END: GLenum = 0x0B64;
pub const FOG_MODE: GLenum = 0x0B65;
pub const FOG_COLOR: GLenum = 0x0B66;
pub const EXP: GLenum = 0x0800;
pub const EXP2: GLenum = 0x0801;
pub const LINEAR: GLenum = 0x2601;

// Points.
pub const POINT_SIZE_MIN: GLenum = 0x8126;
pub const POINT_SIZE_MAX: GLenum = 0x8127;
pub const POINT_FADE_THRESHOLD_SIZE: GLenum = 0x8128;
pub const POINT_DISTANCE_ATTENUATION: GLenum = 0x8129;

// Hints.
pub const PERSPECTIVE_CORRECTION_HINT: GLenum = 0x0C50;
pub const POINT_SMOOTH_HINT: GLenum = 0x0C51;
pub const LINE_SMOOTH_HINT: GLenum = 0x0C52;
pub const FOG_HINT: GLenum = 0x0C54;
pub const GENERATE_MIPMAP_HINT: GLenum = 0x8192;
pub const DONT_CARE: GLenum = 0x1100;
pub const FASTEST: GLenum = 0x1101;
pub const NICEST: GLenum = 0x1102;

// Lighting and materials.
pub const AMBIENT: GLenum = 0x1200;
pub const DIFFUSE: GLenum = 0x1201;
pub const SPECULAR: GLenum = 0x1202;
pub const POSITION: GLenum = 0x1203;
pub const SPOT_DIRECTION: GLenum = 0x1204;
pub const SPOT_EXPONENT: GLenum = 0x1205;
pub const SPOT_CUTOFF: GLenum = 0x1206;
pub const CONSTANT_ATTENUATION: GLenum = 0x1207;
pub const LINEAR_ATTENUATION: GLenum = 0x1208;
pub const QUADRATIC_ATTENUATION: GLenum = 0x1209;
pub const EMISSION: GLenum = 0x1600;
pub const SHININESS: GLenum = 0x1601;
pub const FLAT: GLenum = 0x1D00;
pub const SMOOTH: GLenum = 0x1D01;

// Matrices.
pub const MODELVIEW: GLenum = 0x1700;
pub const PROJECTION: GLenum = 0x1701;
pub const TEXTURE: GLenum = 0x1702;

// Strings.
pub const VENDOR: GLenum = 0x1F00;
pub const RENDERER: GLenum = 0x1F01;
pub const VERSION: GLenum = 0x1F02;
pub const EXTENSIONS: GLenum = 0x1F03;
pub const SHADING_LANGUAGE_VERSION: GLenum = 0x8B8C;

// Data types.
pub const BYTE: GLenum = 0x1400;
pub const UNSIGNED_BYTE: GLenum = 0x1401;
pub const SHORT: GLenum = 0x1402;
pub const UNSIGNED_SHORT: GLenum = 0x1403;
pub const INT: GLenum = 0x1404;
pub const UNSIGNED_INT: GLenum = 0x1405;
pub const FLOAT: GLenum = 0x1406;
pub const FIXED: GLenum = 0x140C;

// Pixel formats.
pub const ALPHA: GLenum = 0x1906;
pub const RGB: GLenum = 0x1907;
pub const RGBA: GLenum = 0x1908;
pub const LUMINANCE: GLenum = 0x1909;
pub const RGB8: GLenum = 0x8051;
pub const RGBA4: GLenum = 0x8056;
pub const RGB5_A1: GLenum = 0x8057;
pub const RGBA8: GLenum = 0x8058;
pub const RGB565: GLenum = 0x8D62;
pub const DEPTH_COMPONENT16: GLenum = 0x81A5;
pub const DEPTH_COMPONENT24: GLenum = 0x81A6;
pub const DEPTH24_STENCIL8: GLenum = 0x88F0;
pub const STENCIL_INDEX8: GLenum = 0x8D48;

// Textures.
pub const TEXTURE0: GLenum = 0x84C0;
pub const ACTIVE_TEXTURE: GLenum = 0x84E0;
pub const CLIENT_ACTIVE_TEXTURE: GLenum = 0x84E1;
pub const TEXTURE_CUBE_MAP: GLenum = 0x8513;
pub const TEXTURE_BINDING_2D: GLenum = 0x8069;
pub const TEXTURE_BINDING_CUBE_MAP: GLenum = 0x8514;
pub const TEXTURE_CUBE_MAP_POSITIVE_X: GLenum = 0x8515;
pub const TEXTURE_MAG_FILTER: GLenum = 0x2800;
pub const TEXTURE_MIN_FILTER: GLenum = 0x2801;
pub const TEXTURE_WRAP_S: GLenum = 0x2802;
pub const TEXTURE_WRAP_T: GLenum = 0x2803;
pub const NEAREST: GLenum = 0x2600;
pub const LINEAR_MIPMAP_LINEAR: GLenum = 0x2703;
pub const REPEAT: GLenum = 0x2901;
pub const CLAMP_TO_EDGE: GLenum = 0x812F;

// Buffers.
pub const ARRAY_BUFFER: GLenum = 0x8892;
pub const ELEMENT_ARRAY_BUFFER: GLenum = 0x8893;
pub const ARRAY_BUFFER_BINDING: GLenum = 0x8894;
pub const ELEMENT_ARRAY_BUFFER_BINDING: GLenum = 0x8895;
pub const STREAM_DRAW: GLenum = 0x88E0;
pub const STATIC_DRAW: GLenum = 0x88E4;
pub const DYNAMIC_DRAW: GLenum = 0x88E8;

// Framebuffers.
pub const FRAMEBUFFER: GLenum = 0x8D40;
pub const RENDERBUFFER: GLenum = 0x8D41;
pub const FRAMEBUFFER_BINDING: GLenum = 0x8CA6;
pub const RENDERBUFFER_BINDING: GLenum = 0x8CA7;
pub const COLOR_ATTACHMENT0: GLenum = 0x8CE0;
pub const DEPTH_ATTACHMENT: GLenum = 0x8D00;
pub const STENCIL_ATTACHMENT: GLenum = 0x8D20;
pub const FRAMEBUFFER_COMPLETE: GLenum = 0x8CD5;
pub const FRAMEBUFFER_INCOMPLETE_ATTACHMENT: GLenum = 0x8CD6;
pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: GLenum = 0x8CD7;
pub const FRAMEBUFFER_UNSUPPORTED: GLenum = 0x8CDD;

// Shaders.
pub const FRAGMENT_SHADER: GLenum = 0x8B30;
pub const VERTEX_SHADER: GLenum = 0x8B31;
pub const COMPILE_STATUS: GLenum = 0x8B81;
pub const LINK_STATUS: GLenum = 0x8B82;
pub const INFO_LOG_LENGTH: GLenum = 0x8B84;
pub const ACTIVE_UNIFORMS: GLenum = 0x8B86;
pub const ACTIVE_ATTRIBUTES: GLenum = 0x8B89;
pub const CURRENT_PROGRAM: GLenum = 0x8B8D;

// Vertex attributes.
pub const VERTEX_ATTRIB_ARRAY_ENABLED: GLenum = 0x8622;
pub const VERTEX_ATTRIB_ARRAY_SIZE: GLenum = 0x8623;
pub const VERTEX_ATTRIB_ARRAY_STRIDE: GLenum = 0x8624;
pub const VERTEX_ATTRIB_ARRAY_TYPE: GLenum = 0x8625;
pub const VERTEX_ATTRIB_ARRAY_NORMALIZED: GLenum = 0x886A;
pub const VERTEX_ATTRIB_ARRAY_BUFFER_BINDING: GLenum = 0x889F;

// Uniform types.
pub const FLOAT_VEC2: GLenum = 0x8B50;
pub const FLOAT_VEC3: GLenum = 0x8B51;
pub const FLOAT_VEC4: GLenum = 0x8B52;
pub const INT_VEC2: GLenum = 0x8B53;
pub const INT_VEC3: GLenum = 0x8B54;
pub const INT_VEC4: GLenum = 0x8B55;
pub const BOOL: GLenum = 0x8B56;
pub const BOOL_VEC2: GLenum = 0x8B57;
pub const BOOL_VEC3: GLenum = 0x8B58;
pub const BOOL_VEC4: GLenum = 0x8B59;
pub const FLOAT_MAT2: GLenum = 0x8B5A;
pub const FLOAT_MAT3: GLenum = 0x8B5B;
pub const FLOAT_MAT4: GLenum = 0x8B5C;
pub const SAMPLER_2D: GLenum = 0x8B5E;
pub const SAMPLER_CUBE: GLenum = 0x8B60;
