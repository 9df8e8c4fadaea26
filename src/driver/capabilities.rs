use std::cmp;

use gl::types::*;

use super::consts as c;
use super::{get_integer, Driver};
use crate::errors::*;
use crate::settings::Pipeline;

/// Describes a version.
///
/// A version can only be compared to another version if they belong to the same API.
/// For example, both `Version::GL(3, 0) >= Version::ES(3, 0)` and `Version::ES(3, 0) >=
/// Version::GL(3, 0)` return `false`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    /// Regular OpenGL.
    GL(u8, u8),
    /// OpenGL embedded system.
    ES(u8, u8),
}

impl PartialOrd for Version {
    #[inline]
    fn partial_cmp(&self, other: &Version) -> Option<cmp::Ordering> {
        let (es1, major1, minor1) = match *self {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        let (es2, major2, minor2) = match *other {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        if es1 != es2 {
            None
        } else {
            match major1.cmp(&major2) {
                cmp::Ordering::Equal => Some(minor1.cmp(&minor2)),
                v => Some(v),
            }
        }
    }
}

impl Version {
    /// Parses the `GL_VERSION` string, e.g. `"OpenGL ES 2.0 IMGSGX543"` or `"4.1 Metal"`.
    pub fn parse(desc: &str) -> Result<Version> {
        let (es, desc) = if desc.starts_with("OpenGL ES-") {
            // "OpenGL ES-CM 1.1", the profile tag precedes the version.
            (true, desc[10..].splitn(2, ' ').nth(1).unwrap_or(""))
        } else if desc.starts_with("OpenGL ES ") {
            (true, &desc[10..])
        } else {
            (false, desc)
        };

        let malformed = || Error::Driver(format!("Version string '{}' is unformaled.", desc));

        let desc = desc.split(' ').next().ok_or_else(malformed)?;
        let mut iter = desc.split('.');
        let major = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(malformed)?;
        let minor = iter
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(malformed)?;

        if es {
            Ok(Version::ES(major, minor))
        } else {
            Ok(Version::GL(major, minor))
        }
    }

    /// True if this version exposes the programmable pipeline without extensions.
    pub fn is_programmable(self) -> bool {
        match self {
            Version::GL(major, _) | Version::ES(major, _) => major >= 2,
        }
    }

    /// True if this version still exposes the fixed-function pipeline.
    pub fn has_fixed_function(self) -> bool {
        match self {
            Version::GL(major, minor) => (major, minor) < (3, 1),
            Version::ES(major, _) => major < 2,
        }
    }
}

macro_rules! extensions {
    ($($string:expr => $field:ident,)+) => {
        /// Contains data about the list of extensions.
        #[derive(Debug, Clone, Copy, Default)]
        pub struct Extensions {
            $(
                pub $field: bool,
            )+
        }

        impl Extensions {
            /// Recognizes the extensions named in a space separated list.
            pub fn parse(list: &str) -> Extensions {
                let mut extensions = Extensions::default();
                for extension in list.split_whitespace() {
                    match extension {
                        $(
                            $string => extensions.$field = true,
                        )+
                        _ => ()
                    }
                }

                extensions
            }
        }
    }
}

extensions! {
    "GL_OES_matrix_palette" => gl_oes_matrix_palette,
    "GL_ARB_matrix_palette" => gl_arb_matrix_palette,
    "GL_OES_point_sprite" => gl_oes_point_sprite,
    "GL_ARB_point_sprite" => gl_arb_point_sprite,
    "GL_OES_point_size_array" => gl_oes_point_size_array,
    "GL_OES_packed_depth_stencil" => gl_oes_packed_depth_stencil,
    "GL_EXT_packed_depth_stencil" => gl_ext_packed_depth_stencil,
    "GL_OES_depth24" => gl_oes_depth24,
    "GL_OES_rgb8_rgba8" => gl_oes_rgb8_rgba8,
    "GL_APPLE_framebuffer_multisample" => gl_apple_framebuffer_multisample,
    "GL_EXT_framebuffer_multisample" => gl_ext_framebuffer_multisample,
    "GL_OES_framebuffer_object" => gl_oes_framebuffer_object,
    "GL_EXT_framebuffer_object" => gl_ext_framebuffer_object,
    "GL_ARB_framebuffer_object" => gl_arb_framebuffer_object,
    "GL_OES_mapbuffer" => gl_oes_mapbuffer,
    "GL_OES_vertex_array_object" => gl_oes_vertex_array_object,
    "GL_IMG_texture_compression_pvrtc" => gl_img_texture_compression_pvrtc,
}

/// Represents the capabilities of the context.
///
/// Contrary to the state, these values never change.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Returns a version or release number. Vendor-specific information may follow the version
    /// number.
    pub version: Version,
    /// The company responsible for this GL implementation.
    pub vendor: String,
    /// The name of the renderer. This name is typically specific to a particular
    /// configuration of a hardware platform.
    pub renderer: String,
    /// The GLSL version string, empty on fixed-function only contexts.
    pub shading_language: String,
    /// The list of OpenGL extensions support by this implementation.
    pub extensions: Extensions,

    pub max_texture_units: u32,
    pub max_vertex_attributes: u32,
    pub max_lights: u32,
    pub max_clip_planes: u32,
    pub max_palette_matrices: u32,
    /// Maximum bone influences per vertex.
    pub max_vertex_units: u32,
    pub max_samples: u32,
    pub max_renderbuffer_size: u32,
    pub max_texture_size: u32,
    pub stencil_bits: u32,
    pub depth_bits: u32,
}

impl Capabilities {
    pub fn parse(driver: &mut dyn Driver) -> Result<Capabilities> {
        let version = Version::parse(&Self::parse_str(driver, c::VERSION)?)?;
        let extensions =
            Extensions::parse(&driver.get_string(c::EXTENSIONS).unwrap_or_default());

        let programmable = version.is_programmable();
        let fixed = version.has_fixed_function();

        let mut query = |pname: GLenum, enabled: bool| -> u32 {
            if enabled {
                cmp::max(get_integer(driver, pname), 0) as u32
            } else {
                0
            }
        };

        let max_texture_units = if programmable {
            query(c::MAX_TEXTURE_IMAGE_UNITS, true)
        } else {
            query(c::MAX_TEXTURE_UNITS, true)
        };

        let palettes = extensions.gl_oes_matrix_palette || extensions.gl_arb_matrix_palette;

        let caps = Capabilities {
            version,
            extensions,
            max_texture_units,
            max_vertex_attributes: query(c::MAX_VERTEX_ATTRIBS, programmable),
            max_lights: query(c::MAX_LIGHTS, fixed),
            max_clip_planes: query(c::MAX_CLIP_PLANES, fixed),
            max_palette_matrices: query(c::MAX_PALETTE_MATRICES, palettes),
            max_vertex_units: query(c::MAX_VERTEX_UNITS, palettes),
            max_samples: query(c::MAX_SAMPLES, true),
            max_renderbuffer_size: query(c::MAX_RENDERBUFFER_SIZE, true),
            max_texture_size: query(c::MAX_TEXTURE_SIZE, true),
            stencil_bits: query(c::STENCIL_BITS, true),
            depth_bits: query(c::DEPTH_BITS, true),
            vendor: Self::parse_str(driver, c::VENDOR)?,
            renderer: Self::parse_str(driver, c::RENDERER)?,
            shading_language: driver
                .get_string(c::SHADING_LANGUAGE_VERSION)
                .unwrap_or_default(),
        };

        // Errors raised by queries of enumerants the context lacks are expected here.
        while driver.get_error() != c::NO_ERROR {}
        Ok(caps)
    }

    #[inline]
    fn parse_str(driver: &mut dyn Driver, id: GLenum) -> Result<String> {
        driver
            .get_string(id)
            .ok_or_else(|| Error::Driver(format!("String of 0x{:04X} is null.", id)))
    }

    pub fn has_palette_matrices(&self) -> bool {
        self.extensions.gl_oes_matrix_palette || self.extensions.gl_arb_matrix_palette
    }

    pub fn has_point_sprites(&self) -> bool {
        self.extensions.gl_oes_point_sprite || self.extensions.gl_arb_point_sprite
    }

    pub fn has_packed_depth_stencil(&self) -> bool {
        self.version >= Version::ES(3, 0)
            || self.version >= Version::GL(3, 0)
            || self.extensions.gl_oes_packed_depth_stencil
            || self.extensions.gl_ext_packed_depth_stencil
    }

    pub fn has_multisample(&self) -> bool {
        self.max_samples > 1
            && (self.version >= Version::ES(3, 0)
                || self.version >= Version::GL(3, 0)
                || self.extensions.gl_apple_framebuffer_multisample
                || self.extensions.gl_ext_framebuffer_multisample)
    }
}

/// Fails with `PlatformUnsupported` when a capability required by `pipeline` is missing.
pub fn check_capabilities(caps: &Capabilities, pipeline: Pipeline) -> Result<()> {
    match pipeline {
        Pipeline::Fixed => {
            if !caps.version.has_fixed_function() {
                return Err(Error::PlatformUnsupported(format!(
                    "the fixed-function pipeline ({:?})",
                    caps.version
                )));
            }

            if !caps.has_palette_matrices() {
                return Err(Error::PlatformUnsupported("matrix palettes".into()));
            }

            if !caps.has_point_sprites() {
                return Err(Error::PlatformUnsupported("point sprites".into()));
            }

            if caps.max_lights == 0 {
                return Err(Error::PlatformUnsupported("fixed-function lighting".into()));
            }
        }

        Pipeline::Programmable => {
            if !caps.version.is_programmable() {
                return Err(Error::PlatformUnsupported(format!(
                    "shader objects ({:?})",
                    caps.version
                )));
            }

            if caps.max_vertex_attributes == 0 {
                return Err(Error::PlatformUnsupported("vertex attributes".into()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn versions() {
        assert_eq!(
            Version::parse("OpenGL ES 2.0 IMGSGX543").unwrap(),
            Version::ES(2, 0)
        );
        assert_eq!(
            Version::parse("OpenGL ES-CM 1.1 Apple").unwrap(),
            Version::ES(1, 1)
        );
        assert_eq!(
            Version::parse("4.1 ATI-1.68.20").unwrap(),
            Version::GL(4, 1)
        );
        assert!(Version::parse("garbage").is_err());

        assert!(Version::ES(2, 0).is_programmable());
        assert!(!Version::ES(1, 1).is_programmable());
        assert!(Version::ES(1, 1).has_fixed_function());
        assert!(!Version::ES(3, 0).has_fixed_function());
        assert!(Version::GL(2, 1).has_fixed_function());
        assert!(Version::GL(2, 1).is_programmable());
    }

    #[test]
    fn extensions() {
        let exts = Extensions::parse("GL_OES_matrix_palette GL_OES_point_sprite GL_foo");
        assert!(exts.gl_oes_matrix_palette);
        assert!(exts.gl_oes_point_sprite);
        assert!(!exts.gl_oes_depth24);
    }
}
