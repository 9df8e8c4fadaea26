use crate::driver::types::ShaderStage;
use crate::driver::Version;

pub const BASIC_VERTEX: &str = "cc3-basic.vert";
pub const SKINNED_VERTEX: &str = "cc3-skinned.vert";
pub const BUMP_VERTEX: &str = "cc3-bump.vert";
pub const NO_TEXTURE_FRAGMENT: &str = "cc3-no-texture.frag";
pub const SINGLE_TEXTURE_FRAGMENT: &str = "cc3-single-texture.frag";
pub const MULTI_TEXTURE_FRAGMENT: &str = "cc3-multi-texture.frag";
pub const BUMP_FRAGMENT: &str = "cc3-bump.frag";
pub const PURE_COLOR_FRAGMENT: &str = "cc3-pure-color.frag";

static BUILTINS: &[(&str, ShaderStage, &str)] = &[
    (BASIC_VERTEX, ShaderStage::Vertex, include_str!("builtin/cc3-basic.vert")),
    (SKINNED_VERTEX, ShaderStage::Vertex, include_str!("builtin/cc3-skinned.vert")),
    (BUMP_VERTEX, ShaderStage::Vertex, include_str!("builtin/cc3-bump.vert")),
    (NO_TEXTURE_FRAGMENT, ShaderStage::Fragment, include_str!("builtin/cc3-no-texture.frag")),
    (
        SINGLE_TEXTURE_FRAGMENT,
        ShaderStage::Fragment,
        include_str!("builtin/cc3-single-texture.frag"),
    ),
    (
        MULTI_TEXTURE_FRAGMENT,
        ShaderStage::Fragment,
        include_str!("builtin/cc3-multi-texture.frag"),
    ),
    (BUMP_FRAGMENT, ShaderStage::Fragment, include_str!("builtin/cc3-bump.frag")),
    (PURE_COLOR_FRAGMENT, ShaderStage::Fragment, include_str!("builtin/cc3-pure-color.frag")),
];

/// A named piece of GLSL for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSource {
    pub name: String,
    pub stage: ShaderStage,
    pub code: String,
}

impl ShaderSource {
    pub fn new<T1, T2>(name: T1, stage: ShaderStage, code: T2) -> Self
    where
        T1: Into<String>,
        T2: Into<String>,
    {
        ShaderSource {
            name: name.into(),
            stage,
            code: code.into(),
        }
    }

    pub fn vertex<T1: Into<String>, T2: Into<String>>(name: T1, code: T2) -> Self {
        ShaderSource::new(name, ShaderStage::Vertex, code)
    }

    pub fn fragment<T1: Into<String>, T2: Into<String>>(name: T1, code: T2) -> Self {
        ShaderSource::new(name, ShaderStage::Fragment, code)
    }

    /// The sources shipped with the crate.
    pub fn builtins() -> Vec<ShaderSource> {
        BUILTINS
            .iter()
            .map(|(name, stage, code)| ShaderSource::new(*name, *stage, *code))
            .collect()
    }
}

/// The text prepended to every source compiled for `version`.
///
/// GLSL ES fragment shaders have no default float precision. Desktop GLSL knows no precision
/// qualifiers at all, so they are defined away.
pub fn preamble(version: Version, stage: ShaderStage) -> &'static str {
    match (version, stage) {
        (Version::ES(..), ShaderStage::Fragment) => "precision mediump float;\n",
        (Version::ES(..), ShaderStage::Vertex) => "",
        (Version::GL(..), _) => "#version 120\n#define lowp\n#define mediump\n#define highp\n",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtins() {
        let sources = ShaderSource::builtins();
        assert_eq!(sources.len(), 8);

        let pure = sources.iter().find(|v| v.name == PURE_COLOR_FRAGMENT).unwrap();
        assert_eq!(pure.stage, ShaderStage::Fragment);
        assert!(pure.code.contains("u_cc3Color"));

        for v in &sources {
            assert!(v.code.contains("void main"), "{} has no entry point", v.name);
        }
    }

    #[test]
    fn preambles() {
        assert_eq!(preamble(Version::ES(2, 0), ShaderStage::Vertex), "");
        assert!(preamble(Version::ES(2, 0), ShaderStage::Fragment).starts_with("precision"));
        assert!(preamble(Version::GL(2, 1), ShaderStage::Vertex).starts_with("#version"));
    }
}
