use super::semantics::Semantic;
use super::source::*;
use crate::scene::{Light, Material, Mesh};

/// The configuration of a drawable that decides its program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct MatchTraits {
    pub texture_count: usize,
    pub bump_mapped: bool,
    pub vertex_colors: bool,
    pub lit: bool,
    pub light_count: usize,
    pub skinned: bool,
}

impl MatchTraits {
    pub fn of(material: &Material, mesh: &Mesh, lights: &[Light]) -> Self {
        let light_count = lights.iter().filter(|v| v.enabled).count();
        MatchTraits {
            texture_count: material.textures.len(),
            bump_mapped: material.bump_mapped && mesh.has(Semantic::VertexTangent),
            vertex_colors: mesh.has(Semantic::VertexColor),
            lit: material.lighting && light_count > 0,
            light_count,
            skinned: mesh.has(Semantic::VertexBoneWeights) && mesh.has(Semantic::VertexBoneIndices),
        }
    }
}

/// Picks the shaders of drawables whose material pins no program.
pub trait ShaderMatcher: Send + Sync {
    /// The names of the vertex and fragment shader sources to use.
    fn shaders_for(&self, traits: &MatchTraits) -> (String, String);

    /// The fragment stage of pure-color companions. It must write a constant color taken from
    /// the `Color` semantic.
    fn pure_color_fragment(&self) -> &str {
        PURE_COLOR_FRAGMENT
    }
}

/// Selects among the built-in shaders.
///
/// Vertex colors, lighting and the number of lights are switched by uniforms inside the basic
/// shaders, so only skinning, bump mapping and texture count pick different sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMatcher;

impl ShaderMatcher for DefaultMatcher {
    fn shaders_for(&self, traits: &MatchTraits) -> (String, String) {
        let vs = if traits.skinned {
            SKINNED_VERTEX
        } else if traits.bump_mapped {
            BUMP_VERTEX
        } else {
            BASIC_VERTEX
        };

        let fs = if traits.bump_mapped && !traits.skinned {
            BUMP_FRAGMENT
        } else {
            match traits.texture_count {
                0 => NO_TEXTURE_FRAGMENT,
                1 => SINGLE_TEXTURE_FRAGMENT,
                _ => MULTI_TEXTURE_FRAGMENT,
            }
        };

        (vs.to_owned(), fs.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn shaders(traits: MatchTraits) -> (String, String) {
        DefaultMatcher.shaders_for(&traits)
    }

    #[test]
    fn selection() {
        let (vs, fs) = shaders(MatchTraits::default());
        assert_eq!((vs.as_str(), fs.as_str()), (BASIC_VERTEX, NO_TEXTURE_FRAGMENT));

        let (_, fs) = shaders(MatchTraits {
            texture_count: 1,
            ..Default::default()
        });
        assert_eq!(fs, SINGLE_TEXTURE_FRAGMENT);

        let (_, fs) = shaders(MatchTraits {
            texture_count: 3,
            lit: true,
            light_count: 2,
            ..Default::default()
        });
        assert_eq!(fs, MULTI_TEXTURE_FRAGMENT);

        let (vs, fs) = shaders(MatchTraits {
            texture_count: 2,
            bump_mapped: true,
            ..Default::default()
        });
        assert_eq!((vs.as_str(), fs.as_str()), (BUMP_VERTEX, BUMP_FRAGMENT));

        let (vs, fs) = shaders(MatchTraits {
            texture_count: 1,
            skinned: true,
            bump_mapped: true,
            ..Default::default()
        });
        assert_eq!((vs.as_str(), fs.as_str()), (SKINNED_VERTEX, SINGLE_TEXTURE_FRAGMENT));
        assert_eq!(DefaultMatcher.pure_color_fragment(), PURE_COLOR_FRAGMENT);
    }
}
