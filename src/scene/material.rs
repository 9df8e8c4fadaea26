use smallvec::SmallVec;

use super::TextureId;
use crate::driver::types::{BlendFactor, CullFace};
use crate::errors::*;
use crate::math::Color;

/// The surface description of a drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,

    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub emission: Color,
    pub shininess: f32,
    pub reflectivity: f32,

    /// Fragments with alpha not greater than this are discarded.
    pub alpha_test: Option<f32>,
    pub lighting: bool,
    /// The faces culled while drawing, `None` draws both.
    pub cull_face: Option<CullFace>,
    /// Source and destination factors. `None` draws without blending.
    pub blend: Option<(BlendFactor, BlendFactor)>,
    pub depth_test: bool,
    pub depth_mask: bool,

    pub point_size: f32,
    pub point_size_attenuation: [f32; 3],
    pub point_size_minimum: f32,
    pub point_size_maximum: f32,
    pub point_sprites: bool,

    /// Textures bound to units `0..`.
    pub textures: SmallVec<[TextureId; 4]>,
    /// Whether the first texture holds tangent space normals.
    pub bump_mapped: bool,

    /// The names of the vertex and fragment shaders, bypassing the matcher.
    pub program: Option<(String, String)>,
    /// A registered effect, bypassing the matcher.
    pub effect: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            name: String::new(),
            ambient: Color::default_ambient(),
            diffuse: Color::default_diffuse(),
            specular: Color::black(),
            emission: Color::black(),
            shininess: 0.0,
            reflectivity: 0.0,
            alpha_test: None,
            lighting: true,
            cull_face: Some(CullFace::Back),
            blend: None,
            depth_test: true,
            depth_mask: true,
            point_size: 1.0,
            point_size_attenuation: [1.0, 0.0, 0.0],
            point_size_minimum: 1.0,
            point_size_maximum: 64.0,
            point_sprites: false,
            textures: SmallVec::new(),
            bump_mapped: false,
            program: None,
            effect: None,
        }
    }
}

impl Material {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Material {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An unlit material that draws `color` as is.
    pub fn unlit<T: Into<String>>(name: T, color: Color) -> Self {
        let mut material = Material::new(name);
        material.diffuse = color;
        material.lighting = false;
        material.set_opacity(color.a);
        material
    }

    pub fn from_json(json: &str) -> Result<Material> {
        Ok(serde_json::from_str(json)?)
    }

    /// The opacity of the material, taken from its diffuse alpha.
    #[inline]
    pub fn opacity(&self) -> f32 {
        self.diffuse.a
    }

    /// Changes the alpha of every color, and turns alpha blending on below full opacity.
    pub fn set_opacity(&mut self, opacity: f32) {
        let opacity = opacity.max(0.0).min(1.0);
        self.ambient.a = opacity;
        self.diffuse.a = opacity;
        self.specular.a = opacity;
        self.emission.a = opacity;

        if opacity < 1.0 {
            self.blend = Some((BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha));
            self.depth_mask = false;
        } else {
            self.blend = None;
            self.depth_mask = true;
        }
    }

    /// Whether drawing this material can reveal what lies behind it.
    pub fn is_opaque(&self) -> bool {
        match self.blend {
            None => true,
            Some((BlendFactor::One, BlendFactor::Zero)) => true,
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opacity() {
        let mut material = Material::new("glass");
        assert!(material.is_opaque());

        material.set_opacity(0.5);
        assert!(!material.is_opaque());
        assert!(!material.depth_mask);
        assert_eq!(material.opacity(), 0.5);
        assert_eq!(material.ambient.a, 0.5);

        material.set_opacity(2.0);
        assert!(material.is_opaque());
        assert_eq!(material.opacity(), 1.0);
    }

    #[test]
    fn json() {
        let material = Material::from_json(
            r#"{
                "name": "red",
                "diffuse": { "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 },
                "lighting": false,
                "cull_face": null,
                "textures": [0, 2]
            }"#,
        )
        .unwrap();

        assert_eq!(material.name, "red");
        assert_eq!(material.diffuse, Color::new(1.0, 0.0, 0.0, 1.0));
        assert!(!material.lighting);
        assert_eq!(material.cull_face, None);
        assert_eq!(&material.textures[..], &[TextureId(0), TextureId(2)]);
        assert_eq!(material.shininess, 0.0);
        assert!(material.depth_test);
    }
}
