//! Shader effect descriptions.
//!
//! An effect names its two shader stages, the textures bound to each unit, and the semantic
//! of every variable whose name alone does not tell. Effects are read from JSON:
//!
//! ```json
//! {
//!     "name": "glow",
//!     "vertex_shader": "glow.vert",
//!     "fragment_shader": "glow.frag",
//!     "textures": [{ "unit": 0, "name": "glow.png" }],
//!     "variables": [
//!         { "name": "mvp", "type": "mat4", "semantic": "ModelViewProjMatrix" },
//!         { "name": "lightPos", "type": "vec4", "semantic": "LightPositionEyeSpace", "semantic_index": 1 }
//!     ]
//! }
//! ```

use super::semantics::{Semantic, SemanticsByDeclaration, SemanticsByVarName};
use crate::driver::types::UniformType;
use crate::errors::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTexture {
    pub unit: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectVariable {
    pub name: String,
    /// The GLSL type name, e.g. `vec4`.
    #[serde(rename = "type")]
    pub ty: String,
    pub semantic: Semantic,
    #[serde(default)]
    pub semantic_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
    #[serde(default)]
    pub textures: Vec<EffectTexture>,
    #[serde(default)]
    pub variables: Vec<EffectVariable>,
}

impl Effect {
    pub fn from_json(json: &str) -> Result<Effect> {
        let effect: Effect = serde_json::from_str(json)?;
        effect.validate()?;
        Ok(effect)
    }

    /// Parses a list of effects.
    pub fn list_from_json(json: &str) -> Result<Vec<Effect>> {
        let effects: Vec<Effect> = serde_json::from_str(json)?;
        for v in &effects {
            v.validate()?;
        }

        Ok(effects)
    }

    fn validate(&self) -> Result<()> {
        for v in &self.variables {
            if UniformType::from_glsl(&v.ty).is_none() {
                return Err(Error::InvalidSettings(format!(
                    "variable '{}' of effect '{}' has unknown type '{}'",
                    v.name, self.name, v.ty
                )));
            }
        }

        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&EffectVariable> {
        let name = if name.ends_with("[0]") {
            &name[..name.len() - 3]
        } else {
            name
        };

        self.variables.iter().find(|v| v.name == name)
    }

    /// The declared type of a variable.
    pub fn variable_type(&self, name: &str) -> Option<UniformType> {
        self.variable(name).and_then(|v| UniformType::from_glsl(&v.ty))
    }

    /// A delegate that resolves the declared semantics, and falls back to `names`.
    pub fn semantics(&self, names: SemanticsByVarName) -> SemanticsByDeclaration {
        let mut v = SemanticsByDeclaration::new(names);
        for var in &self.variables {
            v.declare(var.name.clone(), var.semantic, var.semantic_index);
        }
        v
    }

    /// The texture bound to `unit`.
    pub fn texture(&self, unit: u8) -> Option<&str> {
        self.textures
            .iter()
            .find(|v| v.unit == unit)
            .map(|v| v.name.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shader::semantics::VariableSemantic;

    const GLOW: &str = r#"{
        "name": "glow",
        "vertex_shader": "glow.vert",
        "fragment_shader": "glow.frag",
        "textures": [{ "unit": 1, "name": "glow.png" }],
        "variables": [
            { "name": "mvp", "type": "mat4", "semantic": "ModelViewProjMatrix" },
            { "name": "lightPos", "type": "vec4", "semantic": "LightPositionEyeSpace", "semantic_index": 1 },
            { "name": "custom", "type": "float", "semantic": "AppBase+3" }
        ]
    }"#;

    #[test]
    fn parse() {
        let effect = Effect::from_json(GLOW).unwrap();
        assert_eq!(effect.vertex_shader, "glow.vert");
        assert_eq!(effect.texture(1), Some("glow.png"));
        assert_eq!(effect.texture(0), None);
        assert_eq!(effect.variable_type("lightPos[0]"), Some(UniformType::Vec4));
        assert_eq!(effect.variable("custom").unwrap().semantic, Semantic::App(3));

        let semantics = effect.semantics(SemanticsByVarName::with_defaults());
        assert_eq!(
            semantics.declared("lightPos"),
            Some(VariableSemantic::new(Semantic::LightPositionEyeSpace, 1))
        );
    }

    #[test]
    fn invalid() {
        let json = r#"{
            "name": "broken",
            "vertex_shader": "a.vert",
            "fragment_shader": "a.frag",
            "variables": [{ "name": "x", "type": "vec5", "semantic": "Color" }]
        }"#;
        assert!(Effect::from_json(json).is_err());

        let json = r#"{
            "name": "broken",
            "vertex_shader": "a.vert",
            "fragment_shader": "a.frag",
            "variables": [{ "name": "x", "type": "vec4", "semantic": "NotASemantic" }]
        }"#;
        assert!(Effect::from_json(json).is_err());
    }
}
