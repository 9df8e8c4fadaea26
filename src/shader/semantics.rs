//! The closed registry of variable semantics, and the delegates that assign them.

use std::borrow::Cow;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use super::program::ShaderVariable;
use super::uniform::{self, UniformContext, UniformValue};
use crate::matrix::{MatrixBase, MatrixForm, MatrixSemantic};
use crate::utils::FastHashMap;

macro_rules! semantics {
    ($($(#[$attr:meta])* $name:ident,)*) => {
        /// What a shader variable means to the engine.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum Semantic {
            $($(#[$attr])* $name,)*
            /// Application defined semantics, starting at `AppBase`.
            App(u16),
        }

        impl Semantic {
            /// The stable name used in effect files and logs.
            pub fn name(self) -> Cow<'static, str> {
                match self {
                    $(Semantic::$name => Cow::Borrowed(stringify!($name)),)*
                    Semantic::App(v) => Cow::Owned(format!("AppBase+{}", v)),
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(Semantic::$name),)*
                    "AppBase" => Some(Semantic::App(0)),
                    "AppMax" => Some(Semantic::App(Semantic::APP_MAX)),
                    _ => {
                        if name.starts_with("AppBase+") {
                            name["AppBase+".len()..].parse().ok().map(Semantic::App)
                        } else {
                            None
                        }
                    }
                }
            }
        }
    };
}

semantics! {
    /// No semantic could be resolved. The application has to set the value.
    None,
    /// Recognized, but never populated. Used for repeated declarations.
    Redundant,

    VertexLocation,
    VertexNormal,
    VertexTangent,
    VertexBitangent,
    VertexColor,
    VertexBoneWeights,
    VertexBoneIndices,
    VertexPointSize,
    /// Texture coordinates of the unit given by the semantic index.
    VertexTexture,

    HasVertexNormal,
    ShouldNormalizeVertexNormal,
    ShouldRescaleVertexNormal,
    HasVertexTangent,
    HasVertexBitangent,
    HasVertexColor,
    HasVertexWeight,
    HasVertexMatrixIndex,
    HasVertexTextureCoordinate,
    HasVertexPointSize,
    IsDrawingPoints,
    ShouldDrawFrontFaces,
    ShouldDrawBackFaces,

    ModelLocalMatrix,
    ModelLocalMatrixInv,
    ModelLocalMatrixInvTran,
    ModelMatrix,
    ModelMatrixInv,
    ModelMatrixInvTran,
    ViewMatrix,
    ViewMatrixInv,
    ViewMatrixInvTran,
    ModelViewMatrix,
    ModelViewMatrixInv,
    ModelViewMatrixInvTran,
    ProjMatrix,
    ProjMatrixInv,
    ProjMatrixInvTran,
    ViewProjMatrix,
    ViewProjMatrixInv,
    ViewProjMatrixInvTran,
    ModelViewProjMatrix,
    ModelViewProjMatrixInv,
    ModelViewProjMatrixInvTran,

    /// Bones influencing each vertex.
    VertexBoneCount,
    /// Bones in the palette of the current skin section.
    BatchBoneCount,
    BoneMatricesGlobal,
    BoneMatricesInvTranGlobal,
    BoneMatricesEyeSpace,
    BoneMatricesInvTranEyeSpace,
    BoneMatricesModelSpace,
    BoneMatricesInvTranModelSpace,

    CameraLocationGlobal,
    CameraLocationModelSpace,
    /// (left, right, bottom, top) of the near clip plane.
    CameraFrustum,
    /// (near, far, -(f+n)/(f-n), -2nf/(f-n)).
    CameraFrustumDepth,
    Viewport,

    /// The color used when lighting is off, or the pick color.
    Color,
    MaterialColorAmbient,
    MaterialColorDiffuse,
    MaterialColorSpecular,
    MaterialColorEmission,
    MaterialOpacity,
    MaterialShininess,
    MaterialReflectivity,
    MinimumDrawnAlpha,

    IsUsingLighting,
    SceneLightColorAmbient,
    LightIsEnabled,
    LightPositionGlobal,
    LightPositionEyeSpace,
    LightPositionModelSpace,
    LightColorAmbient,
    LightColorDiffuse,
    LightColorSpecular,
    LightAttenuation,
    LightSpotDirectionGlobal,
    LightSpotDirectionEyeSpace,
    LightSpotDirectionModelSpace,
    LightSpotExponent,
    LightSpotCutoffAngle,
    LightSpotCutoffAngleCosine,

    FogIsEnabled,
    FogColor,
    FogAttenuationMode,
    FogDensity,
    FogStartDistance,
    FogEndDistance,

    TextureCount,
    TextureSampler,
    Texture2DCount,
    Texture2DSampler,
    TextureCubeCount,
    TextureCubeSampler,

    PointSize,
    PointSizeAttenuation,
    PointSizeMinimum,
    PointSizeMaximum,
    PointSpritesIsEnabled,

    FrameTime,
    /// (elapsed, frame time) in seconds.
    SceneTime,
    /// sin over (T, T/2, T/4, T/8).
    SceneTimeSine,
    SceneTimeCosine,
    SceneTimeTangent,
    ElapsedTime,
    DrawCountCurrentFrame,
    RandomNumber,
}

impl Semantic {
    /// The largest application semantic, counted from `AppBase`.
    pub const APP_MAX: u16 = 0xFFFF;

    /// The derived matrix a matrix semantic stands for.
    pub fn matrix(self) -> Option<MatrixSemantic> {
        use self::MatrixBase as B;
        use self::MatrixForm as F;

        let (base, form) = match self {
            Semantic::ModelLocalMatrix => (B::ModelLocal, F::Plain),
            Semantic::ModelLocalMatrixInv => (B::ModelLocal, F::Inverse),
            Semantic::ModelLocalMatrixInvTran => (B::ModelLocal, F::InverseTranspose),
            Semantic::ModelMatrix => (B::Model, F::Plain),
            Semantic::ModelMatrixInv => (B::Model, F::Inverse),
            Semantic::ModelMatrixInvTran => (B::Model, F::InverseTranspose),
            Semantic::ViewMatrix => (B::View, F::Plain),
            Semantic::ViewMatrixInv => (B::View, F::Inverse),
            Semantic::ViewMatrixInvTran => (B::View, F::InverseTranspose),
            Semantic::ModelViewMatrix => (B::ModelView, F::Plain),
            Semantic::ModelViewMatrixInv => (B::ModelView, F::Inverse),
            Semantic::ModelViewMatrixInvTran => (B::ModelView, F::InverseTranspose),
            Semantic::ProjMatrix => (B::Projection, F::Plain),
            Semantic::ProjMatrixInv => (B::Projection, F::Inverse),
            Semantic::ProjMatrixInvTran => (B::Projection, F::InverseTranspose),
            Semantic::ViewProjMatrix => (B::ViewProjection, F::Plain),
            Semantic::ViewProjMatrixInv => (B::ViewProjection, F::Inverse),
            Semantic::ViewProjMatrixInvTran => (B::ViewProjection, F::InverseTranspose),
            Semantic::ModelViewProjMatrix => (B::ModelViewProjection, F::Plain),
            Semantic::ModelViewProjMatrixInv => (B::ModelViewProjection, F::Inverse),
            Semantic::ModelViewProjMatrixInvTran => (B::ModelViewProjection, F::InverseTranspose),
            _ => return None,
        };

        Some(MatrixSemantic::new(base, form))
    }

    /// Semantics that describe a vertex stream rather than a uniform.
    pub fn is_vertex_stream(self) -> bool {
        match self {
            Semantic::VertexLocation
            | Semantic::VertexNormal
            | Semantic::VertexTangent
            | Semantic::VertexBitangent
            | Semantic::VertexColor
            | Semantic::VertexBoneWeights
            | Semantic::VertexBoneIndices
            | Semantic::VertexPointSize
            | Semantic::VertexTexture => true,
            _ => false,
        }
    }
}

impl Default for Semantic {
    fn default() -> Self {
        Semantic::None
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for Semantic {
    fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Semantic {
    fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Semantic::from_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown semantic '{}'", name)))
    }
}

/// A semantic and the instance it refers to, e.g. the light ordinal or the texture unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct VariableSemantic {
    pub semantic: Semantic,
    pub index: u32,
}

impl VariableSemantic {
    pub fn new(semantic: Semantic, index: u32) -> Self {
        VariableSemantic { semantic, index }
    }
}

impl From<Semantic> for VariableSemantic {
    fn from(semantic: Semantic) -> Self {
        VariableSemantic { semantic, index: 0 }
    }
}

/// Assigns semantics to the variables of a program, and fetches their values.
pub trait SemanticDelegate: Send + Sync {
    /// Resolves the semantic of `variable`. Returns false if nothing matched.
    fn configure(&self, variable: &mut ShaderVariable) -> bool;

    /// Produces the current value of a uniform, if the delegate knows how to.
    fn populate(&self, variable: &ShaderVariable, ctx: &mut UniformContext) -> Option<UniformValue> {
        uniform::populate_standard(variable, ctx)
    }
}

/// Splits the subscripts out of a variable name reported by GL.
///
/// `u_cc3Light[2].position` becomes `("u_cc3Light.position", 2)`, and `s_cc3Textures[0]`
/// becomes `("s_cc3Textures", 0)`.
pub fn strip_subscripts(name: &str) -> (String, u32) {
    let mut key = String::with_capacity(name.len());
    let mut index = None;

    let mut rest = name;
    while let Some(open) = rest.find('[') {
        key.push_str(&rest[..open]);
        let close = match rest[open..].find(']') {
            Some(v) => open + v,
            None => break,
        };

        if index.is_none() {
            index = rest[open + 1..close].trim().parse().ok();
        }

        rest = &rest[close + 1..];
    }

    key.push_str(rest);
    (key, index.unwrap_or(0))
}

/// Resolves semantics from a table of reserved variable names.
#[derive(Debug, Clone, Default)]
pub struct SemanticsByVarName {
    names: FastHashMap<String, VariableSemantic>,
}

impl SemanticsByVarName {
    /// Creates an empty table.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a table populated with the standard `a_cc3*`, `u_cc3*` and `s_cc3*` names.
    pub fn with_defaults() -> Self {
        let mut v = SemanticsByVarName::new();
        v.populate_with_defaults();
        v
    }

    /// Maps `name` to `semantic` at `index`, replacing a previous mapping.
    pub fn map<T: Into<String>>(&mut self, name: T, semantic: Semantic, index: u32) {
        self.names
            .insert(name.into(), VariableSemantic::new(semantic, index));
    }

    pub fn lookup(&self, name: &str) -> Option<VariableSemantic> {
        if let Some(v) = self.names.get(name) {
            return Some(*v);
        }

        let (key, index) = strip_subscripts(name);
        self.names
            .get(&key)
            .map(|v| VariableSemantic::new(v.semantic, v.index + index))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn populate_with_defaults(&mut self) {
        use self::Semantic as S;

        let attributes = [
            ("a_cc3Position", S::VertexLocation),
            ("a_cc3Normal", S::VertexNormal),
            ("a_cc3Tangent", S::VertexTangent),
            ("a_cc3Bitangent", S::VertexBitangent),
            ("a_cc3Color", S::VertexColor),
            ("a_cc3BoneWeights", S::VertexBoneWeights),
            ("a_cc3BoneIndices", S::VertexBoneIndices),
            ("a_cc3PointSize", S::VertexPointSize),
            ("a_cc3TexCoord", S::VertexTexture),
        ];

        for (name, semantic) in &attributes {
            self.map(*name, *semantic, 0);
        }

        for i in 0..8 {
            self.map(format!("a_cc3TexCoord{}", i), S::VertexTexture, i);
        }

        let uniforms = [
            ("u_cc3VertexHasNormal", S::HasVertexNormal),
            ("u_cc3VertexShouldNormalizeNormal", S::ShouldNormalizeVertexNormal),
            ("u_cc3VertexShouldRescaleNormal", S::ShouldRescaleVertexNormal),
            ("u_cc3VertexHasTangent", S::HasVertexTangent),
            ("u_cc3VertexHasBitangent", S::HasVertexBitangent),
            ("u_cc3VertexHasColor", S::HasVertexColor),
            ("u_cc3VertexHasWeight", S::HasVertexWeight),
            ("u_cc3VertexHasMatrixIndex", S::HasVertexMatrixIndex),
            ("u_cc3VertexHasTexCoord", S::HasVertexTextureCoordinate),
            ("u_cc3VertexHasPointSize", S::HasVertexPointSize),
            ("u_cc3VertexIsDrawingPoints", S::IsDrawingPoints),
            ("u_cc3VertexShouldDrawFrontFaces", S::ShouldDrawFrontFaces),
            ("u_cc3VertexShouldDrawBackFaces", S::ShouldDrawBackFaces),
            ("u_cc3VertexBoneCount", S::VertexBoneCount),
            ("u_cc3BatchBoneCount", S::BatchBoneCount),
            ("u_cc3BoneMatricesGlobal", S::BoneMatricesGlobal),
            ("u_cc3BoneMatricesInvTranGlobal", S::BoneMatricesInvTranGlobal),
            ("u_cc3BoneMatricesEyeSpace", S::BoneMatricesEyeSpace),
            ("u_cc3BoneMatricesInvTranEyeSpace", S::BoneMatricesInvTranEyeSpace),
            ("u_cc3BoneMatricesModelSpace", S::BoneMatricesModelSpace),
            ("u_cc3BoneMatricesInvTranModelSpace", S::BoneMatricesInvTranModelSpace),
            ("u_cc3CameraPositionGlobal", S::CameraLocationGlobal),
            ("u_cc3CameraPositionModel", S::CameraLocationModelSpace),
            ("u_cc3CameraFrustum", S::CameraFrustum),
            ("u_cc3CameraFrustumDepth", S::CameraFrustumDepth),
            ("u_cc3CameraViewport", S::Viewport),
            ("u_cc3Color", S::Color),
            ("u_cc3MaterialAmbientColor", S::MaterialColorAmbient),
            ("u_cc3MaterialDiffuseColor", S::MaterialColorDiffuse),
            ("u_cc3MaterialSpecularColor", S::MaterialColorSpecular),
            ("u_cc3MaterialEmissionColor", S::MaterialColorEmission),
            ("u_cc3MaterialOpacity", S::MaterialOpacity),
            ("u_cc3MaterialShininess", S::MaterialShininess),
            ("u_cc3MaterialReflectivity", S::MaterialReflectivity),
            ("u_cc3MaterialMinimumDrawnAlpha", S::MinimumDrawnAlpha),
            ("u_cc3LightIsUsingLighting", S::IsUsingLighting),
            ("u_cc3LightSceneAmbientLightColor", S::SceneLightColorAmbient),
            ("u_cc3LightIsLightEnabled", S::LightIsEnabled),
            ("u_cc3LightPositionGlobal", S::LightPositionGlobal),
            ("u_cc3LightPositionEyeSpace", S::LightPositionEyeSpace),
            ("u_cc3LightPositionModel", S::LightPositionModelSpace),
            ("u_cc3LightAmbientColor", S::LightColorAmbient),
            ("u_cc3LightDiffuseColor", S::LightColorDiffuse),
            ("u_cc3LightSpecularColor", S::LightColorSpecular),
            ("u_cc3LightAttenuation", S::LightAttenuation),
            ("u_cc3LightSpotDirectionGlobal", S::LightSpotDirectionGlobal),
            ("u_cc3LightSpotDirectionEyeSpace", S::LightSpotDirectionEyeSpace),
            ("u_cc3LightSpotDirectionModel", S::LightSpotDirectionModelSpace),
            ("u_cc3LightSpotExponent", S::LightSpotExponent),
            ("u_cc3LightSpotCutoffAngle", S::LightSpotCutoffAngle),
            ("u_cc3LightSpotCutoffAngleCosine", S::LightSpotCutoffAngleCosine),
            ("u_cc3FogIsEnabled", S::FogIsEnabled),
            ("u_cc3FogColor", S::FogColor),
            ("u_cc3FogAttenuationMode", S::FogAttenuationMode),
            ("u_cc3FogDensity", S::FogDensity),
            ("u_cc3FogStartDistance", S::FogStartDistance),
            ("u_cc3FogEndDistance", S::FogEndDistance),
            ("u_cc3TextureCount", S::TextureCount),
            ("s_cc3Texture", S::TextureSampler),
            ("s_cc3Textures", S::TextureSampler),
            ("u_cc3Texture2DCount", S::Texture2DCount),
            ("s_cc3Texture2Ds", S::Texture2DSampler),
            ("u_cc3TextureCubeCount", S::TextureCubeCount),
            ("s_cc3TextureCubes", S::TextureCubeSampler),
            ("u_cc3PointSize", S::PointSize),
            ("u_cc3PointSizeAttenuation", S::PointSizeAttenuation),
            ("u_cc3PointMinimumSize", S::PointSizeMinimum),
            ("u_cc3PointMaximumSize", S::PointSizeMaximum),
            ("u_cc3PointSpritesIsEnabled", S::PointSpritesIsEnabled),
            ("u_cc3FrameTime", S::FrameTime),
            ("u_cc3SceneTime", S::SceneTime),
            ("u_cc3SceneTimeSin", S::SceneTimeSine),
            ("u_cc3SceneTimeCos", S::SceneTimeCosine),
            ("u_cc3SceneTimeTan", S::SceneTimeTangent),
            ("u_cc3ElapsedTime", S::ElapsedTime),
            ("u_cc3DrawCount", S::DrawCountCurrentFrame),
            ("u_cc3Random", S::RandomNumber),
        ];

        for (name, semantic) in &uniforms {
            self.map(*name, *semantic, 0);
        }

        // Struct style light declarations, `u_cc3Light[i].field`.
        let lights = [
            ("isEnabled", S::LightIsEnabled),
            ("position", S::LightPositionEyeSpace),
            ("positionGlobal", S::LightPositionGlobal),
            ("positionEyeSpace", S::LightPositionEyeSpace),
            ("positionModel", S::LightPositionModelSpace),
            ("ambientColor", S::LightColorAmbient),
            ("diffuseColor", S::LightColorDiffuse),
            ("specularColor", S::LightColorSpecular),
            ("attenuation", S::LightAttenuation),
            ("spotDirection", S::LightSpotDirectionEyeSpace),
            ("spotDirectionGlobal", S::LightSpotDirectionGlobal),
            ("spotDirectionModel", S::LightSpotDirectionModelSpace),
            ("spotExponent", S::LightSpotExponent),
            ("spotCutoffAngle", S::LightSpotCutoffAngle),
            ("spotCutoffAngleCosine", S::LightSpotCutoffAngleCosine),
        ];

        for (field, semantic) in &lights {
            self.map(format!("u_cc3Light.{}", field), *semantic, 0);
            self.map(format!("u_cc3Lights.{}", field), *semantic, 0);
        }

        for s in MatrixSemantic::all() {
            if let Some(semantic) = matrix_semantic(s) {
                self.map(format!("u_cc3Matrix{}", matrix_name(s)), semantic, 0);
            }
        }
    }
}

fn matrix_name(s: MatrixSemantic) -> String {
    let base = match s.base {
        MatrixBase::ModelLocal => "ModelLocal",
        MatrixBase::Model => "Model",
        MatrixBase::View => "View",
        MatrixBase::ModelView => "ModelView",
        MatrixBase::Projection => "Proj",
        MatrixBase::ViewProjection => "ViewProj",
        MatrixBase::ModelViewProjection => "ModelViewProj",
    };

    match s.form {
        MatrixForm::Plain => base.to_owned(),
        MatrixForm::Inverse => format!("{}Inv", base),
        MatrixForm::InverseTranspose => format!("{}InvTran", base),
    }
}

fn matrix_semantic(s: MatrixSemantic) -> Option<Semantic> {
    Semantic::from_name(&format!("{}Matrix{}", base_name(s.base), form_suffix(s.form)))
}

fn base_name(base: MatrixBase) -> &'static str {
    match base {
        MatrixBase::ModelLocal => "ModelLocal",
        MatrixBase::Model => "Model",
        MatrixBase::View => "View",
        MatrixBase::ModelView => "ModelView",
        MatrixBase::Projection => "Proj",
        MatrixBase::ViewProjection => "ViewProj",
        MatrixBase::ModelViewProjection => "ModelViewProj",
    }
}

fn form_suffix(form: MatrixForm) -> &'static str {
    match form {
        MatrixForm::Plain => "",
        MatrixForm::Inverse => "Inv",
        MatrixForm::InverseTranspose => "InvTran",
    }
}

impl SemanticDelegate for SemanticsByVarName {
    fn configure(&self, variable: &mut ShaderVariable) -> bool {
        match self.lookup(&variable.name) {
            Some(v) => {
                variable.semantic = v.semantic;
                variable.semantic_index = v.index;
                true
            }
            None => false,
        }
    }
}

/// Resolves semantics from explicit declarations, usually those of an effect file, and falls
/// back to variable names for anything left undeclared.
#[derive(Debug, Clone)]
pub struct SemanticsByDeclaration {
    declared: FastHashMap<String, VariableSemantic>,
    fallback: SemanticsByVarName,
}

impl SemanticsByDeclaration {
    pub fn new(fallback: SemanticsByVarName) -> Self {
        SemanticsByDeclaration {
            declared: FastHashMap::default(),
            fallback,
        }
    }

    pub fn declare<T: Into<String>>(&mut self, name: T, semantic: Semantic, index: u32) {
        self.declared
            .insert(name.into(), VariableSemantic::new(semantic, index));
    }

    pub fn declared(&self, name: &str) -> Option<VariableSemantic> {
        if let Some(v) = self.declared.get(name) {
            return Some(*v);
        }

        // GL reports arrays with a trailing `[0]`.
        if name.ends_with("[0]") {
            return self.declared.get(&name[..name.len() - 3]).cloned();
        }

        None
    }
}

impl SemanticDelegate for SemanticsByDeclaration {
    fn configure(&self, variable: &mut ShaderVariable) -> bool {
        match self.declared(&variable.name) {
            Some(v) => {
                variable.semantic = v.semantic;
                variable.semantic_index = v.index;
                true
            }
            None => self.fallback.configure(variable),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(Semantic::VertexLocation.name(), "VertexLocation");
        assert_eq!(Semantic::from_name("FogDensity"), Some(Semantic::FogDensity));
        assert_eq!(Semantic::from_name("AppBase+12"), Some(Semantic::App(12)));
        assert_eq!(Semantic::from_name("AppMax"), Some(Semantic::App(0xFFFF)));
        assert_eq!(Semantic::from_name("Unknown"), None);
        assert_eq!(Semantic::App(7).name(), "AppBase+7");

        let json = serde_json::to_string(&Semantic::ViewMatrixInv).unwrap();
        assert_eq!(json, "\"ViewMatrixInv\"");
        let v: Semantic = serde_json::from_str(&json).unwrap();
        assert_eq!(v, Semantic::ViewMatrixInv);
    }

    #[test]
    fn matrices() {
        let s = Semantic::ModelViewMatrixInvTran.matrix().unwrap();
        assert_eq!(s, MatrixSemantic::inverse_transpose(MatrixBase::ModelView));
        assert_eq!(Semantic::FogColor.matrix(), None);

        let names = SemanticsByVarName::with_defaults();
        for s in MatrixSemantic::all() {
            let name = format!("u_cc3Matrix{}", matrix_name(s));
            let v = names.lookup(&name).unwrap();
            assert_eq!(v.semantic.matrix(), Some(s));
        }
    }

    #[test]
    fn subscripts() {
        assert_eq!(strip_subscripts("u_cc3Light[2].position"), ("u_cc3Light.position".into(), 2));
        assert_eq!(strip_subscripts("s_cc3Textures[0]"), ("s_cc3Textures".into(), 0));
        assert_eq!(strip_subscripts("a_cc3Position"), ("a_cc3Position".into(), 0));

        let names = SemanticsByVarName::with_defaults();
        let v = names.lookup("u_cc3Light[3].position").unwrap();
        assert_eq!(v, VariableSemantic::new(Semantic::LightPositionEyeSpace, 3));

        let v = names.lookup("a_cc3TexCoord1").unwrap();
        assert_eq!(v, VariableSemantic::new(Semantic::VertexTexture, 1));
        assert!(names.lookup("u_myTint").is_none());
    }

    #[test]
    fn declarations() {
        let mut declared = SemanticsByDeclaration::new(SemanticsByVarName::with_defaults());
        declared.declare("myMVP", Semantic::ModelViewProjMatrix, 0);
        declared.declare("myLightPos", Semantic::LightPositionGlobal, 1);

        assert_eq!(
            declared.declared("myLightPos[0]"),
            Some(VariableSemantic::new(Semantic::LightPositionGlobal, 1))
        );
        assert_eq!(declared.declared("a_cc3Position"), None);
    }
}
