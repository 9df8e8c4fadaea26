//! Uniform values, and the standard population of uniforms from their semantics.

use cgmath::{InnerSpace, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};

use super::program::ShaderVariable;
use super::semantics::Semantic;
use crate::driver::types::{CullFace, FogMode, Primitive, TextureTarget, UniformType};
use crate::math::matrix as mat;
use crate::math::Color;
use crate::matrix::{MatrixBase, MatrixSemantic, MatrixSystem};
use crate::scene::{Camera, Fog, Light, Material, Mesh};

/// The content of a uniform, laid out the way `glUniform*` consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `data.len() / components` elements of a float scalar or vector.
    Floats { components: usize, data: Vec<f32> },
    /// Integer, boolean and sampler content.
    Ints { components: usize, data: Vec<i32> },
    /// Column-major square matrices.
    Matrices { dimension: usize, data: Vec<f32> },
}

impl UniformValue {
    pub fn float(v: f32) -> Self {
        UniformValue::Floats {
            components: 1,
            data: vec![v],
        }
    }

    pub fn vec2(v: [f32; 2]) -> Self {
        UniformValue::floats(2, v.to_vec())
    }

    pub fn vec3(v: [f32; 3]) -> Self {
        UniformValue::floats(3, v.to_vec())
    }

    pub fn vec4(v: [f32; 4]) -> Self {
        UniformValue::floats(4, v.to_vec())
    }

    pub fn color(v: Color) -> Self {
        UniformValue::vec4(v.rgba())
    }

    pub fn int(v: i32) -> Self {
        UniformValue::Ints {
            components: 1,
            data: vec![v],
        }
    }

    pub fn bool(v: bool) -> Self {
        UniformValue::int(v as i32)
    }

    pub fn floats(components: usize, data: Vec<f32>) -> Self {
        UniformValue::Floats { components, data }
    }

    pub fn ints(components: usize, data: Vec<i32>) -> Self {
        UniformValue::Ints { components, data }
    }

    pub fn mat3(m: &Matrix3<f32>) -> Self {
        let v: &[f32; 9] = m.as_ref();
        UniformValue::Matrices {
            dimension: 3,
            data: v.to_vec(),
        }
    }

    pub fn mat4(m: &Matrix4<f32>) -> Self {
        UniformValue::Matrices {
            dimension: 4,
            data: mat::to_array(m).to_vec(),
        }
    }

    pub fn mat4_array<'a, I>(iter: I) -> Self
    where
        I: IntoIterator<Item = &'a Matrix4<f32>>,
    {
        let mut data = Vec::new();
        for m in iter {
            data.extend_from_slice(&mat::to_array(m));
        }

        UniformValue::Matrices { dimension: 4, data }
    }

    /// A value of `size` zeroed elements of type `ty`.
    pub fn zeroed(ty: UniformType, size: usize) -> Self {
        let size = size.max(1);
        if let Some(dimension) = ty.matrix_dimension() {
            UniformValue::Matrices {
                dimension,
                data: vec![0.0; dimension * dimension * size],
            }
        } else if ty.is_integer() {
            UniformValue::Ints {
                components: ty.components(),
                data: vec![0; ty.components() * size],
            }
        } else {
            UniformValue::Floats {
                components: ty.components(),
                data: vec![0.0; ty.components() * size],
            }
        }
    }

    /// The number of array elements.
    pub fn len(&self) -> usize {
        match *self {
            UniformValue::Floats { components, ref data } => data.len() / components.max(1),
            UniformValue::Ints { components, ref data } => data.len() / components.max(1),
            UniformValue::Matrices { dimension, ref data } => data.len() / (dimension * dimension).max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The content as floats, whatever the representation.
    pub fn to_floats(&self) -> Vec<f32> {
        match *self {
            UniformValue::Floats { ref data, .. } | UniformValue::Matrices { ref data, .. } => {
                data.clone()
            }
            UniformValue::Ints { ref data, .. } => data.iter().map(|v| *v as f32).collect(),
        }
    }

    /// Converts the value to exactly `size` elements of the declared type `ty`.
    ///
    /// Vectors are truncated or padded (the fourth component of a `vec4` pads with 1), matrices
    /// keep their upper-left block or are extended with identity, and floats round to
    /// integers. Elements beyond the value are zeroed.
    pub fn conform(&self, ty: UniformType, size: usize) -> UniformValue {
        let size = size.max(1);

        if let Some(dimension) = ty.matrix_dimension() {
            let data = match *self {
                UniformValue::Matrices {
                    dimension: from,
                    ref data,
                } => resize_matrices(data, from, dimension, size),
                _ => repack(&self.to_floats(), self.components(), dimension * dimension, size, 0.0),
            };

            return UniformValue::Matrices { dimension, data };
        }

        let components = ty.components();
        if ty.is_integer() {
            let boolean = match ty {
                UniformType::Bool | UniformType::BVec2 | UniformType::BVec3 | UniformType::BVec4 => true,
                _ => false,
            };

            let source: Vec<i32> = match *self {
                UniformValue::Ints { ref data, .. } => data.clone(),
                _ => self.to_floats().iter().map(|v| v.round() as i32).collect(),
            };

            let mut data = repack(&source, self.components(), components, size, 0);
            if boolean {
                for v in &mut data {
                    *v = (*v != 0) as i32;
                }
            }

            return UniformValue::Ints { components, data };
        }

        let source = self.to_floats();
        let mut data = repack(&source, self.components(), components, size, 0.0);
        if components == 4 && self.components() < 4 {
            for i in 0..size.min(self.len()) {
                data[i * 4 + 3] = 1.0;
            }
        }

        UniformValue::Floats { components, data }
    }

    fn components(&self) -> usize {
        match *self {
            UniformValue::Floats { components, .. } | UniformValue::Ints { components, .. } => {
                components.max(1)
            }
            UniformValue::Matrices { dimension, .. } => (dimension * dimension).max(1),
        }
    }
}

fn repack<T: Copy>(source: &[T], from: usize, to: usize, size: usize, zero: T) -> Vec<T> {
    let mut v = vec![zero; to * size];
    let count = source.len() / from;

    for e in 0..size.min(count) {
        for c in 0..to.min(from) {
            v[e * to + c] = source[e * from + c];
        }
    }

    v
}

fn resize_matrices(source: &[f32], from: usize, to: usize, size: usize) -> Vec<f32> {
    let mut v = vec![0.0; to * to * size];
    let count = source.len() / (from * from).max(1);

    for e in 0..size.min(count) {
        for col in 0..to {
            for row in 0..to {
                let value = if col < from && row < from {
                    source[e * from * from + col * from + row]
                } else if col == row {
                    1.0
                } else {
                    0.0
                };

                v[e * to * to + col * to + row] = value;
            }
        }
    }

    v
}

/// Everything the standard population needs to know about the drawable being rendered.
pub struct UniformContext<'a> {
    pub matrices: &'a mut MatrixSystem,
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    pub ambient_light: Color,
    pub fog: Option<&'a Fog>,
    pub material: &'a Material,
    pub mesh: &'a Mesh,
    /// Global bone matrices of the skin section.
    pub bones: &'a [Matrix4<f32>],
    /// Targets of the textures bound to units `0..`.
    pub textures: &'a [TextureTarget],
    /// The color of the pick pass, replaces `Color` when set.
    pub pure_color: Option<Color>,
    pub elapsed_time: f32,
    pub frame_time: f32,
    pub draw_count: u32,
}

impl<'a> UniformContext<'a> {
    fn matrix(&mut self, base: MatrixBase) -> Matrix4<f32> {
        *self.matrices.matrix_for(MatrixSemantic::plain(base))
    }

    fn model_inverse(&mut self) -> Matrix4<f32> {
        *self.matrices.matrix_for(MatrixSemantic::inverse(MatrixBase::Model))
    }

    fn is_lit(&self) -> bool {
        self.material.lighting && self.lights.iter().any(|v| v.enabled)
    }

    /// The uniform and non-uniform scaling of the model matrix.
    fn normal_scaling(&mut self) -> (bool, bool) {
        let m = self.matrix(MatrixBase::Model);
        let x = m.x.truncate().magnitude();
        let y = m.y.truncate().magnitude();
        let z = m.z.truncate().magnitude();

        let eps = 1e-4;
        let uniform = (x - y).abs() < eps && (y - z).abs() < eps;
        (uniform && (x - 1.0).abs() > eps, !uniform)
    }
}

/// Collects one element per light, starting at the variable's semantic index.
fn per_light<F>(var: &ShaderVariable, ctx: &UniformContext, components: usize, mut f: F) -> Vec<f32>
where
    F: FnMut(&Light) -> Vec<f32>,
{
    let mut data = Vec::with_capacity(components * var.size.max(1));
    for i in 0..var.size.max(1) {
        let mut v = match ctx.lights.get(var.semantic_index as usize + i) {
            Some(light) => f(light),
            None => vec![0.0; components],
        };

        v.resize(components, 0.0);
        data.extend(v);
    }
    data
}

fn per_bone<F>(var: &ShaderVariable, ctx: &UniformContext, mut f: F) -> UniformValue
where
    F: FnMut(&Matrix4<f32>) -> Matrix4<f32>,
{
    let bones = ctx
        .bones
        .iter()
        .skip(var.semantic_index as usize)
        .take(var.size.max(1))
        .map(|v| f(v))
        .collect::<Vec<_>>();
    UniformValue::mat4_array(bones.iter())
}

fn inverse_transpose(m: &Matrix4<f32>) -> Matrix4<f32> {
    mat::inverse_transpose(m).unwrap_or_else(Matrix4::identity)
}

fn vec4_of(v: Vector4<f32>) -> Vec<f32> {
    vec![v.x, v.y, v.z, v.w]
}

fn transform_direction(m: &Matrix4<f32>, v: Vector3<f32>) -> [f32; 3] {
    let d = mat::upper_left(m) * v;
    let d = if d.magnitude2() > 0.0 { d.normalize() } else { d };
    d.into()
}

/// Units of the textures of a target, starting at the variable's semantic index.
fn units_of(var: &ShaderVariable, textures: &[TextureTarget], target: Option<TextureTarget>) -> Vec<i32> {
    textures
        .iter()
        .enumerate()
        .filter(|(_, t)| target.map(|v| v == **t).unwrap_or(true))
        .map(|(i, _)| i as i32)
        .skip(var.semantic_index as usize)
        .take(var.size.max(1))
        .collect()
}

fn time_wave<F: Fn(f32) -> f32>(t: f32, f: F) -> UniformValue {
    UniformValue::vec4([f(t), f(t / 2.0), f(t / 4.0), f(t / 8.0)])
}

/// Produces the value of a uniform from its semantic. Returns `None` for semantics the
/// engine cannot provide, e.g. `None` or application semantics.
pub fn populate_standard(var: &ShaderVariable, ctx: &mut UniformContext) -> Option<UniformValue> {
    use self::Semantic as S;

    if let Some(semantic) = var.semantic.matrix() {
        let m = *ctx.matrices.matrix_for(semantic);
        return Some(UniformValue::mat4(&m));
    }

    let mesh = ctx.mesh;
    let material = ctx.material;

    let v = match var.semantic {
        S::HasVertexNormal => UniformValue::bool(mesh.has(S::VertexNormal)),
        S::ShouldNormalizeVertexNormal => {
            let (_, normalize) = ctx.normal_scaling();
            UniformValue::bool(mesh.has(S::VertexNormal) && normalize)
        }
        S::ShouldRescaleVertexNormal => {
            let (rescale, _) = ctx.normal_scaling();
            UniformValue::bool(mesh.has(S::VertexNormal) && rescale)
        }
        S::HasVertexTangent => UniformValue::bool(mesh.has(S::VertexTangent)),
        S::HasVertexBitangent => UniformValue::bool(mesh.has(S::VertexBitangent)),
        S::HasVertexColor => UniformValue::bool(mesh.has(S::VertexColor)),
        S::HasVertexWeight => UniformValue::bool(mesh.has(S::VertexBoneWeights)),
        S::HasVertexMatrixIndex => UniformValue::bool(mesh.has(S::VertexBoneIndices)),
        S::HasVertexTextureCoordinate => UniformValue::bool(mesh.has(S::VertexTexture)),
        S::HasVertexPointSize => UniformValue::bool(mesh.has(S::VertexPointSize)),
        S::IsDrawingPoints => UniformValue::bool(mesh.primitive() == Primitive::Points),
        S::ShouldDrawFrontFaces => UniformValue::bool(match material.cull_face {
            Some(CullFace::Front) | Some(CullFace::FrontAndBack) => false,
            _ => true,
        }),
        S::ShouldDrawBackFaces => UniformValue::bool(match material.cull_face {
            Some(CullFace::Back) | Some(CullFace::FrontAndBack) => false,
            _ => true,
        }),

        S::VertexBoneCount => UniformValue::int(mesh.bone_influences() as i32),
        S::BatchBoneCount => UniformValue::int(ctx.bones.len() as i32),
        S::BoneMatricesGlobal => per_bone(var, ctx, |m| *m),
        S::BoneMatricesInvTranGlobal => per_bone(var, ctx, inverse_transpose),
        S::BoneMatricesEyeSpace => {
            let view = ctx.matrix(MatrixBase::View);
            per_bone(var, ctx, |m| view * *m)
        }
        S::BoneMatricesInvTranEyeSpace => {
            let view = ctx.matrix(MatrixBase::View);
            per_bone(var, ctx, |m| inverse_transpose(&(view * *m)))
        }
        S::BoneMatricesModelSpace => {
            let inv = ctx.model_inverse();
            per_bone(var, ctx, |m| inv * *m)
        }
        S::BoneMatricesInvTranModelSpace => {
            let inv = ctx.model_inverse();
            per_bone(var, ctx, |m| inverse_transpose(&(inv * *m)))
        }

        S::CameraLocationGlobal => {
            let p = ctx.camera.location();
            UniformValue::vec3([p.x, p.y, p.z])
        }
        S::CameraLocationModelSpace => {
            let p = ctx.camera.location();
            let v = ctx.model_inverse() * Vector4::new(p.x, p.y, p.z, 1.0);
            UniformValue::vec3([v.x, v.y, v.z])
        }
        S::CameraFrustum => UniformValue::vec4(ctx.camera.frustum()),
        S::CameraFrustumDepth => {
            let (n, f) = (ctx.camera.near(), ctx.camera.far());
            UniformValue::vec4([n, f, -(f + n) / (f - n), -2.0 * n * f / (f - n)])
        }
        S::Viewport => UniformValue::ints(4, ctx.camera.viewport().to_vec()),

        S::Color => UniformValue::color(ctx.pure_color.unwrap_or(material.diffuse)),
        S::MaterialColorAmbient => UniformValue::color(material.ambient),
        S::MaterialColorDiffuse => UniformValue::color(material.diffuse),
        S::MaterialColorSpecular => UniformValue::color(material.specular),
        S::MaterialColorEmission => UniformValue::color(material.emission),
        S::MaterialOpacity => UniformValue::float(material.opacity()),
        S::MaterialShininess => UniformValue::float(material.shininess),
        S::MaterialReflectivity => UniformValue::float(material.reflectivity),
        S::MinimumDrawnAlpha => UniformValue::float(material.alpha_test.unwrap_or(0.0)),

        S::IsUsingLighting => UniformValue::bool(ctx.is_lit()),
        S::SceneLightColorAmbient => UniformValue::color(ctx.ambient_light),
        S::LightIsEnabled => {
            let data = per_light(var, ctx, 1, |l| vec![l.enabled as i32 as f32]);
            UniformValue::ints(1, data.into_iter().map(|v| v as i32).collect())
        }
        S::LightPositionGlobal => {
            UniformValue::floats(4, per_light(var, ctx, 4, |l| vec4_of(l.position)))
        }
        S::LightPositionEyeSpace => {
            let view = ctx.matrix(MatrixBase::View);
            let data = per_light(var, ctx, 4, |l| vec4_of(view * l.position));
            UniformValue::floats(4, data)
        }
        S::LightPositionModelSpace => {
            let inv = ctx.model_inverse();
            let data = per_light(var, ctx, 4, |l| vec4_of(inv * l.position));
            UniformValue::floats(4, data)
        }
        S::LightColorAmbient => UniformValue::floats(4, per_light(var, ctx, 4, |l| l.ambient.rgba().to_vec())),
        S::LightColorDiffuse => UniformValue::floats(4, per_light(var, ctx, 4, |l| l.diffuse.rgba().to_vec())),
        S::LightColorSpecular => {
            UniformValue::floats(4, per_light(var, ctx, 4, |l| l.specular.rgba().to_vec()))
        }
        S::LightAttenuation => UniformValue::floats(3, per_light(var, ctx, 3, |l| l.attenuation.to_vec())),
        S::LightSpotDirectionGlobal => {
            UniformValue::floats(3, per_light(var, ctx, 3, |l| {
                let d = l.spot_direction;
                vec![d.x, d.y, d.z]
            }))
        }
        S::LightSpotDirectionEyeSpace => {
            let view = ctx.matrix(MatrixBase::View);
            let data = per_light(var, ctx, 3, |l| transform_direction(&view, l.spot_direction).to_vec());
            UniformValue::floats(3, data)
        }
        S::LightSpotDirectionModelSpace => {
            let inv = ctx.model_inverse();
            let data = per_light(var, ctx, 3, |l| transform_direction(&inv, l.spot_direction).to_vec());
            UniformValue::floats(3, data)
        }
        S::LightSpotExponent => UniformValue::floats(1, per_light(var, ctx, 1, |l| vec![l.spot_exponent])),
        S::LightSpotCutoffAngle => UniformValue::floats(1, per_light(var, ctx, 1, |l| vec![l.spot_cutoff])),
        S::LightSpotCutoffAngleCosine => UniformValue::floats(
            1,
            per_light(var, ctx, 1, |l| vec![l.spot_cutoff.to_radians().cos()]),
        ),

        S::FogIsEnabled => UniformValue::bool(ctx.fog.is_some()),
        S::FogColor => UniformValue::color(ctx.fog.map(|v| v.color).unwrap_or_default()),
        S::FogAttenuationMode => {
            let mode = ctx.fog.map(|v| v.mode).unwrap_or(FogMode::Exp);
            UniformValue::int(gl::types::GLenum::from(mode) as i32)
        }
        S::FogDensity => UniformValue::float(ctx.fog.map(|v| v.density).unwrap_or(1.0)),
        S::FogStartDistance => UniformValue::float(ctx.fog.map(|v| v.start).unwrap_or(0.0)),
        S::FogEndDistance => UniformValue::float(ctx.fog.map(|v| v.end).unwrap_or(1.0)),

        S::TextureCount => UniformValue::int(ctx.textures.len() as i32),
        S::TextureSampler => UniformValue::ints(1, units_of(var, ctx.textures, None)),
        S::Texture2DCount => UniformValue::int(
            ctx.textures.iter().filter(|v| **v == TextureTarget::Texture2D).count() as i32,
        ),
        S::Texture2DSampler => {
            UniformValue::ints(1, units_of(var, ctx.textures, Some(TextureTarget::Texture2D)))
        }
        S::TextureCubeCount => UniformValue::int(
            ctx.textures.iter().filter(|v| **v == TextureTarget::CubeMap).count() as i32,
        ),
        S::TextureCubeSampler => {
            UniformValue::ints(1, units_of(var, ctx.textures, Some(TextureTarget::CubeMap)))
        }

        S::PointSize => UniformValue::float(material.point_size),
        S::PointSizeAttenuation => UniformValue::vec3(material.point_size_attenuation),
        S::PointSizeMinimum => UniformValue::float(material.point_size_minimum),
        S::PointSizeMaximum => UniformValue::float(material.point_size_maximum),
        S::PointSpritesIsEnabled => UniformValue::bool(material.point_sprites),

        S::FrameTime => UniformValue::float(ctx.frame_time),
        S::SceneTime => UniformValue::vec2([ctx.elapsed_time, ctx.frame_time]),
        S::SceneTimeSine => time_wave(ctx.elapsed_time, f32::sin),
        S::SceneTimeCosine => time_wave(ctx.elapsed_time, f32::cos),
        S::SceneTimeTangent => time_wave(ctx.elapsed_time, f32::tan),
        S::ElapsedTime => UniformValue::float(ctx.elapsed_time),
        S::DrawCountCurrentFrame => UniformValue::int(ctx.draw_count as i32),
        S::RandomNumber => UniformValue::float(rand::random::<f32>()),

        _ => return None,
    };

    Some(v)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conform_vectors() {
        let v = UniformValue::vec3([1.0, 2.0, 3.0]).conform(UniformType::Vec4, 1);
        assert_eq!(v, UniformValue::vec4([1.0, 2.0, 3.0, 1.0]));

        let v = UniformValue::vec4([1.0, 2.0, 3.0, 4.0]).conform(UniformType::Vec2, 2);
        assert_eq!(v, UniformValue::floats(2, vec![1.0, 2.0, 0.0, 0.0]));

        let v = UniformValue::float(2.6).conform(UniformType::Int, 1);
        assert_eq!(v, UniformValue::int(3));

        let v = UniformValue::int(5).conform(UniformType::Bool, 1);
        assert_eq!(v, UniformValue::int(1));

        let v = UniformValue::int(2).conform(UniformType::Float, 1);
        assert_eq!(v, UniformValue::float(2.0));
    }

    #[test]
    fn conform_matrices() {
        let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)) * Matrix4::from_scale(2.0);
        let v = UniformValue::mat4(&m).conform(UniformType::Mat3, 1);
        assert_eq!(v, UniformValue::mat3(&mat::upper_left(&m)));

        let v = UniformValue::mat3(&Matrix3::from_value(2.0)).conform(UniformType::Mat4, 1);
        assert_eq!(v, UniformValue::mat4(&Matrix4::from_scale(2.0)));
    }

    #[test]
    fn zeroed() {
        let v = UniformValue::zeroed(UniformType::Vec3, 4);
        assert_eq!(v.len(), 4);
        assert_eq!(v.to_floats(), vec![0.0; 12]);

        let v = UniformValue::zeroed(UniformType::Sampler2D, 1);
        assert_eq!(v, UniformValue::int(0));

        let v = UniformValue::zeroed(UniformType::Mat4, 2);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn identical_values_are_unchanged() {
        let v = UniformValue::vec4([0.25, 0.5, 0.75, 1.0]);
        assert_eq!(v.conform(UniformType::Vec4, 1), v);

        let m = UniformValue::mat4(&Matrix4::from_angle_x(cgmath::Deg(30.0)));
        assert_eq!(m.conform(UniformType::Mat4, 1), m);
    }
}
