//! The scene collaborator: what the renderer draws, and from where.
//!
//! The renderer never owns scene content. Every frame it asks a `Scene` for its cameras,
//! drawables and lights, and looks meshes, materials and textures up by id. `BasicScene` is a
//! plain in-memory implementation.

pub mod basic;
pub mod camera;
pub mod graph;
pub mod light;
pub mod material;
pub mod mesh;
pub mod texture;

pub use self::basic::BasicScene;
pub use self::camera::{Camera, Projection};
pub use self::graph::{NodeIndex, SceneGraph, Transform};
pub use self::light::{Fog, Light};
pub use self::material::Material;
pub use self::mesh::{Mesh, MeshBuilder, VertexAttribute};
pub use self::texture::{Texture, TextureFilter, TextureWrap};

use cgmath::Matrix4;

use crate::math::Color;
use crate::render::PerformanceStats;

macro_rules! id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub usize);
    };
}

id!(
    /// Identifies a mesh of a scene.
    MeshId
);

id!(
    /// Identifies a material of a scene.
    MaterialId
);

id!(
    /// Identifies a texture of a scene.
    TextureId
);

/// Binds a mesh to the bones of a skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    /// The node of every bone, in palette order.
    pub bones: Vec<NodeIndex>,
    /// The inverse of the world transform of every bone at bind time.
    pub inverse_bind: Vec<Matrix4<f32>>,
}

/// A mesh drawn with a material at the world transform of a node.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub name: String,
    pub node: NodeIndex,
    pub mesh: MeshId,
    pub material: MaterialId,
    pub skin: Option<Skin>,
    pub visible: bool,
}

impl Drawable {
    pub fn new<T: Into<String>>(name: T, node: NodeIndex, mesh: MeshId, material: MaterialId) -> Self {
        Drawable {
            name: name.into(),
            node,
            mesh,
            material,
            skin: None,
            visible: true,
        }
    }
}

/// What the renderer consumes every frame.
pub trait Scene {
    /// Advances the scene by `dt` seconds, and records the nodes updated and transformed.
    fn update(&mut self, dt: f32, stats: &mut PerformanceStats);

    fn cameras(&self) -> &[Camera];

    /// The drawables, in scene order. The renderer sequences them itself, and reports picks
    /// by index into this slice.
    fn drawables(&self) -> &[Drawable];

    fn lights(&self) -> &[Light];

    fn fog(&self) -> Option<&Fog> {
        None
    }

    fn ambient_light(&self) -> Color {
        Color::default_ambient()
    }

    /// Seconds elapsed since the scene started.
    fn elapsed_time(&self) -> f32;

    /// The viewport coordinate, bottom-left origin, a pick pass should be run for.
    fn pick_point(&self) -> Option<[i32; 2]> {
        None
    }

    /// Receives the result of the pick pass.
    fn picked(&mut self, _drawable: Option<usize>) {}

    fn mesh(&self, id: MeshId) -> Option<&Mesh>;

    fn material(&self, id: MaterialId) -> Option<&Material>;

    fn texture(&self, id: TextureId) -> Option<&Texture>;

    /// Finds a texture by name, for effects that declare their textures.
    fn texture_named(&self, _name: &str) -> Option<TextureId> {
        None
    }

    fn world_transform(&self, node: NodeIndex) -> Matrix4<f32>;

    /// The transform of a node relative to its parent.
    fn local_transform(&self, node: NodeIndex) -> Matrix4<f32>;

    /// The global bone matrices of a skinned drawable: the bone's world transform times its
    /// inverse bind transform.
    fn bone_matrices(&self, drawable: &Drawable) -> Vec<Matrix4<f32>> {
        match drawable.skin {
            Some(ref skin) => skin
                .bones
                .iter()
                .zip(&skin.inverse_bind)
                .map(|(bone, bind)| self.world_transform(*bone) * *bind)
                .collect(),
            None => Vec::new(),
        }
    }
}

pub mod prelude {
    pub use super::{BasicScene, Camera, Drawable, Fog, Light, Material, Mesh, Scene, Texture};
    pub use super::{MaterialId, MeshId, NodeIndex, TextureId};
}
