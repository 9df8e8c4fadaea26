use cgmath::{Matrix4, SquareMatrix};

use super::*;
use crate::errors::*;

/// A `Scene` that keeps everything in memory.
#[derive(Default)]
pub struct BasicScene {
    pub graph: SceneGraph,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    drawables: Vec<Drawable>,
    cameras: Vec<Camera>,
    lights: Vec<Light>,
    fog: Option<Fog>,
    ambient_light: Option<Color>,
    elapsed_time: f32,
    pick_point: Option<[i32; 2]>,
    picked: Option<usize>,
}

impl BasicScene {
    pub fn new() -> Self {
        BasicScene::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    /// Creates a node for `mesh` under `parent`, and draws it with `material`. Returns the
    /// index of the drawable.
    pub fn add_drawable<T: Into<String>>(
        &mut self,
        name: T,
        parent: Option<NodeIndex>,
        mesh: MeshId,
        material: MaterialId,
    ) -> Result<usize> {
        let name = name.into();
        let node = self.graph.create(name.clone());
        self.graph.set_parent(node, parent)?;
        self.drawables.push(Drawable::new(name, node, mesh, material));
        Ok(self.drawables.len() - 1)
    }

    pub fn drawable(&self, index: usize) -> Option<&Drawable> {
        self.drawables.get(index)
    }

    pub fn drawable_mut(&mut self, index: usize) -> Option<&mut Drawable> {
        self.drawables.get_mut(index)
    }

    /// Removes the drawable at `index` together with its node and the node's descendants.
    /// Drawables placed under removed nodes are dropped as well.
    pub fn remove_drawable(&mut self, index: usize) -> Result<()> {
        if index >= self.drawables.len() {
            return Err(Error::ResourceNotFound(format!("Drawable #{}", index)));
        }

        let node = self.drawables.remove(index).node;
        let removes = self.graph.remove(node)?;
        self.drawables.retain(|v| !removes.contains(&v.node));
        Ok(())
    }

    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    pub fn camera_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    pub fn set_fog<T: Into<Option<Fog>>>(&mut self, fog: T) {
        self.fog = fog.into();
    }

    pub fn set_ambient_light(&mut self, color: Color) {
        self.ambient_light = Some(color);
    }

    /// Requests a pick pass at `point`, in viewport coordinates with a bottom-left origin.
    pub fn pick_at(&mut self, point: [i32; 2]) {
        self.pick_point = Some(point);
        self.picked = None;
    }

    /// The drawable found by the last pick pass.
    #[inline]
    pub fn last_picked(&self) -> Option<usize> {
        self.picked
    }
}

impl Scene for BasicScene {
    fn update(&mut self, dt: f32, stats: &mut PerformanceStats) {
        self.elapsed_time += dt;

        let transformed = self.graph.update_transforms();
        stats.add_nodes_updated(self.graph.len() as u32);
        stats.add_nodes_transformed(transformed);
        stats.add_update(dt);
    }

    fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    fn lights(&self) -> &[Light] {
        &self.lights
    }

    fn fog(&self) -> Option<&Fog> {
        self.fog.as_ref()
    }

    fn ambient_light(&self) -> Color {
        self.ambient_light.unwrap_or_else(Color::default_ambient)
    }

    fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    fn pick_point(&self) -> Option<[i32; 2]> {
        self.pick_point
    }

    fn picked(&mut self, drawable: Option<usize>) {
        self.pick_point = None;
        self.picked = drawable;
    }

    fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    fn texture_named(&self, name: &str) -> Option<TextureId> {
        self.textures.iter().position(|v| v.name() == name).map(TextureId)
    }

    fn world_transform(&self, node: NodeIndex) -> Matrix4<f32> {
        self.graph
            .world_transform(node)
            .unwrap_or_else(Matrix4::identity)
    }

    fn local_transform(&self, node: NodeIndex) -> Matrix4<f32> {
        self.graph
            .local_matrix(node)
            .unwrap_or_else(Matrix4::identity)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::types::Primitive;
    use cgmath::{Vector3, Vector4};

    fn scene() -> BasicScene {
        let mut scene = BasicScene::new();
        let mesh = scene.add_mesh(mesh::quad("quad", 1.0, 1.0).unwrap());
        let material = scene.add_material(Material::new("default"));
        let parent = scene.add_drawable("parent", None, mesh, material).unwrap();
        let node = scene.drawable(parent).unwrap().node;
        scene.add_drawable("child", Some(node), mesh, material).unwrap();
        scene
    }

    #[test]
    fn update() {
        let mut scene = scene();
        let mut stats = PerformanceStats::default();
        let parent = scene.drawable(0).unwrap().node;
        let child = scene.drawable(1).unwrap().node;

        scene.graph.set_position(parent, [0.0, 2.0, 0.0]);
        scene.update(0.5, &mut stats);
        scene.update(0.25, &mut stats);

        assert_ulps_eq!(scene.elapsed_time(), 0.75);
        assert_eq!(stats.updates_handled(), 2);
        assert_eq!(stats.nodes_updated(), 4);
        assert_eq!(stats.nodes_transformed(), 2);

        let p = scene.world_transform(child) * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_ulps_eq!(p, Vector4::new(0.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn remove() {
        let mut scene = scene();
        scene.remove_drawable(0).unwrap();
        assert!(scene.drawables().is_empty());
        assert!(scene.graph.is_empty());
        assert!(scene.remove_drawable(0).is_err());
    }

    #[test]
    fn skin() {
        let mut scene = BasicScene::new();
        let mesh = scene.add_mesh(
            Mesh::build("skin", Primitive::Triangles)
                .positions(&[[0.0; 3]])
                .bones(1, vec![1.0], vec![0.0])
                .finish()
                .unwrap(),
        );
        let material = scene.add_material(Material::default());
        let index = scene.add_drawable("skin", None, mesh, material).unwrap();

        let bone = scene.graph.create("bone");
        scene.graph.set_position(bone, [1.0, 0.0, 0.0]);
        scene.drawable_mut(index).unwrap().skin = Some(Skin {
            bones: vec![bone],
            inverse_bind: vec![Matrix4::from_translation(Vector3::new(-1.0, 0.0, 0.0))],
        });

        scene.graph.translate(bone, [0.0, 1.0, 0.0]);
        let bones = scene.bone_matrices(scene.drawable(index).unwrap());
        assert_eq!(bones.len(), 1);
        assert_ulps_eq!(bones[0], Matrix4::from_translation(Vector3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn pick() {
        let mut scene = scene();
        scene.pick_at([3, 4]);
        assert_eq!(scene.pick_point(), Some([3, 4]));
        scene.picked(Some(1));
        assert_eq!(scene.pick_point(), None);
        assert_eq!(scene.last_picked(), Some(1));
    }
}
