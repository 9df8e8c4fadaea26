use std::sync::Arc;

use cgmath::{Matrix4, Transform};
use gl::types::*;
use smallvec::SmallVec;

use super::picking::PickBuffer;
use super::sequencer::{DrawOrder, Sequencer};
use super::PerformanceStats;
use crate::driver::consts as c;
use crate::driver::types::{BufferTarget, Capability, DepthFormat, Primitive, TextureTarget};
use crate::errors::*;
use crate::math::Color;
use crate::matrix::MatrixSystem;
use crate::scene::{Camera, Drawable, Material, Mesh, MeshId, Scene, Texture, TextureId, VertexAttribute};
use crate::settings::{Pipeline, Settings};
use crate::shader::source::{BASIC_VERTEX, PURE_COLOR_FRAGMENT};
use crate::shader::{Program, Semantic, ShaderSystem, UniformContext};
use crate::state::tracker::CLIENT_TEXCOORD_BASE;
use crate::state::{AttribPointer, LightParam, MaterialParam, Slot, StateCache, Value};
use crate::utils::FastHashMap;
use crate::vertex::VertexBinder;

/// The systems one frame renders through, borrowed from the context that owns them.
pub struct Frame<'a> {
    pub cache: &'a mut StateCache,
    pub matrices: &'a mut MatrixSystem,
    pub shaders: &'a mut ShaderSystem,
    pub binder: &'a mut VertexBinder,
    pub stats: &'a mut PerformanceStats,
    /// Errors recovered so far.
    pub errors: Vec<Error>,
    pub elapsed_time: f32,
    pub frame_time: f32,
    /// Draw calls issued so far.
    pub draw_count: u32,
}

impl<'a> Frame<'a> {
    /// Records a recoverable error and carries on. Fatal errors are passed through.
    pub fn recover<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(err) => {
                if err.is_fatal() {
                    return Err(err);
                }

                warn!("{}", err);
                self.errors.push(err);
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct MeshBuffers {
    vertex: GLuint,
    index: GLuint,
    revision: u32,
}

struct Queued {
    drawable: usize,
    program: Option<Arc<Program>>,
    /// The program of the drawable failed, it is drawn in a flat color instead.
    substituted: bool,
}

/// Draws the drawables of a scene, and keeps the GL buffers and textures they use.
pub struct Renderer {
    pipeline: Pipeline,
    depth_format: DepthFormat,
    texture_units: usize,
    max_lights: usize,
    max_palette_matrices: usize,

    meshes: FastHashMap<MeshId, MeshBuffers>,
    textures: FastHashMap<TextureId, (GLuint, TextureTarget)>,
    missing: Option<GLuint>,
    picking: PickBuffer,

    sequencer: Sequencer,
    queue: Vec<Queued>,
}

impl Renderer {
    pub fn new(settings: &Settings, texture_units: usize) -> Self {
        Renderer {
            pipeline: settings.pipeline,
            depth_format: settings.depth_format,
            texture_units,
            max_lights: settings.max_lights as usize,
            max_palette_matrices: settings.max_palette_matrices as usize,
            meshes: FastHashMap::default(),
            textures: FastHashMap::default(),
            missing: None,
            picking: PickBuffer::new(),
            sequencer: Sequencer::new(),
            queue: Vec::new(),
        }
    }

    /// Draws every camera of `scene`.
    ///
    /// Returns the result of the pick pass if the scene asked for one: `Some(None)` means
    /// the pick point hit the background.
    pub fn render(&mut self, frame: &mut Frame, scene: &dyn Scene) -> Result<Option<Option<usize>>> {
        let mut picked = None;

        for (i, camera) in scene.cameras().iter().enumerate() {
            frame.cache.write(Slot::Viewport, Value::Rect(camera.viewport()))?;
            frame.matrices.load_projection(frame.cache, &camera.projection())?;
            frame.matrices.load_view(frame.cache, &camera.view())?;

            if self.pipeline == Pipeline::Fixed {
                self.apply_lights(frame.cache, scene)?;
            }

            self.prepare(frame, scene, camera)?;

            if i == 0 {
                if let Some(point) = scene.pick_point() {
                    let result = self.pick(frame, scene, camera, point);
                    picked = Some(frame.recover(result)?.unwrap_or(None));
                }
            }

            if let Some(color) = camera.clear_color {
                frame.cache.write(Slot::ClearColor, color)?;
                frame.cache.write(Slot::DepthMask, true)?;
                frame
                    .cache
                    .driver()
                    .clear(c::COLOR_BUFFER_BIT | c::DEPTH_BUFFER_BIT);
                frame.cache.after_call("glClear")?;
            }

            let order: Vec<usize> = self.sequencer.iter().collect();
            for queued in order {
                let result = self.draw(frame, scene, camera, queued, None);
                frame.recover(result)?;
            }
        }

        self.queue.clear();
        self.sequencer.clear();
        Ok(picked)
    }

    /// Resolves the program of every visible drawable, and sequences them.
    fn prepare(&mut self, frame: &mut Frame, scene: &dyn Scene, camera: &Camera) -> Result<()> {
        self.queue.clear();
        self.sequencer.clear();

        for (index, drawable) in scene.drawables().iter().enumerate() {
            if !drawable.visible {
                continue;
            }

            frame.stats.add_node_visited_for_drawing();

            let (mesh, material) = match frame.recover(lookup(scene, drawable))? {
                Some(v) => v,
                None => continue,
            };

            let (program, substituted) = match self.pipeline {
                Pipeline::Fixed => (None, false),
                Pipeline::Programmable => match self.resolve(frame, scene, material, mesh)? {
                    Some((program, substituted)) => (Some(program), substituted),
                    None => continue,
                },
            };

            let texture = match material.textures.first() {
                Some(id) => self.texture(frame, scene, *id)?.0,
                None => 0,
            };

            let center = scene
                .world_transform(drawable.node)
                .transform_point(mesh.center());

            let order = DrawOrder {
                translucent: !material.is_opaque(),
                program: program.as_ref().map(|v| v.id()).unwrap_or(0),
                texture,
                depth: DrawOrder::normalize(camera.depth_of(center), camera.near(), camera.far()),
            };

            self.sequencer.push(order, self.queue.len());
            self.queue.push(Queued {
                drawable: index,
                program,
                substituted,
            });
        }

        self.sequencer.sort();
        Ok(())
    }

    /// The program of a drawable. When it fails to build, the basic pure-color program
    /// stands in.
    fn resolve(
        &mut self,
        frame: &mut Frame,
        scene: &dyn Scene,
        material: &Material,
        mesh: &Mesh,
    ) -> Result<Option<(Arc<Program>, bool)>> {
        let result = frame
            .shaders
            .program_for(frame.cache, material, mesh, scene.lights());

        if let Some(program) = frame.recover(result)? {
            return Ok(Some((program, false)));
        }

        let fallback = frame
            .shaders
            .program(frame.cache, BASIC_VERTEX, PURE_COLOR_FRAGMENT);

        Ok(frame.recover(fallback)?.map(|v| (v, true)))
    }

    fn pick(&mut self, frame: &mut Frame, scene: &dyn Scene, camera: &Camera, point: [i32; 2]) -> Result<Option<usize>> {
        let result = self.pick_pass(frame, scene, camera, point);
        let restored = self.picking.unbind(frame.cache);
        frame.shaders.end_pick_pass();

        let id = result?;
        restored?;

        debug!("Picks id {} at {:?}.", id, point);
        Ok(if id == 0 { None } else { Some(id as usize - 1) })
    }

    fn pick_pass(&mut self, frame: &mut Frame, scene: &dyn Scene, camera: &Camera, point: [i32; 2]) -> Result<u32> {
        self.picking
            .bind(frame.cache, camera.viewport(), self.depth_format)?;

        frame.cache.write(Slot::ClearColor, Color::transparent())?;
        frame.cache.write(Slot::DepthMask, true)?;
        frame
            .cache
            .driver()
            .clear(c::COLOR_BUFFER_BIT | c::DEPTH_BUFFER_BIT);
        frame.cache.after_call("glClear")?;

        let order: Vec<usize> = self.sequencer.iter().collect();
        for queued in order {
            let id = self.queue[queued].drawable as u32 + 1;
            let result = self.draw(frame, scene, camera, queued, Some(Color::from_pick_id(id)));
            frame.recover(result)?;
        }

        self.picking.read(frame.cache, point)
    }

    /// Draws one queued drawable. A `pick` color draws it with the pure-color companion of
    /// its program.
    fn draw(
        &mut self,
        frame: &mut Frame,
        scene: &dyn Scene,
        camera: &Camera,
        queued: usize,
        pick: Option<Color>,
    ) -> Result<()> {
        let (index, program, substituted) = {
            let v = &self.queue[queued];
            (v.drawable, v.program.clone(), v.substituted)
        };

        let drawable = &scene.drawables()[index];
        let (mesh, material) = lookup(scene, drawable)?;

        self.apply_raster_state(frame.cache, material, mesh, pick.is_some())?;
        let targets = self.bind_textures(frame, scene, material, pick.is_some())?;

        frame
            .matrices
            .load_model(frame.cache, &scene.world_transform(drawable.node))?;
        frame
            .matrices
            .set_model_local(&scene.local_transform(drawable.node));

        let bones = scene.bone_matrices(drawable);
        let (vertex, index_buffer) = self.buffers(frame, drawable.mesh, mesh)?;

        frame.binder.clear_bound_flags();

        match program {
            Some(program) => {
                let program = match pick {
                    Some(_) => frame.shaders.pure_color_program(frame.cache, &program)?,
                    None => program,
                };

                let pure_color = match pick {
                    Some(v) => Some(v),
                    None if substituted => Some(Color::magenta()),
                    None => None,
                };

                frame.cache.use_program(program.id())?;

                let mut ctx = UniformContext {
                    matrices: &mut *frame.matrices,
                    camera,
                    lights: scene.lights(),
                    ambient_light: scene.ambient_light(),
                    fog: scene.fog(),
                    material,
                    mesh,
                    bones: &bones,
                    textures: &targets,
                    pure_color,
                    elapsed_time: frame.elapsed_time,
                    frame_time: frame.frame_time,
                    draw_count: frame.draw_count,
                };

                frame.shaders.populate(frame.cache, &program, &mut ctx)?;

                for attribute in mesh.attributes() {
                    let location = match program.attribute_for(attribute.semantic, attribute.index) {
                        Some(v) if v.location >= 0 => v.location as u8,
                        _ => continue,
                    };

                    let pointer = attrib_pointer(vertex, mesh, attribute);
                    frame.binder.bind_attribute(frame.cache, location, pointer)?;
                }
            }

            None => {
                self.apply_fixed_material(frame.cache, scene, material, pick)?;
                self.load_palettes(frame, camera, &bones)?;

                for attribute in mesh.attributes() {
                    if let Some(array) = client_array_of(attribute) {
                        let pointer = attrib_pointer(vertex, mesh, attribute);
                        frame.binder.bind_attribute(frame.cache, array, pointer)?;
                    }
                }
            }
        }

        frame.binder.disable_unbound_vertex_pointers(frame.cache)?;

        match mesh.index_type() {
            Some(ty) => {
                frame.binder.bind_index_buffer(frame.cache, index_buffer)?;
                frame.binder.draw_elements(
                    frame.cache,
                    frame.stats,
                    mesh.primitive(),
                    mesh.index_count(),
                    ty,
                    0,
                )?;
            }
            None => {
                frame.binder.draw_arrays(
                    frame.cache,
                    frame.stats,
                    mesh.primitive(),
                    0,
                    mesh.vertex_count(),
                )?;
            }
        }

        frame.draw_count += 1;
        if pick.is_none() {
            frame.stats.add_node_drawn();
        }

        Ok(())
    }

    fn apply_raster_state(&self, cache: &mut StateCache, material: &Material, mesh: &Mesh, picking: bool) -> Result<()> {
        cache.set_capability(Capability::DepthTest, material.depth_test || picking)?;
        cache.write(Slot::DepthMask, material.depth_mask || picking)?;

        match material.blend {
            Some((src, dst)) if !picking => {
                cache.set_capability(Capability::Blend, true)?;
                cache.write(Slot::BlendFunc, Value::blend_func(src.into(), dst.into()))?;
            }
            _ => cache.set_capability(Capability::Blend, false)?,
        }

        match material.cull_face {
            Some(face) => {
                cache.set_capability(Capability::CullFace, true)?;
                cache.write(Slot::CullFace, Value::Enum(face.into()))?;
            }
            None => cache.set_capability(Capability::CullFace, false)?,
        }

        if self.pipeline != Pipeline::Fixed {
            return Ok(());
        }

        match material.alpha_test {
            Some(reference) if !picking => {
                cache.set_capability(Capability::AlphaTest, true)?;
                cache.write(
                    Slot::AlphaFunc,
                    Value::AlphaFunc {
                        func: c::GREATER,
                        reference,
                    },
                )?;
            }
            _ => cache.set_capability(Capability::AlphaTest, false)?,
        }

        if mesh.primitive() == Primitive::Points {
            cache.write(Slot::PointSize, material.point_size)?;
            cache.write(
                Slot::PointSizeAttenuation,
                Value::Vec3(material.point_size_attenuation),
            )?;
            cache.write(Slot::PointSizeMinimum, material.point_size_minimum)?;
            cache.write(Slot::PointSizeMaximum, material.point_size_maximum)?;
            cache.set_capability(Capability::PointSprite, material.point_sprites)?;
        }

        Ok(())
    }

    /// Binds the textures of `material` to units `0..`, over the textures its effect
    /// declares. Returns their targets.
    fn bind_textures(
        &mut self,
        frame: &mut Frame,
        scene: &dyn Scene,
        material: &Material,
        picking: bool,
    ) -> Result<SmallVec<[TextureTarget; 4]>> {
        let mut targets = SmallVec::new();

        if !picking {
            let units = self.texture_units_of(frame, scene, material)?;
            for (unit, v) in units.into_iter().enumerate() {
                let (texture, target) = v.unwrap_or((0, TextureTarget::Texture2D));

                frame.cache.bind_texture(unit as u8, target, texture)?;
                targets.push(target);
            }
        }

        if self.pipeline == Pipeline::Fixed {
            for unit in 0..self.texture_units {
                frame
                    .cache
                    .write(Slot::TextureUnitEnabled(unit as u8), unit < targets.len())?;
            }
        }

        Ok(targets)
    }

    /// The texture of every unit up to the last one used. Material textures take the units
    /// an effect declares.
    fn texture_units_of(
        &mut self,
        frame: &mut Frame,
        scene: &dyn Scene,
        material: &Material,
    ) -> Result<SmallVec<[Option<(GLuint, TextureTarget)>; 4]>> {
        let mut units: SmallVec<[Option<(GLuint, TextureTarget)>; 4]> = SmallVec::new();

        let declared = material
            .effect
            .as_ref()
            .and_then(|name| frame.shaders.effect(name))
            .map(|v| v.textures.clone())
            .unwrap_or_default();

        for v in declared {
            let unit = v.unit as usize;
            if unit < material.textures.len() {
                continue;
            }

            if unit >= self.texture_units {
                warn!("Texture '{}' is declared on unit {}, beyond the supported units.", v.name, unit);
                continue;
            }

            let texture = match scene.texture_named(&v.name) {
                Some(id) => self.texture(frame, scene, id)?,
                None => {
                    let missing = Err(Error::ResourceNotFound(format!("Texture '{}'", v.name)));
                    frame.recover::<()>(missing)?;
                    self.missing_texture(frame.cache)?
                }
            };

            while units.len() <= unit {
                units.push(None);
            }
            units[unit] = Some(texture);
        }

        for (unit, id) in material.textures.iter().enumerate().take(self.texture_units) {
            let texture = self.texture(frame, scene, *id)?;
            if units.len() <= unit {
                units.push(None);
            }
            units[unit] = Some(texture);
        }

        Ok(units)
    }

    /// Sets up the built-in lights. Runs while the modelview holds the view matrix, which
    /// transforms light positions into eye space.
    fn apply_lights(&self, cache: &mut StateCache, scene: &dyn Scene) -> Result<()> {
        for i in 0..self.max_lights {
            let index = i as u8;
            let light = match scene.lights().get(i) {
                Some(v) if v.enabled => v,
                _ => {
                    cache.set_capability(Capability::Light(index), false)?;
                    continue;
                }
            };

            cache.set_capability(Capability::Light(index), true)?;
            cache.write(Slot::Light(index, LightParam::Ambient), light.ambient)?;
            cache.write(Slot::Light(index, LightParam::Diffuse), light.diffuse)?;
            cache.write(Slot::Light(index, LightParam::Specular), light.specular)?;

            // Eye space values depend on the view, the cached world space ones do not.
            cache.forget(Slot::Light(index, LightParam::Position));
            cache.forget(Slot::Light(index, LightParam::SpotDirection));

            let position: [f32; 4] = light.position.into();
            let direction: [f32; 3] = light.spot_direction.into();
            cache.write(Slot::Light(index, LightParam::Position), Value::Vec4(position))?;
            cache.write(Slot::Light(index, LightParam::SpotDirection), Value::Vec3(direction))?;
            cache.write(Slot::Light(index, LightParam::SpotExponent), light.spot_exponent)?;
            cache.write(Slot::Light(index, LightParam::SpotCutoff), light.spot_cutoff)?;
            cache.write(
                Slot::Light(index, LightParam::Attenuation),
                Value::Vec3(light.attenuation),
            )?;
        }

        Ok(())
    }

    /// Sets up the built-in material, lighting and fog. A pick color is emitted unlit.
    fn apply_fixed_material(
        &self,
        cache: &mut StateCache,
        scene: &dyn Scene,
        material: &Material,
        pick: Option<Color>,
    ) -> Result<()> {
        if let Some(color) = pick {
            cache.set_capability(Capability::Lighting, true)?;
            for param in &[MaterialParam::Ambient, MaterialParam::Diffuse, MaterialParam::Specular] {
                cache.write(Slot::Material(*param), Color::black())?;
            }

            cache.write(Slot::Material(MaterialParam::Emission), color)?;
            cache.write(Slot::SceneAmbient, Color::black())?;
            return cache.set_capability(Capability::Fog, false);
        }

        let lit = material.lighting && scene.lights().iter().any(|v| v.enabled);
        cache.set_capability(Capability::Lighting, lit)?;

        if lit {
            cache.write(Slot::Material(MaterialParam::Ambient), material.ambient)?;
            cache.write(Slot::Material(MaterialParam::Diffuse), material.diffuse)?;
            cache.write(Slot::Material(MaterialParam::Specular), material.specular)?;
            cache.write(Slot::Material(MaterialParam::Emission), material.emission)?;
            cache.write(Slot::Material(MaterialParam::Shininess), material.shininess)?;
            cache.write(Slot::SceneAmbient, scene.ambient_light())?;
        }

        match scene.fog() {
            Some(fog) => {
                cache.set_capability(Capability::Fog, true)?;
                cache.write(Slot::FogColor, fog.color)?;
                cache.write(Slot::FogMode, Value::Enum(fog.mode.into()))?;
                cache.write(Slot::FogDensity, fog.density)?;
                cache.write(Slot::FogStart, fog.start)?;
                cache.write(Slot::FogEnd, fog.end)
            }
            None => cache.set_capability(Capability::Fog, false),
        }
    }

    /// Loads the eye space bone matrices into the palette of the fixed pipeline.
    fn load_palettes(&self, frame: &mut Frame, camera: &Camera, bones: &[Matrix4<f32>]) -> Result<()> {
        if bones.is_empty() {
            return frame.cache.set_capability(Capability::MatrixPalette, false);
        }

        frame.cache.set_capability(Capability::MatrixPalette, true)?;

        let view = camera.view();
        for (i, bone) in bones.iter().enumerate().take(self.max_palette_matrices) {
            frame.matrices.load_palette(frame.cache, i, &(view * *bone))?;
        }

        Ok(())
    }

    /// The vertex and index buffers of a mesh, uploaded on first use and refreshed when the
    /// mesh revision changes.
    fn buffers(&mut self, frame: &mut Frame, id: MeshId, mesh: &Mesh) -> Result<(GLuint, GLuint)> {
        match self.meshes.get_mut(&id) {
            Some(v) if v.revision == mesh.revision() => return Ok((v.vertex, v.index)),
            Some(v) => {
                frame.binder.update_buffer_data(
                    frame.cache,
                    BufferTarget::Array,
                    v.vertex,
                    0,
                    mesh.vertex_data(),
                )?;

                v.revision = mesh.revision();
                return Ok((v.vertex, v.index));
            }
            None => {}
        }

        let vertex = frame.binder.generate_buffer(frame.cache)?;
        frame.binder.load_buffer_data(
            frame.cache,
            BufferTarget::Array,
            vertex,
            mesh.vertex_data(),
            mesh.usage(),
        )?;

        let index = match mesh.index_data() {
            Some(data) => {
                let id = frame.binder.generate_buffer(frame.cache)?;
                frame
                    .binder
                    .load_buffer_data(frame.cache, BufferTarget::Index, id, data, mesh.usage())?;
                id
            }
            None => 0,
        };

        trace!("Uploads mesh '{}' into buffers {} and {}.", mesh.name(), vertex, index);

        self.meshes.insert(
            id,
            MeshBuffers {
                vertex,
                index,
                revision: mesh.revision(),
            },
        );

        Ok((vertex, index))
    }

    /// The GL texture of `id`. Textures the scene cannot provide are replaced by a 1x1
    /// magenta texture.
    fn texture(&mut self, frame: &mut Frame, scene: &dyn Scene, id: TextureId) -> Result<(GLuint, TextureTarget)> {
        if let Some(v) = self.textures.get(&id) {
            return Ok(*v);
        }

        let texture = match scene.texture(id) {
            Some(v) => v,
            None => {
                let missing = Err(Error::ResourceNotFound(format!("Texture #{}", id.0)));
                frame.recover::<()>(missing)?;
                return self.missing_texture(frame.cache);
            }
        };

        let name = upload(frame.cache, texture)?;
        self.textures.insert(id, (name, texture.target()));
        Ok((name, texture.target()))
    }

    fn missing_texture(&mut self, cache: &mut StateCache) -> Result<(GLuint, TextureTarget)> {
        let name = match self.missing {
            Some(v) => v,
            None => {
                let v = upload(cache, &Texture::solid("missing", Color::magenta()))?;
                self.missing = Some(v);
                v
            }
        };

        Ok((name, TextureTarget::Texture2D))
    }

    /// Deletes the buffers of a mesh. They are uploaded again if the mesh is drawn later.
    pub fn release_mesh(&mut self, cache: &mut StateCache, binder: &mut VertexBinder, id: MeshId) -> Result<()> {
        if let Some(v) = self.meshes.remove(&id) {
            binder.delete_buffer(cache, v.vertex)?;
            binder.delete_buffer(cache, v.index)?;
        }

        Ok(())
    }

    /// Deletes the GL texture of `id`.
    pub fn release_texture(&mut self, cache: &mut StateCache, id: TextureId) -> Result<()> {
        if let Some((name, _)) = self.textures.remove(&id) {
            cache.driver().delete_texture(name);
            cache.forget_binding(name);
            cache.after_call("glDeleteTextures")?;
        }

        Ok(())
    }

    /// Deletes every GL object the renderer created.
    pub fn release(&mut self, cache: &mut StateCache, binder: &mut VertexBinder) -> Result<()> {
        self.queue.clear();
        self.sequencer.clear();

        let meshes: Vec<MeshId> = self.meshes.keys().cloned().collect();
        for id in meshes {
            self.release_mesh(cache, binder, id)?;
        }

        let textures: Vec<TextureId> = self.textures.keys().cloned().collect();
        for id in textures {
            self.release_texture(cache, id)?;
        }

        if let Some(name) = self.missing.take() {
            cache.driver().delete_texture(name);
            cache.forget_binding(name);
        }

        self.picking.release(cache)
    }

    /// Drops every GL name without deleting it, after the context that owned them was lost.
    pub fn forget(&mut self) {
        self.meshes.clear();
        self.textures.clear();
        self.missing = None;
        self.picking.forget();
        self.sequencer.clear();
        self.queue.clear();
    }

    /// The number of meshes with buffers on the GPU.
    #[inline]
    pub fn meshes(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn textures(&self) -> usize {
        self.textures.len()
    }
}

fn lookup<'s>(scene: &'s dyn Scene, drawable: &Drawable) -> Result<(&'s Mesh, &'s Material)> {
    let mesh = scene.mesh(drawable.mesh).ok_or_else(|| {
        Error::ResourceNotFound(format!("Mesh #{} of '{}'", drawable.mesh.0, drawable.name))
    })?;

    let material = scene.material(drawable.material).ok_or_else(|| {
        Error::ResourceNotFound(format!(
            "Material #{} of '{}'",
            drawable.material.0, drawable.name
        ))
    })?;

    Ok((mesh, material))
}

fn upload(cache: &mut StateCache, texture: &Texture) -> Result<GLuint> {
    let name = cache.driver().gen_texture();
    cache.bind_texture(0, texture.target(), name)?;

    let (width, height) = texture.dimensions();
    for (image, pixels) in texture.images() {
        cache.driver().tex_image_2d(
            image,
            0,
            c::RGBA,
            width as GLsizei,
            height as GLsizei,
            c::RGBA,
            c::UNSIGNED_BYTE,
            Some(pixels),
        );
    }

    let target: GLenum = texture.target().into();
    let filter: GLenum = texture.filter.into();
    let wrap: GLenum = texture.wrap.into();

    let driver = cache.driver();
    driver.tex_parameteri(target, c::TEXTURE_MIN_FILTER, filter as GLint);
    driver.tex_parameteri(target, c::TEXTURE_MAG_FILTER, filter as GLint);
    driver.tex_parameteri(target, c::TEXTURE_WRAP_S, wrap as GLint);
    driver.tex_parameteri(target, c::TEXTURE_WRAP_T, wrap as GLint);

    trace!("Uploads texture '{}' into {}.", texture.name(), name);
    cache.after_call("glTexImage2D")?;
    Ok(name)
}

fn attrib_pointer(buffer: GLuint, mesh: &Mesh, attribute: &VertexAttribute) -> AttribPointer {
    AttribPointer {
        buffer,
        size: GLint::from(attribute.size),
        ty: attribute.ty.into(),
        normalized: attribute.normalized,
        stride: mesh.stride() as GLsizei,
        offset: attribute.offset,
    }
}

/// The vertex array of the fixed pipeline that carries a stream.
fn client_array_of(attribute: &VertexAttribute) -> Option<u8> {
    let index = match attribute.semantic {
        Semantic::VertexLocation => 0,
        Semantic::VertexNormal => 1,
        Semantic::VertexColor => 2,
        Semantic::VertexPointSize => 3,
        Semantic::VertexBoneWeights => 4,
        Semantic::VertexBoneIndices => 5,
        Semantic::VertexTexture => CLIENT_TEXCOORD_BASE + attribute.index as u8,
        _ => return None,
    };

    Some(index)
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::{Point3, Vector3};

    use crate::driver::headless::HeadlessDriver;
    use crate::driver::{ErrorChecker, Version};
    use crate::scene::{mesh, BasicScene, MaterialId};
    use crate::settings::{ErrorAssertion, ErrorLogging};

    struct Fixture {
        driver: HeadlessDriver,
        cache: StateCache,
        matrices: MatrixSystem,
        shaders: ShaderSystem,
        binder: VertexBinder,
        stats: PerformanceStats,
        renderer: Renderer,
    }

    impl Fixture {
        fn new() -> Self {
            let settings = Settings::default();
            let driver = HeadlessDriver::new(16, 16);
            let checker = ErrorChecker::new(ErrorLogging::OnFrameBoundary, ErrorAssertion::Off);
            let cache = StateCache::new(Box::new(driver.clone()), checker, Pipeline::Programmable);

            Fixture {
                driver,
                cache,
                matrices: MatrixSystem::new(&settings, 2),
                shaders: ShaderSystem::new(&settings, Version::ES(2, 0)),
                binder: VertexBinder::new(8),
                stats: PerformanceStats::default(),
                renderer: Renderer::new(&settings, 2),
            }
        }

        fn render(&mut self, scene: &dyn Scene) -> (Option<Option<usize>>, Vec<Error>) {
            self.cache.open().unwrap();

            let mut frame = Frame {
                cache: &mut self.cache,
                matrices: &mut self.matrices,
                shaders: &mut self.shaders,
                binder: &mut self.binder,
                stats: &mut self.stats,
                errors: Vec::new(),
                elapsed_time: 0.0,
                frame_time: 0.0,
                draw_count: 0,
            };

            let picked = self.renderer.render(&mut frame, scene).unwrap();
            let errors = frame.errors;
            self.cache.close().unwrap();
            (picked, errors)
        }
    }

    fn scene() -> BasicScene {
        let mut scene = BasicScene::new();
        scene.add_camera(Camera::orthographic(1.0, [0, 0, 16, 16], 0.1, 10.0));
        scene
            .camera_mut(0)
            .unwrap()
            .look_at(Point3::new(0.0, 0.0, 5.0), Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());

        let quad = scene.add_mesh(mesh::quad("quad", 2.0, 2.0).unwrap());
        let material = scene.add_material(Material::unlit("white", Color::white()));
        scene.add_drawable("quad", None, quad, material).unwrap();
        scene
    }

    #[test]
    fn uploads_once() {
        let mut fixture = Fixture::new();
        let scene = scene();

        let (_, errors) = fixture.render(&scene);
        assert!(errors.is_empty());
        fixture.render(&scene);

        assert_eq!(fixture.renderer.meshes(), 1);
        assert_eq!(fixture.driver.calls("glBufferData"), 2);
        assert_eq!(fixture.stats.drawing_calls_made(), 2);
        assert_eq!(fixture.stats.nodes_drawn(), 2);
        assert_eq!(fixture.driver.pixel(8, 8), [255, 255, 255, 255]);
    }

    #[test]
    fn missing_resources() {
        let mut fixture = Fixture::new();
        let mut scene = scene();

        scene.material_mut(MaterialId(0)).unwrap().textures.push(TextureId(9));
        let quad = scene.drawable(0).unwrap().mesh;
        scene
            .add_drawable("orphan", None, quad, MaterialId(5))
            .unwrap();

        let (_, errors) = fixture.render(&scene);
        assert!(errors.len() >= 2);
        for err in &errors {
            match *err {
                Error::ResourceNotFound(_) => {}
                ref other => panic!("unexpected {}", other),
            }
        }

        assert_eq!(fixture.renderer.textures(), 0);
        assert_eq!(fixture.stats.nodes_visited_for_drawing(), 2);
        assert_eq!(fixture.stats.nodes_drawn(), 1);
    }

    #[test]
    fn substitutes_broken_programs() {
        let mut fixture = Fixture::new();
        let mut scene = scene();
        scene.material_mut(MaterialId(0)).unwrap().program =
            Some(("missing.vert".into(), "missing.frag".into()));

        let (_, errors) = fixture.render(&scene);
        assert_eq!(errors.len(), 1);
        assert_eq!(fixture.stats.nodes_drawn(), 1);
        assert_eq!(fixture.driver.pixel(8, 8), [255, 0, 255, 255]);
    }

    #[test]
    fn release() {
        let mut fixture = Fixture::new();
        fixture.render(&scene());

        fixture
            .renderer
            .release(&mut fixture.cache, &mut fixture.binder)
            .unwrap();
        assert_eq!(fixture.renderer.meshes(), 0);
        assert_eq!(fixture.driver.calls("glDeleteBuffers"), 2);
    }
}
