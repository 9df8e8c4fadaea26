use std::sync::{Arc, Mutex, RwLock};

use gl::types::*;

use super::semantics::{SemanticDelegate, Semantic};
use super::source::ShaderSource;
use super::uniform::{UniformContext, UniformValue};
use crate::driver::consts as c;
use crate::driver::types::{ShaderStage, UniformType};
use crate::errors::*;
use crate::state::StateCache;
use crate::utils::{sync, FastHashMap, FastHashSet, HashValue};

/// A GL object waiting for deletion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlObject {
    Shader(GLuint),
    Program(GLuint),
}

#[derive(Debug, Default)]
struct ReleaseState {
    generation: u32,
    pending: Vec<GlObject>,
}

/// Collects the GL names of dropped shaders and programs, so that they are deleted on the GL
/// thread at the next frame boundary.
///
/// Objects created before a context reset belong to a dead context; their names are tagged
/// with an older generation and silently discarded.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    state: Arc<Mutex<ReleaseState>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn generation(&self) -> u32 {
        sync::lock(&self.state).generation
    }

    pub fn push(&self, generation: u32, object: GlObject) {
        let mut state = sync::lock(&self.state);
        if state.generation == generation {
            state.pending.push(object);
        }
    }

    pub fn drain(&self) -> Vec<GlObject> {
        let mut state = sync::lock(&self.state);
        ::std::mem::replace(&mut state.pending, Vec::new())
    }

    pub fn len(&self) -> usize {
        sync::lock(&self.state).pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every pending name and starts a new generation.
    pub fn reset(&self) {
        let mut state = sync::lock(&self.state);
        state.generation = state.generation.wrapping_add(1);
        state.pending.clear();
    }
}

/// A compiled shader stage.
#[derive(Debug)]
pub struct Shader {
    name: String,
    stage: ShaderStage,
    id: GLuint,
    generation: u32,
    releases: ReleaseQueue,
}

impl Shader {
    /// Compiles `source`, with `preamble` prepended to its code.
    pub fn compile(
        cache: &mut StateCache,
        releases: &ReleaseQueue,
        source: &ShaderSource,
        preamble: &str,
    ) -> Result<Shader> {
        let code = format!("{}{}", preamble, source.code);

        let id = {
            let driver = cache.driver();
            let id = driver.create_shader(source.stage.into());
            driver.shader_source(id, &code);
            driver.compile_shader(id);
            id
        };

        cache.after_call("glCompileShader")?;

        let status = cache.driver().get_shaderiv(id, c::COMPILE_STATUS);
        if status == 0 {
            let log = cache.driver().get_shader_info_log(id);
            cache.driver().delete_shader(id);
            return Err(Error::ShaderCompileFailed {
                stage: source.stage,
                name: source.name.clone(),
                log,
            });
        }

        debug!("Compiled {} shader '{}'.", source.stage, source.name);
        Ok(Shader {
            name: source.name.clone(),
            stage: source.stage,
            id,
            generation: releases.generation(),
            releases: releases.clone(),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn id(&self) -> GLuint {
        self.id
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.releases.push(self.generation, GlObject::Shader(self.id));
    }
}

/// An active uniform or attribute of a linked program.
#[derive(Debug, Clone)]
pub struct ShaderVariable {
    /// The name reported by GL. Arrays carry a trailing `[0]`.
    pub name: String,
    pub hash: HashValue<str>,
    pub ty: UniformType,
    /// The array length, 1 for plain variables.
    pub size: usize,
    pub location: GLint,
    pub semantic: Semantic,
    pub semantic_index: u32,
}

impl ShaderVariable {
    pub fn new<T: Into<String>>(name: T, ty: UniformType, size: usize, location: GLint) -> Self {
        let name = name.into();
        ShaderVariable {
            hash: base_name(&name).into(),
            name,
            ty,
            size: size.max(1),
            location,
            semantic: Semantic::None,
            semantic_index: 0,
        }
    }

    /// The name without a trailing `[0]`.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

fn base_name(name: &str) -> &str {
    if name.ends_with("[0]") {
        &name[..name.len() - 3]
    } else {
        name
    }
}

/// A linked program with its introspected variables.
pub struct Program {
    name: String,
    id: GLuint,
    vertex: Arc<Shader>,
    fragment: Arc<Shader>,
    uniforms: Vec<ShaderVariable>,
    attributes: Vec<ShaderVariable>,
    delegate: Arc<dyn SemanticDelegate>,
    overrides: RwLock<FastHashMap<HashValue<str>, UniformValue>>,
    generation: u32,
    releases: ReleaseQueue,
}

impl Program {
    /// Links `vertex` and `fragment`, binding the attributes of `layout` to their locations
    /// first. Every active variable is handed to `delegate` to resolve its semantic.
    pub fn link(
        cache: &mut StateCache,
        releases: &ReleaseQueue,
        name: &str,
        vertex: Arc<Shader>,
        fragment: Arc<Shader>,
        delegate: Arc<dyn SemanticDelegate>,
        layout: &[(String, GLint)],
    ) -> Result<Program> {
        let id = {
            let driver = cache.driver();
            let id = driver.create_program();
            driver.attach_shader(id, vertex.id());
            driver.attach_shader(id, fragment.id());

            for (attribute, location) in layout {
                if *location >= 0 {
                    driver.bind_attrib_location(id, *location as GLuint, attribute);
                }
            }

            driver.link_program(id);
            id
        };

        cache.after_call("glLinkProgram")?;

        if cache.driver().get_programiv(id, c::LINK_STATUS) == 0 {
            let log = cache.driver().get_program_info_log(id);
            cache.driver().delete_program(id);
            return Err(Error::ProgramLinkFailed {
                name: name.to_owned(),
                log,
            });
        }

        let mut program = Program {
            name: name.to_owned(),
            id,
            vertex,
            fragment,
            uniforms: Vec::new(),
            attributes: Vec::new(),
            delegate,
            overrides: RwLock::new(FastHashMap::default()),
            generation: releases.generation(),
            releases: releases.clone(),
        };

        program.introspect(cache)?;
        Ok(program)
    }

    fn introspect(&mut self, cache: &mut StateCache) -> Result<()> {
        let driver = cache.driver();

        let n = driver.get_programiv(self.id, c::ACTIVE_UNIFORMS).max(0);
        for i in 0..n as GLuint {
            if let Some(v) = driver.get_active_uniform(self.id, i) {
                let location = driver.get_uniform_location(self.id, &v.name);
                match UniformType::from_gl(v.ty) {
                    Some(ty) => self
                        .uniforms
                        .push(ShaderVariable::new(v.name, ty, v.size as usize, location)),
                    None => warn!("Uniform '{}' has unsupported type 0x{:04X}.", v.name, v.ty),
                }
            }
        }

        let n = driver.get_programiv(self.id, c::ACTIVE_ATTRIBUTES).max(0);
        for i in 0..n as GLuint {
            if let Some(v) = driver.get_active_attrib(self.id, i) {
                let location = driver.get_attrib_location(self.id, &v.name);
                match UniformType::from_gl(v.ty) {
                    Some(ty) => self
                        .attributes
                        .push(ShaderVariable::new(v.name, ty, v.size as usize, location)),
                    None => warn!("Attribute '{}' has unsupported type 0x{:04X}.", v.name, v.ty),
                }
            }
        }

        self.uniforms.sort_by_key(|v| v.location);
        self.attributes.sort_by_key(|v| v.location);

        for v in self.uniforms.iter_mut().chain(self.attributes.iter_mut()) {
            if !self.delegate.configure(v) {
                warn!(
                    "Variable '{}' of program '{}' has no semantic. Its value must be set by the application.",
                    v.name, self.name
                );
            }
        }

        cache.after_call("glGetActiveUniform")
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn id(&self) -> GLuint {
        self.id
    }

    #[inline]
    pub fn vertex(&self) -> &Arc<Shader> {
        &self.vertex
    }

    #[inline]
    pub fn fragment(&self) -> &Arc<Shader> {
        &self.fragment
    }

    #[inline]
    pub fn uniforms(&self) -> &[ShaderVariable] {
        &self.uniforms
    }

    #[inline]
    pub fn attributes(&self) -> &[ShaderVariable] {
        &self.attributes
    }

    #[inline]
    pub fn delegate(&self) -> &Arc<dyn SemanticDelegate> {
        &self.delegate
    }

    /// Finds a uniform by name, with or without the array subscript.
    pub fn uniform(&self, name: &str) -> Option<&ShaderVariable> {
        let hash: HashValue<str> = base_name(name).into();
        self.uniforms.iter().find(|v| v.hash == hash)
    }

    pub fn uniform_for(&self, semantic: Semantic, index: u32) -> Option<&ShaderVariable> {
        self.uniforms
            .iter()
            .find(|v| v.semantic == semantic && v.semantic_index == index)
    }

    pub fn attribute_for(&self, semantic: Semantic, index: u32) -> Option<&ShaderVariable> {
        self.attributes
            .iter()
            .find(|v| v.semantic == semantic && v.semantic_index == index)
    }

    /// Names and locations of the attributes, ordered by location.
    pub fn attribute_layout(&self) -> Vec<(String, GLint)> {
        self.attributes
            .iter()
            .map(|v| (v.name.clone(), v.location))
            .collect()
    }

    /// Sets the value of a uniform, taking precedence over its semantic at every population.
    pub fn set_uniform(&self, name: &str, value: UniformValue) -> Result<()> {
        let hash = match self.uniform(name) {
            Some(v) => v.hash,
            None => {
                return Err(Error::ResourceNotFound(format!(
                    "Uniform '{}' of program '{}'",
                    name, self.name
                )));
            }
        };

        self.overrides
            .write()
            .unwrap_or_else(|v| v.into_inner())
            .insert(hash, value);
        Ok(())
    }

    /// Removes an override. Returns false if none was set.
    pub fn clear_uniform(&self, name: &str) -> bool {
        let hash: HashValue<str> = base_name(name).into();
        self.overrides
            .write()
            .unwrap_or_else(|v| v.into_inner())
            .remove(&hash)
            .is_some()
    }

    pub fn override_of(&self, variable: &ShaderVariable) -> Option<UniformValue> {
        self.overrides
            .read()
            .unwrap_or_else(|v| v.into_inner())
            .get(&variable.hash)
            .cloned()
    }

    /// Writes every uniform through the state cache.
    ///
    /// Overrides win over semantics. A uniform that yields no value is zero filled, and
    /// reported once in `unpopulated` until that set is cleared.
    pub fn populate(
        &self,
        cache: &mut StateCache,
        ctx: &mut UniformContext,
        unpopulated: &mut FastHashSet<(GLuint, GLint)>,
    ) -> Result<()> {
        for v in &self.uniforms {
            let value = match self.override_of(v) {
                Some(value) => value,
                None if v.semantic == Semantic::Redundant => continue,
                None => match self.delegate.populate(v, ctx) {
                    Some(value) => value,
                    None => {
                        if unpopulated.insert((self.id, v.location)) {
                            warn!("{} (program '{}')", Error::UniformUnpopulated(v.name.clone()), self.name);
                        }

                        UniformValue::zeroed(v.ty, v.size)
                    }
                },
            };

            cache.write_uniform(self.id, v.location, &value.conform(v.ty, v.size))?;
        }

        Ok(())
    }
}

impl ::std::fmt::Debug for Program {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Program")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("uniforms", &self.uniforms.len())
            .field("attributes", &self.attributes.len())
            .finish()
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.releases.push(self.generation, GlObject::Program(self.id));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::headless::HeadlessDriver;
    use crate::driver::ErrorChecker;
    use crate::settings::{ErrorAssertion, ErrorLogging, Pipeline};
    use crate::shader::semantics::SemanticsByVarName;

    const VS: &str = "
        attribute vec4 a_cc3Position;
        attribute vec3 a_cc3Normal;
        uniform mat4 u_cc3MatrixModelViewProj;
        uniform float u_myScale;
        void main() { gl_Position = u_cc3MatrixModelViewProj * a_cc3Position * u_myScale; }
    ";

    const FS: &str = "
        uniform vec4 u_cc3Color;
        uniform vec3 u_cc3LightPositionEyeSpace[4];
        void main() { gl_FragColor = u_cc3Color; }
    ";

    fn setup() -> (StateCache, HeadlessDriver, ReleaseQueue) {
        let driver = HeadlessDriver::new(4, 4);
        let checker = ErrorChecker::new(ErrorLogging::OnFrameBoundary, ErrorAssertion::Off);
        let mut cache = StateCache::new(Box::new(driver.clone()), checker, Pipeline::Programmable);
        cache.open().unwrap();
        (cache, driver, ReleaseQueue::new())
    }

    fn link(cache: &mut StateCache, releases: &ReleaseQueue) -> Result<Program> {
        let vs = ShaderSource::vertex("test.vert", VS);
        let fs = ShaderSource::fragment("test.frag", FS);
        let vs = Arc::new(Shader::compile(cache, releases, &vs, "")?);
        let fs = Arc::new(Shader::compile(cache, releases, &fs, "")?);
        let delegate = Arc::new(SemanticsByVarName::with_defaults());
        Program::link(cache, releases, "test", vs, fs, delegate, &[])
    }

    #[test]
    fn introspection() {
        let (mut cache, _, releases) = setup();
        let program = link(&mut cache, &releases).unwrap();

        let mvp = program.uniform("u_cc3MatrixModelViewProj").unwrap();
        assert_eq!(mvp.semantic, Semantic::ModelViewProjMatrix);
        assert_eq!(mvp.ty, UniformType::Mat4);

        let lights = program.uniform("u_cc3LightPositionEyeSpace").unwrap();
        assert_eq!(lights.size, 4);
        assert_eq!(lights.semantic, Semantic::LightPositionEyeSpace);

        assert_eq!(program.uniform("u_myScale").unwrap().semantic, Semantic::None);
        assert_eq!(
            program.attribute_for(Semantic::VertexLocation, 0).unwrap().name,
            "a_cc3Position"
        );
        assert!(program.attribute_for(Semantic::VertexNormal, 0).is_some());
        cache.close().unwrap();
    }

    #[test]
    fn compile_errors() {
        let (mut cache, _, releases) = setup();
        let bad = ShaderSource::vertex("bad.vert", "void main() { gl_Position = vec4(1.0);");
        match Shader::compile(&mut cache, &releases, &bad, "") {
            Err(Error::ShaderCompileFailed { stage, name, .. }) => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert_eq!(name, "bad.vert");
            }
            v => panic!("unexpected {:?}", v),
        }
        cache.close().unwrap();
    }

    #[test]
    fn overrides() {
        let (mut cache, _, releases) = setup();
        let program = link(&mut cache, &releases).unwrap();

        program.set_uniform("u_myScale", UniformValue::float(2.0)).unwrap();
        assert_eq!(
            program.override_of(program.uniform("u_myScale").unwrap()),
            Some(UniformValue::float(2.0))
        );

        assert!(program.set_uniform("u_missing", UniformValue::float(1.0)).is_err());
        assert!(program.clear_uniform("u_myScale"));
        assert!(!program.clear_uniform("u_myScale"));
        cache.close().unwrap();
    }

    #[test]
    fn releases() {
        let (mut cache, _, releases) = setup();
        let program = link(&mut cache, &releases).unwrap();
        let id = program.id();
        drop(program);

        let pending = releases.drain();
        assert_eq!(pending.len(), 3);
        assert!(pending.contains(&GlObject::Program(id)));

        let program = link(&mut cache, &releases).unwrap();
        releases.reset();
        drop(program);
        assert!(releases.is_empty());
        cache.close().unwrap();
    }
}
