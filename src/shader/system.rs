use std::sync::Arc;

use gl::types::*;

use super::cache::ObjectCache;
use super::matcher::{DefaultMatcher, MatchTraits, ShaderMatcher};
use super::pfx::Effect;
use super::program::{GlObject, Program, ReleaseQueue, Shader};
use super::semantics::{SemanticDelegate, SemanticsByVarName};
use super::source::{self, ShaderSource};
use super::uniform::UniformContext;
use crate::driver::Version;
use crate::errors::*;
use crate::scene::{Light, Material, Mesh};
use crate::settings::{CacheStrength, Settings};
use crate::state::StateCache;
use crate::utils::{FastHashMap, FastHashSet};

/// Compiles, links, caches and populates the programs of one context.
pub struct ShaderSystem {
    version: Version,
    sources: FastHashMap<String, ShaderSource>,
    effects: FastHashMap<String, Effect>,
    shaders: ObjectCache<Shader>,
    programs: ObjectCache<Program>,
    releases: ReleaseQueue,
    names: SemanticsByVarName,
    delegate: Arc<dyn SemanticDelegate>,
    matcher: Box<dyn ShaderMatcher>,
    strength: CacheStrength,
    cache_picking: bool,
    // Uncached pure-color companions, alive for one pick pass.
    picking: FastHashMap<String, Arc<Program>>,
    unpopulated: FastHashSet<(GLuint, GLint)>,
}

impl ShaderSystem {
    pub fn new(settings: &Settings, version: Version) -> Self {
        let mut sources = FastHashMap::default();
        for v in ShaderSource::builtins() {
            sources.insert(v.name.clone(), v);
        }

        let names = SemanticsByVarName::with_defaults();

        ShaderSystem {
            version,
            sources,
            effects: FastHashMap::default(),
            shaders: ObjectCache::new("Shader"),
            programs: ObjectCache::new("Program"),
            releases: ReleaseQueue::new(),
            delegate: Arc::new(names.clone()),
            names,
            matcher: Box::new(DefaultMatcher),
            strength: settings.shader_cache_strength,
            cache_picking: settings.should_cache_picking_shaders,
            picking: FastHashMap::default(),
            unpopulated: FastHashSet::default(),
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Replaces the delegate of programs linked from now on.
    pub fn set_delegate(&mut self, delegate: Arc<dyn SemanticDelegate>) {
        self.delegate = delegate;
    }

    #[inline]
    pub fn delegate(&self) -> &Arc<dyn SemanticDelegate> {
        &self.delegate
    }

    /// The name table used as fallback by effect programs.
    pub fn names_mut(&mut self) -> &mut SemanticsByVarName {
        &mut self.names
    }

    pub fn set_matcher(&mut self, matcher: Box<dyn ShaderMatcher>) {
        self.matcher = matcher;
    }

    /// Adds or replaces a source. Shaders already compiled from the old text stay in use.
    pub fn add_source(&mut self, source: ShaderSource) {
        self.sources.insert(source.name.clone(), source);
    }

    pub fn source(&self, name: &str) -> Option<&ShaderSource> {
        self.sources.get(name)
    }

    pub fn register_effect(&mut self, effect: Effect) {
        self.effects.insert(effect.name.clone(), effect);
    }

    pub fn effect(&self, name: &str) -> Option<&Effect> {
        self.effects.get(name)
    }

    #[inline]
    pub fn programs(&self) -> &ObjectCache<Program> {
        &self.programs
    }

    #[inline]
    pub fn shaders(&self) -> &ObjectCache<Shader> {
        &self.shaders
    }

    /// Gets the compiled shader of source `name`, compiling it if needed.
    pub fn shader(&mut self, cache: &mut StateCache, name: &str) -> Result<Arc<Shader>> {
        if let Some(v) = self.shaders.get(name) {
            return Ok(v);
        }

        let source = self
            .sources
            .get(name)
            .ok_or_else(|| Error::ResourceNotFound(format!("Shader source '{}'", name)))?;

        let preamble = source::preamble(self.version, source.stage);
        let shader = Shader::compile(cache, &self.releases, source, preamble)?;
        Ok(self.shaders.insert(name, Arc::new(shader), self.strength))
    }

    /// Gets the program linked from shaders `vs` and `fs`, building it if needed.
    pub fn program(&mut self, cache: &mut StateCache, vs: &str, fs: &str) -> Result<Arc<Program>> {
        let key = program_key(vs, fs);
        if let Some(v) = self.programs.get(&key) {
            return Ok(v);
        }

        let delegate = self.delegate.clone();
        let program = self.link(cache, &key, vs, fs, delegate, &[])?;
        Ok(self.programs.insert(key, program, self.strength))
    }

    fn link(
        &mut self,
        cache: &mut StateCache,
        key: &str,
        vs: &str,
        fs: &str,
        delegate: Arc<dyn SemanticDelegate>,
        layout: &[(String, GLint)],
    ) -> Result<Arc<Program>> {
        let vertex = self.shader(cache, vs)?;
        let fragment = self.shader(cache, fs)?;
        let program = Program::link(cache, &self.releases, key, vertex, fragment, delegate, layout)?;

        info!(
            "Linked program '{}' with {} uniforms and {} attributes.",
            key,
            program.uniforms().len(),
            program.attributes().len()
        );

        Ok(Arc::new(program))
    }

    /// Gets the program of a registered effect.
    pub fn program_for_effect(&mut self, cache: &mut StateCache, name: &str) -> Result<Arc<Program>> {
        let key = format!("pfx:{}", name);
        if let Some(v) = self.programs.get(&key) {
            return Ok(v);
        }

        let effect = self
            .effects
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(format!("Effect '{}'", name)))?;

        let delegate = Arc::new(effect.semantics(self.names.clone()));
        let program = self.link(
            cache,
            &key,
            &effect.vertex_shader,
            &effect.fragment_shader,
            delegate,
            &[],
        )?;

        for v in program.uniforms() {
            if let Some(declared) = effect.variable_type(&v.name) {
                if declared != v.ty {
                    warn!(
                        "Effect '{}' declares '{}' as {}, but the shader uses {}.",
                        name, v.name, declared, v.ty
                    );
                }
            }
        }

        Ok(self.programs.insert(key, program, self.strength))
    }

    /// Resolves the program of a drawable: the pinned program of its material, its effect, or
    /// whatever the matcher selects.
    pub fn program_for(
        &mut self,
        cache: &mut StateCache,
        material: &Material,
        mesh: &Mesh,
        lights: &[Light],
    ) -> Result<Arc<Program>> {
        if let Some((ref vs, ref fs)) = material.program {
            return self.program(cache, vs, fs);
        }

        if let Some(ref effect) = material.effect {
            return self.program_for_effect(cache, effect);
        }

        let (vs, fs) = self.matcher.shaders_for(&MatchTraits::of(material, mesh, lights));
        self.program(cache, &vs, &fs)
    }

    /// The pure-color companion of `program`: same vertex stage, with the attributes at the
    /// same locations, and a fragment stage that writes one constant color.
    pub fn pure_color_program(&mut self, cache: &mut StateCache, program: &Program) -> Result<Arc<Program>> {
        let fs = self.matcher.pure_color_fragment().to_owned();
        let vs = program.vertex().name().to_owned();
        let key = program_key(&vs, &fs);

        if let Some(v) = self.programs.get(&key) {
            if v.attribute_layout() == program.attribute_layout() {
                return Ok(v);
            }
        }

        if let Some(v) = self.picking.get(&key) {
            if v.attribute_layout() == program.attribute_layout() {
                return Ok(v.clone());
            }
        }

        let delegate = program.delegate().clone();
        let companion = self.link(cache, &key, &vs, &fs, delegate, &program.attribute_layout())?;

        if self.cache_picking {
            Ok(self.programs.insert(key, companion, CacheStrength::Strong))
        } else {
            self.picking.insert(key, companion.clone());
            Ok(companion)
        }
    }

    /// Writes every uniform of `program` for the drawable described by `ctx`.
    pub fn populate(&mut self, cache: &mut StateCache, program: &Program, ctx: &mut UniformContext) -> Result<()> {
        program.populate(cache, ctx, &mut self.unpopulated)
    }

    /// Starts a frame. Unpopulated uniforms are reported again.
    pub fn begin_frame(&mut self) {
        self.unpopulated.clear();
    }

    /// Releases companions that are not cached.
    pub fn end_pick_pass(&mut self) {
        self.picking.clear();
    }

    /// Deletes the GL objects of dropped shaders and programs.
    pub fn collect_garbage(&mut self, cache: &mut StateCache) -> Result<()> {
        let pending = self.releases.drain();
        if pending.is_empty() {
            return Ok(());
        }

        for v in pending {
            match v {
                GlObject::Shader(id) => cache.driver().delete_shader(id),
                GlObject::Program(id) => {
                    cache.driver().delete_program(id);
                    cache.forget_program(id);
                }
            }
        }

        cache.after_call("glDeleteProgram")
    }

    /// Empties the caches and deletes everything nothing else holds. Returns the number of
    /// entries that were still referenced.
    pub fn clear(&mut self, cache: &mut StateCache) -> Result<usize> {
        self.picking.clear();
        let referenced = self.programs.clear() + self.shaders.clear();
        self.collect_garbage(cache)?;
        Ok(referenced)
    }

    /// Forgets every GL object after the context was lost. Nothing is deleted, the names
    /// belong to the dead context.
    pub fn reset(&mut self, version: Version) {
        self.releases.reset();
        self.picking.clear();
        self.programs.clear();
        self.shaders.clear();
        self.unpopulated.clear();
        self.version = version;
    }
}

fn program_key(vs: &str, fs: &str) -> String {
    format!("({}, {})", vs, fs)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::headless::HeadlessDriver;
    use crate::driver::ErrorChecker;
    use crate::settings::{ErrorAssertion, ErrorLogging, Pipeline};
    use crate::shader::semantics::Semantic;
    use crate::shader::source::*;

    fn setup(settings: &Settings) -> (ShaderSystem, StateCache, HeadlessDriver) {
        let driver = HeadlessDriver::new(4, 4);
        let checker = ErrorChecker::new(ErrorLogging::OnFrameBoundary, ErrorAssertion::Off);
        let mut cache = StateCache::new(Box::new(driver.clone()), checker, Pipeline::Programmable);
        cache.open().unwrap();
        (ShaderSystem::new(settings, Version::ES(2, 0)), cache, driver)
    }

    #[test]
    fn builtins_link() {
        let (mut shaders, mut cache, _) = setup(&Settings::default());
        let pairs = [
            (BASIC_VERTEX, NO_TEXTURE_FRAGMENT),
            (BASIC_VERTEX, SINGLE_TEXTURE_FRAGMENT),
            (BASIC_VERTEX, MULTI_TEXTURE_FRAGMENT),
            (SKINNED_VERTEX, SINGLE_TEXTURE_FRAGMENT),
            (BUMP_VERTEX, BUMP_FRAGMENT),
            (BASIC_VERTEX, PURE_COLOR_FRAGMENT),
        ];

        for (vs, fs) in &pairs {
            let program = shaders.program(&mut cache, vs, fs).unwrap();
            assert!(program.id() != 0);
        }

        assert_eq!(shaders.programs().len(), pairs.len());
        cache.close().unwrap();
    }

    #[test]
    fn cached() {
        let (mut shaders, mut cache, probe) = setup(&Settings::default());
        let a = shaders.program(&mut cache, BASIC_VERTEX, NO_TEXTURE_FRAGMENT).unwrap();
        let links = probe.calls("glLinkProgram");
        let b = shaders.program(&mut cache, BASIC_VERTEX, NO_TEXTURE_FRAGMENT).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(probe.calls("glLinkProgram"), links);
        assert!(shaders.program(&mut cache, "missing.vert", NO_TEXTURE_FRAGMENT).is_err());
        cache.close().unwrap();
    }

    #[test]
    fn companion_layout() {
        let (mut shaders, mut cache, probe) = setup(&Settings::default());
        let program = shaders.program(&mut cache, SKINNED_VERTEX, SINGLE_TEXTURE_FRAGMENT).unwrap();
        let companion = shaders.pure_color_program(&mut cache, &program).unwrap();

        assert_eq!(companion.vertex().name(), SKINNED_VERTEX);
        assert_eq!(companion.fragment().name(), PURE_COLOR_FRAGMENT);
        assert_eq!(probe.attrib_layout(program.id()), probe.attrib_layout(companion.id()));
        cache.close().unwrap();
    }

    #[test]
    fn weak_cache() {
        let mut settings = Settings::default();
        settings.shader_cache_strength = CacheStrength::Weak;
        settings.should_cache_picking_shaders = false;

        let (mut shaders, mut cache, probe) = setup(&settings);
        let program = shaders.program(&mut cache, BASIC_VERTEX, NO_TEXTURE_FRAGMENT).unwrap();
        let companion = shaders.pure_color_program(&mut cache, &program).unwrap();
        assert_eq!(probe.live_programs(), 2);

        drop(companion);
        shaders.end_pick_pass();
        drop(program);
        assert!(shaders.programs().is_empty());

        shaders.collect_garbage(&mut cache).unwrap();
        assert_eq!(probe.live_programs(), 0);
        cache.close().unwrap();
    }

    #[test]
    fn uncached_companions_are_shared_within_a_pass() {
        let mut settings = Settings::default();
        settings.should_cache_picking_shaders = false;

        let (mut shaders, mut cache, probe) = setup(&settings);
        let program = shaders.program(&mut cache, BASIC_VERTEX, NO_TEXTURE_FRAGMENT).unwrap();
        let links = probe.calls("glLinkProgram");

        let a = shaders.pure_color_program(&mut cache, &program).unwrap();
        let b = shaders.pure_color_program(&mut cache, &program).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(probe.calls("glLinkProgram"), links + 1);

        drop(a);
        drop(b);
        shaders.end_pick_pass();

        shaders.pure_color_program(&mut cache, &program).unwrap();
        assert_eq!(probe.calls("glLinkProgram"), links + 2);
        cache.close().unwrap();
    }

    #[test]
    fn clear_defers_referenced() {
        let (mut shaders, mut cache, probe) = setup(&Settings::default());
        let held = shaders.program(&mut cache, BASIC_VERTEX, NO_TEXTURE_FRAGMENT).unwrap();
        shaders.program(&mut cache, BASIC_VERTEX, SINGLE_TEXTURE_FRAGMENT).unwrap();

        assert!(shaders.clear(&mut cache).unwrap() > 0);
        assert_eq!(probe.live_programs(), 1);

        drop(held);
        shaders.collect_garbage(&mut cache).unwrap();
        assert_eq!(probe.live_programs(), 0);
        cache.close().unwrap();
    }

    #[test]
    fn effects() {
        let (mut shaders, mut cache, _) = setup(&Settings::default());
        shaders.add_source(ShaderSource::vertex(
            "glow.vert",
            "attribute vec4 pos; uniform mat4 mvp; void main() { gl_Position = mvp * pos; }",
        ));
        shaders.add_source(ShaderSource::fragment(
            "glow.frag",
            "uniform vec4 tint; void main() { gl_FragColor = tint; }",
        ));

        shaders.register_effect(
            Effect::from_json(
                r#"{
                    "name": "glow",
                    "vertex_shader": "glow.vert",
                    "fragment_shader": "glow.frag",
                    "variables": [
                        { "name": "pos", "type": "vec4", "semantic": "VertexLocation" },
                        { "name": "mvp", "type": "mat4", "semantic": "ModelViewProjMatrix" },
                        { "name": "tint", "type": "vec4", "semantic": "MaterialColorDiffuse" }
                    ]
                }"#,
            )
            .unwrap(),
        );

        let program = shaders.program_for_effect(&mut cache, "glow").unwrap();
        assert_eq!(program.uniform("mvp").unwrap().semantic, Semantic::ModelViewProjMatrix);
        assert_eq!(program.uniform("tint").unwrap().semantic, Semantic::MaterialColorDiffuse);
        assert!(program.attribute_for(Semantic::VertexLocation, 0).is_some());
        assert!(shaders.program_for_effect(&mut cache, "missing").is_err());
        cache.close().unwrap();
    }
}
